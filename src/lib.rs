//! mangashelf: a self-hosted manga reading site.
//!
//! Series metadata is hand-authored in `manga.json`; chapters and pages are
//! discovered from the content tree on every request and merged with that
//! metadata, so dropping a new `chNN` folder onto disk publishes it.
//!
//! # Features
//!
//! - Catalog built from authored metadata plus the content directory
//! - Natural page ordering (`2.png` before `10.png`)
//! - User accounts with cookie sessions
//! - Favorites, recently viewed and reading position
//! - Chapter comments
//! - Profiles with avatars

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// Catalog builder.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Flat-file data store.
pub mod db;
/// Error types.
pub mod error;
/// HTTP server.
pub mod server;


pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
