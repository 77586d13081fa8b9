use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Self-hosted manga reading site.
#[derive(Parser, Debug, Clone)]
#[command(name = "mangashelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "MANGASHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Content directory holding one folder per series.
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// User management commands.
    User {
        /// User subcommand action.
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Print the catalog as JSON.
    Catalog {
        /// Only this series.
        series: Option<String>,
    },

    /// Create default config and empty data files.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// User management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Add a new user.
    Add {
        /// Username.
        username: String,
        /// Password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Delete a user.
    Del {
        /// Username to delete.
        username: String,
    },

    /// List all users.
    List,

    /// Change user password.
    Passwd {
        /// Username.
        username: String,
        /// New password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// File locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Input limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Site title.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        3000,
    )
}

fn default_title() -> String {
    "Manga Shelf".to_string()
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory with `manga.json`, `users.json`, `comments.json` and `sessions.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Content tree: `<content_dir>/<series>/<chapter>/<page>`.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// URL prefix the content tree is served under.
    #[serde(default = "default_content_url")]
    pub content_url: String,

    /// Uploaded files (avatars).
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// HTML page shells.
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,

    /// Scripts, styles and images served under `/assets`.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            content_dir: default_content_dir(),
            content_url: default_content_url(),
            uploads_dir: default_uploads_dir(),
            pages_dir: default_pages_dir(),
            assets_dir: default_assets_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content/manga")
}

fn default_content_url() -> String {
    "/content/manga".to_string()
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

impl StorageConfig {
    /// URL path the content tree is mounted at: leading slash, no trailing one.
    pub fn content_mount(&self) -> String {
        let trimmed = self.content_url.trim_matches('/');
        if trimmed.is_empty() {
            "/content".to_string()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// Base metadata file.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("manga.json")
    }

    /// Avatar upload directory.
    pub fn avatars_dir(&self) -> PathBuf {
        self.uploads_dir.join("avatars")
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Registration mode: "open", "disabled".
    #[serde(default = "default_registration")]
    pub registration: String,

    /// Session duration in days.
    #[serde(default = "default_session_days")]
    pub session_days: u32,

    /// Mark the session cookie `Secure` (serve over HTTPS).
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            registration: default_registration(),
            session_days: default_session_days(),
            secure_cookie: false,
        }
    }
}

fn default_registration() -> String {
    "open".to_string()
}

fn default_session_days() -> u32 {
    14
}

impl AuthConfig {
    /// Check if registration is enabled.
    pub fn registration_enabled(&self) -> bool {
        self.registration == "open"
    }
}

/// Input limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum avatar upload size in bytes.
    #[serde(default = "default_avatar_max_bytes")]
    pub avatar_max_bytes: usize,

    /// Maximum comment length in UTF-16 code units.
    #[serde(default = "default_comment_max_chars")]
    pub comment_max_chars: usize,

    /// Comments returned per chapter (most recent).
    #[serde(default = "default_comments_page")]
    pub comments_page: usize,

    /// Recently viewed entries kept per user.
    #[serde(default = "default_recent_max")]
    pub recent_max: usize,

    /// Maximum bio length in characters.
    #[serde(default = "default_bio_max_chars")]
    pub bio_max_chars: usize,

    /// Maximum ids per batch profile lookup.
    #[serde(default = "default_batch_max")]
    pub batch_max: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            avatar_max_bytes: default_avatar_max_bytes(),
            comment_max_chars: default_comment_max_chars(),
            comments_page: default_comments_page(),
            recent_max: default_recent_max(),
            bio_max_chars: default_bio_max_chars(),
            batch_max: default_batch_max(),
        }
    }
}

fn default_avatar_max_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_comment_max_chars() -> usize {
    800
}

fn default_comments_page() -> usize {
    200
}

fn default_recent_max() -> usize {
    25
}

fn default_bio_max_chars() -> usize {
    280
}

fn default_batch_max() -> usize {
    200
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("mangashelf.toml"),
            dirs::config_dir()
                .map(|p| p.join("mangashelf").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/mangashelf/config.toml"),
        ];

        candidates
            .into_iter()
            .find(|p| !p.as_os_str().is_empty() && p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# mangashelf configuration

[server]
bind = "0.0.0.0:3000"
title = "Manga Shelf"

[storage]
# manga.json, users.json, comments.json, sessions.json
data_dir = "data"
# <content_dir>/<series>/<chapter>/<page>
content_dir = "content/manga"
content_url = "/content/manga"
uploads_dir = "uploads"
pages_dir = "docs"
assets_dir = "assets"

[auth]
# Registration mode: "open" or "disabled"
registration = "open"
# Session duration in days
session_days = 14
# Set to true when served over HTTPS
secure_cookie = false

[limits]
avatar_max_bytes = 2097152
comment_max_chars = 800
comments_page = 200
recent_max = 25
bio_max_chars = 280
batch_max = 200
"#
        .to_string()
    }
}
