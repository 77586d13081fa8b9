//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::catalog::{Catalog, CatalogSource, Series};
use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Flat-file store.
    pub db: Database,
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Catalog locations.
    catalog: Arc<CatalogSource>,
}

impl AppState {
    /// Create new application state with database.
    pub fn new_with_db(config: Config, db: Database, auth: AuthService) -> Self {
        let catalog = CatalogSource::from_config(&config);

        Self {
            config: Arc::new(config),
            db,
            auth: Arc::new(auth),
            catalog: Arc::new(catalog),
        }
    }

    /// Build the full catalog from disk.
    ///
    /// Runs on the blocking pool; every call rescans the content tree.
    pub async fn catalog(&self) -> Result<Catalog> {
        let source = self.catalog.clone();
        tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| AppError::Internal(format!("Catalog task failed: {}", e)))?
    }

    /// Build a single series from disk.
    pub async fn series(&self, series_id: &str) -> Result<Option<Series>> {
        let source = self.catalog.clone();
        let series_id = series_id.to_string();
        tokio::task::spawn_blocking(move || source.load_series(&series_id))
            .await
            .map_err(|e| AppError::Internal(format!("Catalog task failed: {}", e)))?
    }

    /// Path of an HTML page shell.
    pub fn page_path(&self, name: &str) -> PathBuf {
        self.config.storage.pages_dir.join(name)
    }
}
