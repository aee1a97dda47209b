//! Fedimirror - mirrors a Mastodon account's timeline into a local
//! content store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Scheduler / CLI                           │
//! │  - interval loop invoking sync()                            │
//! │  - token-health loop                                        │
//! │  - configure / authorize / revoke / reset commands          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - credential lifecycle (register, exchange, revoke)        │
//! │  - import pipeline (filter → transform → insert → media)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Data / Remote Layer                          │
//! │  - SQLite (sqlx): entries, media records, credentials       │
//! │  - media library on the local filesystem                    │
//! │  - Mastodon API client (reqwest)                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `service`: credential lifecycle and the import pipeline
//! - `mastodon`: wire models and API client for the remote instance
//! - `data`: database layer (content store + credentials)
//! - `storage`: on-disk media library
//! - `cli`: command definitions and handlers
//! - `config`: configuration management
//! - `error`: error types

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod mastodon;
pub mod service;
pub mod storage;

use std::sync::Arc;

use crate::mastodon::MastodonClient;
use crate::service::{CredentialService, DefaultHooks, ImportHooks, ImportService, MediaIngestor};
use crate::storage::MediaLibrary;

/// Application state shared by the scheduler loops and CLI handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (immutable snapshot)
    pub config: Arc<config::AppConfig>,

    /// Database (content store + credentials)
    pub db: Arc<data::Database>,

    /// Credential lifecycle service
    pub credentials: Arc<CredentialService>,

    /// Import pipeline service
    pub importer: Arc<ImportService>,
}

impl AppState {
    /// Initialize application state with the default (no-op) hooks.
    pub async fn new(config: config::AppConfig) -> Result<Self, error::ImportError> {
        Self::with_hooks(config, Arc::new(DefaultHooks)).await
    }

    /// Initialize application state with injected extension points.
    ///
    /// # Steps
    /// 1. Connect to the SQLite database and run migrations
    /// 2. Open the media library directory
    /// 3. Build the shared HTTP client
    /// 4. Wire up the services
    pub async fn with_hooks(
        config: config::AppConfig,
        hooks: Arc<dyn ImportHooks>,
    ) -> Result<Self, error::ImportError> {
        tracing::debug!("Initializing application state...");

        let db = Arc::new(data::Database::connect(&config.database.path).await?);

        let library = Arc::new(MediaLibrary::new(config.media.directory.clone())?);

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("Fedimirror/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.http.timeout_seconds))
            .build()
            .map_err(|e| error::ImportError::Internal(e.into()))?;
        let client = MastodonClient::new(http_client);

        let config = Arc::new(config);
        let credentials = Arc::new(CredentialService::new(db.clone(), client.clone()));
        let media = MediaIngestor::new(client.clone(), library, config.media.thumbnail_size);
        let importer = Arc::new(ImportService::new(
            config.clone(),
            db.clone(),
            client,
            credentials.clone(),
            media,
            hooks,
        ));

        tracing::debug!("Application state initialized");

        Ok(Self {
            config,
            db,
            credentials,
            importer,
        })
    }
}
