//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)
//!
//! Configuration is an immutable snapshot: the pipeline never writes it.
//! The only mutable state (remote credentials and the sync cursor) lives
//! in the database and is updated through [`crate::data::Database`].

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub http: HttpConfig,
    pub import: ImportConfig,
    pub logging: LoggingConfig,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Media library configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory that holds downloaded attachments and their renditions
    pub directory: PathBuf,
    /// Longest side, in pixels, of generated thumbnail renditions
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

fn default_thumbnail_size() -> u32 {
    400
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds; the only cancellation mechanism
    /// in the pipeline
    pub timeout_seconds: u64,
}

/// Import pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Seconds between scheduled pipeline invocations
    pub interval_seconds: u64,
    /// Maximum statuses fetched per invocation
    pub limit: u32,
    /// Import boosts ("reblogs"), too?
    pub include_reblogs: bool,
    /// Import replies, too?
    pub include_replies: bool,
    /// When true, fetch over the unauthenticated public endpoint;
    /// followers-only and unlisted statuses are then unreachable
    pub public_only: bool,
    /// Import only statuses carrying any of these tags (empty: all)
    #[serde(default)]
    pub tags: Vec<String>,
    /// Skip statuses containing any of these phrases (case-insensitive)
    #[serde(default)]
    pub denylist: Vec<String>,
    /// Status for newly created entries: publish, draft, pending, private
    pub entry_status: String,
    /// Entry kind (post type) for newly created entries
    pub entry_kind: String,
    /// Optional entry format, applied after insert
    #[serde(default)]
    pub entry_format: Option<String>,
    /// Optional author recorded on new entries
    #[serde(default)]
    pub author: Option<String>,
    /// Optional category recorded on new entries
    #[serde(default)]
    pub category: Option<String>,
    /// Number of words the derived entry title keeps
    pub title_words: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FEDIMIRROR_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::ImportError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("database.path", "fedimirror.db")?
            .set_default("media.directory", "media")?
            .set_default("media.thumbnail_size", 400)?
            .set_default("http.timeout_seconds", 10)?
            .set_default("import.interval_seconds", 900)?
            .set_default("import.limit", 40)?
            .set_default("import.include_reblogs", false)?
            .set_default("import.include_replies", false)?
            .set_default("import.public_only", true)?
            .set_default("import.entry_status", "publish")?
            .set_default("import.entry_kind", "post")?
            .set_default("import.title_words", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (FEDIMIRROR_*)
            .add_source(
                Environment::with_prefix("FEDIMIRROR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::ImportError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::ImportError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::ImportError> {
        if self.import.entry_status.parse::<crate::data::EntryStatus>().is_err() {
            return Err(crate::error::ImportError::Config(
                "import.entry_status must be one of: publish, draft, pending, private".to_string(),
            ));
        }

        if self.import.limit == 0 {
            return Err(crate::error::ImportError::Config(
                "import.limit must be greater than 0".to_string(),
            ));
        }

        if self.import.title_words == 0 {
            return Err(crate::error::ImportError::Config(
                "import.title_words must be greater than 0".to_string(),
            ));
        }

        if self.http.timeout_seconds == 0 {
            return Err(crate::error::ImportError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
