//! Common test utilities for integration tests

use fedimirror::{AppState, config};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A test application wired against a mock Mastodon instance
pub struct TestApp {
    pub state: AppState,
    pub server: MockServer,
    pub _temp_dir: TempDir,
}

impl TestApp {
    /// Create a test app with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test app, letting the caller adjust the configuration
    /// before the state is built.
    pub async fn with_config(mutate: impl FnOnce(&mut config::AppConfig)) -> Self {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        let mut config = config::AppConfig {
            database: config::DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            media: config::MediaConfig {
                directory: temp_dir.path().join("media"),
                thumbnail_size: 100,
            },
            http: config::HttpConfig { timeout_seconds: 5 },
            import: config::ImportConfig {
                interval_seconds: 900,
                limit: 40,
                include_reblogs: false,
                include_replies: false,
                public_only: true,
                tags: Vec::new(),
                denylist: Vec::new(),
                entry_status: "publish".to_string(),
                entry_kind: "post".to_string(),
                entry_format: None,
                author: None,
                category: None,
                title_words: 10,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        mutate(&mut config);

        let state = AppState::new(config).await.unwrap();

        Self {
            state,
            server,
            _temp_dir: temp_dir,
        }
    }

    /// Seed stored credentials as a fully authorized setup against the
    /// mock server.
    pub async fn seed_authorized(&self) {
        self.state
            .db
            .replace_instance_url(&self.server.uri())
            .await
            .unwrap();
        self.state
            .db
            .set_client_app("client-id", "client-secret")
            .await
            .unwrap();
        self.state.db.set_access_token("test-token").await.unwrap();
    }

    /// Mount a verify_credentials mock resolving to account "1".
    pub async fn mount_verify_credentials(&self) {
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/verify_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1",
                "username": "user",
                "acct": "user"
            })))
            .mount(&self.server)
            .await;
    }
}

/// A small but real PNG for attachment mocks.
pub fn png_bytes() -> Vec<u8> {
    let image = image::DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}
