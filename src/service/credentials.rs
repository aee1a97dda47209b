//! Credential lifecycle
//!
//! Drives the remote authorization state machine:
//! `Unconfigured -> AppRegistered -> Authorized`, with revocation and
//! token invalidation dropping back to `AppRegistered` and a host change
//! dropping to `Unconfigured`. Local state is the source of truth for
//! "may this token be used": remote calls are best effort and never a
//! precondition for clearing local fields.

use std::sync::Arc;

use crate::data::{Credential, CredentialState, Database};
use crate::error::{ImportError, Result};
use crate::mastodon::MastodonClient;

/// Credential lifecycle service
pub struct CredentialService {
    db: Arc<Database>,
    client: MastodonClient,
}

impl CredentialService {
    pub fn new(db: Arc<Database>, client: MastodonClient) -> Self {
        Self { db, client }
    }

    /// Current credential snapshot.
    pub async fn current(&self) -> Result<Credential> {
        self.db.get_credential().await
    }

    /// Set or replace the instance URL.
    ///
    /// A changed URL invalidates everything issued for the old one:
    /// the old token is revoked best-effort (failure ignored), then
    /// client keys, token, cached account ID and the sync cursor are
    /// cleared in one atomic update. An empty URL pauses mirroring
    /// without revoking anything; configuring any URL afterwards counts
    /// as a change and clears the now-orphaned token.
    pub async fn configure(&self, raw_url: &str) -> Result<CredentialState> {
        let raw_url = raw_url.trim();

        if raw_url.is_empty() {
            self.db.clear_instance_url().await?;
            return Ok(self.db.get_credential().await?.state());
        }

        let instance_url = normalize_instance_url(raw_url)?;
        let credential = self.db.get_credential().await?;

        if credential.instance_url == instance_url {
            return Ok(credential.state());
        }

        if credential.state() == CredentialState::Authorized {
            // Try to revoke against the old instance; forget the token
            // regardless of the outcome.
            if let Err(error) = self
                .client
                .revoke_token(
                    &credential.instance_url,
                    &credential.client_id,
                    &credential.client_secret,
                    &credential.access_token,
                )
                .await
            {
                tracing::warn!(%error, instance = %credential.instance_url, "Could not revoke token on old instance");
            }
        }

        self.db.replace_instance_url(&instance_url).await?;
        tracing::info!(instance = %instance_url, "Instance URL configured");

        Ok(self.db.get_credential().await?.state())
    }

    /// Register this application with the configured instance.
    ///
    /// No-op when client keys already exist. On failure nothing is
    /// persisted, so the next invocation simply tries again.
    pub async fn register_app(&self) -> Result<()> {
        let credential = self.db.get_credential().await?;

        if credential.instance_url.is_empty() {
            return Err(ImportError::Config(
                "no instance URL configured".to_string(),
            ));
        }

        if !credential.client_id.is_empty() && !credential.client_secret.is_empty() {
            return Ok(());
        }

        let app = self.client.register_app(&credential.instance_url).await?;
        self.db
            .set_client_app(&app.client_id, &app.client_secret)
            .await?;

        tracing::info!(instance = %credential.instance_url, "Client application registered");
        Ok(())
    }

    /// The URL the user must visit to obtain an authorization code.
    pub async fn authorize_url(&self) -> Result<String> {
        let credential = self.db.get_credential().await?;

        if credential.state() == CredentialState::Unconfigured {
            return Err(ImportError::Config(
                "configure an instance URL and register the app first".to_string(),
            ));
        }

        Ok(MastodonClient::authorize_url(
            &credential.instance_url,
            &credential.client_id,
        ))
    }

    /// Exchange an authorization code for an access token.
    ///
    /// Valid only once the app is registered. Codes are single-use on
    /// the remote side; this never retries a failed exchange.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let credential = self.db.get_credential().await?;

        match credential.state() {
            CredentialState::AppRegistered => {}
            CredentialState::Unconfigured => {
                return Err(ImportError::Config(
                    "configure an instance URL and register the app first".to_string(),
                ));
            }
            CredentialState::Authorized => {
                return Err(ImportError::Config(
                    "already authorized; revoke access before authorizing again".to_string(),
                ));
            }
        }

        let token = self
            .client
            .obtain_token(
                &credential.instance_url,
                &credential.client_id,
                &credential.client_secret,
                code,
            )
            .await?;

        self.db.set_access_token(&token.access_token).await?;
        tracing::info!(instance = %credential.instance_url, "Access granted");

        Ok(())
    }

    /// Resolve the access token to the remote account ID.
    ///
    /// When the remote reports the token invalid (401/403) the token is
    /// cleared and the cleared state persisted immediately, so the next
    /// scheduled run asks for re-authorization instead of repeating a
    /// doomed call.
    pub async fn fetch_account_id(&self) -> Result<String> {
        let credential = self.db.get_credential().await?;

        if credential.state() != CredentialState::Authorized {
            return Err(ImportError::Auth(
                "no access token; authorize access first".to_string(),
            ));
        }

        match self
            .client
            .verify_credentials(&credential.instance_url, &credential.access_token)
            .await
        {
            Ok(account) => {
                if account.id != credential.account_id {
                    self.db.set_account_id(&account.id).await?;
                }
                Ok(account.id)
            }
            Err(ImportError::Auth(message)) => {
                tracing::warn!(instance = %credential.instance_url, "Access token invalidated; forgetting it");
                self.db.clear_access_token().await?;
                Err(ImportError::Auth(message))
            }
            Err(other) => Err(other),
        }
    }

    /// Revoke the access token.
    ///
    /// The local token is cleared no matter what the remote said; the
    /// returned flag only reports the remote outcome for CLI feedback.
    pub async fn revoke(&self) -> Result<bool> {
        let credential = self.db.get_credential().await?;

        if credential.state() != CredentialState::Authorized {
            return Err(ImportError::Auth("no access token to revoke".to_string()));
        }

        let remote_ok = match self
            .client
            .revoke_token(
                &credential.instance_url,
                &credential.client_id,
                &credential.client_secret,
                &credential.access_token,
            )
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "Remote revocation failed");
                false
            }
        };

        self.db.clear_access_token().await?;
        tracing::info!("Access token revoked locally");

        Ok(remote_ok)
    }

    /// Hard reset to default credential values.
    ///
    /// Local only: previously issued tokens stay valid on the instance
    /// until revoked there.
    pub async fn reset(&self) -> Result<()> {
        self.db.reset_credentials().await?;
        tracing::info!("Credentials reset");
        Ok(())
    }

    /// Scheduled token-health probe.
    ///
    /// Does nothing unless authorized; otherwise performs the
    /// verify-credentials call purely for its invalidation side effect.
    pub async fn check_token_health(&self) -> Result<()> {
        let credential = self.db.get_credential().await?;

        if credential.state() != CredentialState::Authorized {
            return Ok(());
        }

        self.fetch_account_id().await.map(|_| ())
    }
}

/// Normalize and validate an instance URL.
///
/// `https://` is prepended when no scheme is given; the result must
/// parse as an http(s) URL with a host. Trailing slashes are dropped.
pub fn normalize_instance_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');

    let candidate = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = url::Url::parse(&candidate)
        .map_err(|e| ImportError::Config(format!("invalid instance URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ImportError::Config(format!(
            "invalid instance URL: {candidate}"
        )));
    }

    Ok(candidate)
}
