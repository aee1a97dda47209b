//! Mastodon API client
//!
//! Thin typed wrapper over `reqwest` for the handful of endpoints the
//! pipeline consumes: app registration, the OAuth token endpoints,
//! credential verification, the account statuses timeline, and raw
//! attachment downloads.
//!
//! Every call blocks the invocation for at most the client's configured
//! timeout; there is no retry here. A failed call ends the current stage
//! and the next scheduled invocation starts over from the same cursor.

use std::fmt::Write as _;

use crate::error::{ImportError, Result};
use crate::mastodon::models::{Account, RegisteredApp, Status, Token};

/// Out-of-band redirect URI: the instance shows the authorization code
/// to the user instead of redirecting, so no callback endpoint is needed.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Scopes requested at registration and authorization. Read-only:
/// nothing is ever posted to the remote timeline.
pub const OAUTH_SCOPES: &str = "read:accounts read:statuses";

const CLIENT_NAME: &str = "Fedimirror";
const CLIENT_WEBSITE: &str = "https://github.com/yourusername/fedimirror";

/// Parameters for one timeline fetch
#[derive(Debug, Clone, Default)]
pub struct StatusQuery {
    /// Maximum number of statuses the server should return
    pub limit: u32,
    pub exclude_reblogs: bool,
    pub exclude_replies: bool,
    /// Only statuses newer than this remote ID
    pub since_id: Option<String>,
    /// Tag allow-list; a status matching any listed tag qualifies
    pub tagged: Vec<String>,
}

/// Mastodon API client
#[derive(Clone)]
pub struct MastodonClient {
    http: reqwest::Client,
}

impl MastodonClient {
    /// Wrap a shared HTTP client (timeout and user agent are configured
    /// where the client is built).
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Register this application with an instance.
    ///
    /// `POST /api/v1/apps`. Should run once per instance URL; the
    /// resulting client ID/secret are persisted by the caller.
    pub async fn register_app(&self, instance_url: &str) -> Result<RegisteredApp> {
        let endpoint = format!("{}/api/v1/apps", instance_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("client_name", CLIENT_NAME),
                ("redirect_uris", OOB_REDIRECT_URI),
                ("scopes", OAUTH_SCOPES),
                ("website", CLIENT_WEBSITE),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImportError::Transport(format!(
                "app registration failed: HTTP {}",
                response.status()
            )));
        }

        let app = response.json::<RegisteredApp>().await?;
        Ok(app)
    }

    /// Build the authorization URL the user must visit.
    pub fn authorize_url(instance_url: &str, client_id: &str) -> String {
        format!(
            "{}/oauth/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}",
            instance_url.trim_end_matches('/'),
            urlencoding::encode(client_id),
            urlencoding::encode(OOB_REDIRECT_URI),
            urlencoding::encode(OAUTH_SCOPES),
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// `POST /oauth/token`. Codes are single-use on the remote side;
    /// this call is never retried automatically.
    pub async fn obtain_token(
        &self,
        instance_url: &str,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<Token> {
        let endpoint = format!("{}/oauth/token", instance_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", OOB_REDIRECT_URI),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImportError::Transport(format!(
                "token exchange failed: HTTP {}",
                response.status()
            )));
        }

        let token = response.json::<Token>().await?;
        if token.access_token.is_empty() {
            return Err(ImportError::Malformed(
                "token response carried no access_token".to_string(),
            ));
        }

        Ok(token)
    }

    /// Revoke an access token.
    ///
    /// `POST /oauth/revoke`. Best effort: callers clear local state no
    /// matter what this returns.
    pub async fn revoke_token(
        &self,
        instance_url: &str,
        client_id: &str,
        client_secret: &str,
        token: &str,
    ) -> Result<()> {
        let endpoint = format!("{}/oauth/revoke", instance_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("token", token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImportError::Transport(format!(
                "token revocation failed: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Resolve the access token to the remote account.
    ///
    /// `GET /api/v1/accounts/verify_credentials`. A 401/403 here means
    /// the token has been invalidated on the remote side and is reported
    /// as [`ImportError::Auth`] so the caller can forget it.
    pub async fn verify_credentials(
        &self,
        instance_url: &str,
        access_token: &str,
    ) -> Result<Account> {
        let endpoint = format!(
            "{}/api/v1/accounts/verify_credentials",
            instance_url.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ImportError::Auth(format!(
                "access token rejected: HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(ImportError::Transport(format!(
                "credential verification failed: HTTP {status}"
            )));
        }

        let account = response.json::<Account>().await?;
        if account.id.is_empty() {
            return Err(ImportError::Malformed(
                "verify_credentials response carried no account ID".to_string(),
            ));
        }

        Ok(account)
    }

    /// Fetch the next batch of statuses for an account.
    ///
    /// `GET /api/v1/accounts/{id}/statuses`. The bearer token is only
    /// attached when `bearer` is set; without it the unauthenticated
    /// public endpoint is used and non-public statuses are unreachable.
    ///
    /// The server returns newest first. The batch is reversed to oldest
    /// first before it is handed downstream, so entries are created in
    /// chronological order and the cursor ends up at the true latest.
    pub async fn fetch_statuses(
        &self,
        instance_url: &str,
        account_id: &str,
        bearer: Option<&str>,
        query: &StatusQuery,
    ) -> Result<Vec<Status>> {
        let mut query_string = format!(
            "limit={}&exclude_reblogs={}&exclude_replies={}",
            query.limit, query.exclude_reblogs, query.exclude_replies
        );
        if let Some(since_id) = &query.since_id {
            let _ = write!(query_string, "&since_id={}", urlencoding::encode(since_id));
        }
        for tag in &query.tagged {
            let _ = write!(query_string, "&tagged[]={}", urlencoding::encode(tag));
        }

        let endpoint = format!(
            "{}/api/v1/accounts/{}/statuses?{}",
            instance_url.trim_end_matches('/'),
            account_id,
            query_string
        );

        let mut request = self.http.get(&endpoint).header("Accept", "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ImportError::Transport(format!(
                "status fetch failed: HTTP {}",
                response.status()
            )));
        }

        let mut statuses = response.json::<Vec<Status>>().await?;
        statuses.reverse();
        Ok(statuses)
    }

    /// Download an attachment.
    ///
    /// Returns the raw bytes; validation happens in the media ingestor.
    pub async fn fetch_attachment(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).header("Accept", "image/*").send().await?;

        if !response.status().is_success() {
            return Err(ImportError::Transport(format!(
                "attachment download failed: HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_required_params() {
        let url = MastodonClient::authorize_url("https://example.social/", "abc+def");

        assert!(url.starts_with("https://example.social/oauth/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=abc%2Bdef"));
        assert!(url.contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
        assert!(url.contains("scope=read%3Aaccounts%20read%3Astatuses"));
    }
}
