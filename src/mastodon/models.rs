//! Mastodon API wire models
//!
//! Deserialization targets for the subset of the remote API this crate
//! consumes. Fields default aggressively: a status with surprising gaps
//! should survive decoding and be rejected by the filter stage instead
//! of poisoning the whole batch.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A remote status ("toot"), possibly a boost of another status
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    /// Remote ID on the source instance; opaque but monotonically
    /// increasing, which is what makes `since_id` paging work
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// public, unlisted, private, direct
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub url: Option<String>,
    /// HTML content as rendered by the instance
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    /// The boosted status, when this one is a boost
    #[serde(default)]
    pub reblog: Option<Box<Status>>,
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub media_attachments: Vec<Attachment>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Status {
    /// The durable dedup key: the boosted original's URL when present,
    /// the status's own URL otherwise.
    pub fn canonical_url(&self) -> Option<&str> {
        if let Some(reblog) = &self.reblog {
            if let Some(url) = reblog.url.as_deref() {
                if !url.is_empty() {
                    return Some(url);
                }
            }
        }
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Remote account, as embedded in statuses and returned by
/// `verify_credentials`
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub acct: String,
}

/// A status's media attachment
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    /// image, video, gifv, audio, unknown
    #[serde(default, rename = "type")]
    pub media_type: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Alt text, when the author provided one
    #[serde(default)]
    pub description: Option<String>,
}

/// A hashtag reference on a status
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
}

/// Response of `POST /api/v1/apps`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredApp {
    pub client_id: String,
    pub client_secret: String,
}

/// Response of `POST /oauth/token`
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}
