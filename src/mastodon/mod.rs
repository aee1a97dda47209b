//! Remote Mastodon API layer
//!
//! Wire models and the typed HTTP client for the endpoints the import
//! pipeline consumes.

mod client;
mod models;

pub use client::{MastodonClient, OAUTH_SCOPES, OOB_REDIRECT_URI, StatusQuery};
pub use models::{Account, Attachment, RegisteredApp, Status, Tag, Token};
