//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Credentials (single row)
// =============================================================================

/// Remote instance credentials plus the sync cursor
///
/// Exactly one row exists in the database. Empty strings mean "unset";
/// the access token is only meaningful paired with the instance URL it
/// was issued for, which is why a host change clears every other field.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    /// Base URL of the remote instance, e.g. "https://example.social"
    pub instance_url: String,
    /// Client ID issued by app registration
    pub client_id: String,
    /// Client secret issued by app registration
    pub client_secret: String,
    /// OAuth access token
    pub access_token: String,
    /// Cached remote account ID, refreshed on verify_credentials
    pub account_id: String,
    /// Remote ID of the most recently imported status
    pub latest_remote_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Derive the lifecycle state from field presence.
    pub fn state(&self) -> CredentialState {
        if self.instance_url.is_empty() {
            CredentialState::Unconfigured
        } else if !self.access_token.is_empty() {
            CredentialState::Authorized
        } else if !self.client_id.is_empty() && !self.client_secret.is_empty() {
            CredentialState::AppRegistered
        } else {
            CredentialState::Unconfigured
        }
    }
}

/// Credential lifecycle state
///
/// `Unconfigured -> AppRegistered -> Authorized`; revocation and
/// invalidation both drop back to `AppRegistered` (client keys are kept)
/// and a host change drops all the way to `Unconfigured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Unconfigured,
    AppRegistered,
    Authorized,
}

impl CredentialState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::AppRegistered => "app_registered",
            Self::Authorized => "authorized",
        }
    }
}

// =============================================================================
// Entries
// =============================================================================

/// Publication status of a local entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Publish,
    Draft,
    Pending,
    Private,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(Self::Publish),
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

/// A content entry about to be inserted
///
/// This is the value the entry-shaping extension point receives; it
/// carries everything the store needs except the generated ID.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub body: String,
    /// publish, draft, pending, private
    pub status: String,
    /// Entry kind (post type)
    pub kind: String,
    /// Optional entry format, e.g. "status"
    pub format: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Remote status ID on the source instance
    pub source_id: String,
    /// Canonical status URL; unique across all entries and the durable
    /// dedup key (remote IDs are not stable across instance migrations)
    pub source_url: String,
}

/// A stored content entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub body: String,
    pub status: String,
    pub kind: String,
    pub format: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_id: String,
    pub source_url: String,
    /// Media record designated as the entry's lead image
    pub featured_media_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Media
// =============================================================================

/// Media file stored in the local library
///
/// Actual files live in the media directory; this record holds metadata
/// and the derived file names. `file_name` is unique: a remote URL that
/// derives an already-known name reuses the existing record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMedia {
    pub id: String,
    /// Entry this file was first imported for
    pub entry_id: String,
    /// File name inside the media directory
    pub file_name: String,
    /// Thumbnail rendition file name, if one was generated
    pub thumbnail_name: Option<String>,
    /// MIME type (e.g., "image/jpeg")
    pub content_type: String,
    /// Alt text taken from the remote attachment description
    pub alt_text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_credential() -> Credential {
        Credential {
            instance_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            access_token: String::new(),
            account_id: String::new(),
            latest_remote_id: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn credential_state_progression() {
        let mut credential = empty_credential();
        assert_eq!(credential.state(), CredentialState::Unconfigured);

        credential.instance_url = "https://example.social".to_string();
        assert_eq!(credential.state(), CredentialState::Unconfigured);

        credential.client_id = "id".to_string();
        credential.client_secret = "secret".to_string();
        assert_eq!(credential.state(), CredentialState::AppRegistered);

        credential.access_token = "token".to_string();
        assert_eq!(credential.state(), CredentialState::Authorized);

        credential.access_token = String::new();
        assert_eq!(credential.state(), CredentialState::AppRegistered);
    }

    #[test]
    fn entry_status_round_trip() {
        for status in ["publish", "draft", "pending", "private"] {
            let parsed: EntryStatus = status.parse().unwrap();
            assert_eq!(parsed.as_str(), status);
        }
        assert!("trash".parse::<EntryStatus>().is_err());
    }
}
