//! Status filtering and dedup
//!
//! Local policy applied to each fetched status, oldest first. Server-side
//! filtering (boosts, replies, tags, visibility ceiling) already happened
//! at fetch time; this stage enforces what the server cannot: the
//! denylist, the direct-message ban, and URL-based dedup against the
//! local store.

use crate::data::Database;
use crate::error::Result;
use crate::mastodon::Status;

/// Why a status was not imported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Direct messages are never importable, independent of any setting
    DirectMessage,
    /// A denylist phrase occurred in the raw content
    Denylisted,
    /// No remote ID or no canonical URL; malformed payload
    MissingIdentity,
    /// An entry with this canonical URL already exists
    AlreadyImported,
    /// Nothing worth publishing: empty rendered body, no attachments
    EmptyContent,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMessage => "direct_message",
            Self::Denylisted => "denylisted",
            Self::MissingIdentity => "missing_identity",
            Self::AlreadyImported => "already_imported",
            Self::EmptyContent => "empty_content",
        }
    }
}

/// Per-invocation status filter
pub struct StatusFilter {
    /// Denylist phrases, lowercased; matching is case-insensitive
    /// substring search on the raw HTML content
    denylist: Vec<String>,
}

impl StatusFilter {
    pub fn new(denylist: &[String]) -> Self {
        let denylist = denylist
            .iter()
            .map(|phrase| phrase.trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();

        Self { denylist }
    }

    /// Apply the pre-transform rejection rules in precedence order.
    ///
    /// Returns `None` when the status may proceed to the transform
    /// stage. The post-transform empty-content rule
    /// ([`Self::rejects_after_transform`]) runs separately because it
    /// needs the sanitized body.
    pub async fn accept(&self, status: &Status, db: &Database) -> Result<Option<RejectReason>> {
        if status.visibility == "direct" {
            // Followers-only and unlisted statuses can be imported,
            // depending on the public_only setting. Direct messages never.
            return Ok(Some(RejectReason::DirectMessage));
        }

        if self.is_denylisted(&status.content) {
            return Ok(Some(RejectReason::Denylisted));
        }

        if status.id.is_empty() {
            // This should never happen.
            return Ok(Some(RejectReason::MissingIdentity));
        }

        let Some(canonical_url) = status.canonical_url() else {
            return Ok(Some(RejectReason::MissingIdentity));
        };

        // Dedup on URL rather than ID, to avoid clashes after switching
        // instances.
        if db.entry_exists_by_source_url(canonical_url).await? {
            return Ok(Some(RejectReason::AlreadyImported));
        }

        Ok(None)
    }

    /// The post-transform rule: an empty body is only rescued by the
    /// presence of media attachments.
    pub fn rejects_after_transform(body: &str, status: &Status) -> Option<RejectReason> {
        if body.is_empty() && status.media_attachments.is_empty() {
            return Some(RejectReason::EmptyContent);
        }
        None
    }

    fn is_denylisted(&self, content: &str) -> bool {
        if self.denylist.is_empty() {
            return false;
        }

        let content = content.to_lowercase();
        self.denylist.iter().any(|phrase| content.contains(phrase))
    }
}
