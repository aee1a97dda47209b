//! Media ingestion
//!
//! Downloads a status's image attachments into the local media library,
//! once per remote URL, and records them against the freshly created
//! entry. Attachment failures are independent: one bad download never
//! rolls back the entry or blocks the attachments after it.

use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::data::{Database, EntityId, StoredMedia};
use crate::error::{ImportError, Result};
use crate::mastodon::{Attachment, MastodonClient, Status};
use crate::storage::MediaLibrary;

/// Per-entry ingestion summary
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Media records created or reused
    pub stored: usize,
    /// Attachments skipped by policy (non-image type, invalid URL)
    pub skipped: usize,
    /// Attachments that failed download or validation
    pub failed: usize,
    /// Media record set as the entry's featured image
    pub featured_media_id: Option<String>,
}

/// Media ingestor
pub struct MediaIngestor {
    client: MastodonClient,
    library: Arc<MediaLibrary>,
    thumbnail_size: u32,
}

impl MediaIngestor {
    pub fn new(client: MastodonClient, library: Arc<MediaLibrary>, thumbnail_size: u32) -> Self {
        Self {
            client,
            library,
            thumbnail_size,
        }
    }

    /// Ingest all eligible attachments of a status for an entry.
    ///
    /// Attachments are processed in the order the remote lists them.
    /// The first one that ingests successfully becomes the entry's
    /// featured image when `feature_first` is set.
    pub async fn ingest_for_entry(
        &self,
        db: &Database,
        entry_id: &str,
        status: &Status,
        feature_first: bool,
    ) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        for attachment in &status.media_attachments {
            if attachment.media_type != "image" {
                // Only images are supported.
                tracing::debug!(
                    media_type = %attachment.media_type,
                    "Skipping non-image attachment"
                );
                outcome.skipped += 1;
                continue;
            }

            let Some(attachment_url) = valid_attachment_url(attachment) else {
                tracing::warn!(url = ?attachment.url, "Skipping attachment with invalid URL");
                outcome.skipped += 1;
                continue;
            };

            match self.ingest_one(db, entry_id, attachment, &attachment_url).await {
                Ok(media_id) => {
                    outcome.stored += 1;

                    if outcome.featured_media_id.is_none() && feature_first {
                        match db.set_featured_media(entry_id, &media_id).await {
                            Ok(()) => outcome.featured_media_id = Some(media_id),
                            Err(error) => {
                                tracing::warn!(%error, entry_id, "Could not set featured image");
                            }
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, url = %attachment_url, "Attachment ingestion failed");
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// Ingest a single attachment.
    ///
    /// # Returns
    /// The ID of the media record, existing or new.
    async fn ingest_one(
        &self,
        db: &Database,
        entry_id: &str,
        attachment: &Attachment,
        attachment_url: &Url,
    ) -> Result<String> {
        // Fast path: the URL derives a usable name and we already have
        // it. A different remote file with the exact same name would be
        // wrongly reused here; accepted in exchange for idempotent
        // re-runs.
        let derived_name = MediaLibrary::derive_file_name(attachment_url);
        if let Some(name) = &derived_name {
            if let Some(existing) = db.find_media_by_file_name(name).await? {
                tracing::debug!(file_name = %name, "Reusing already-downloaded media");
                return Ok(existing.id);
            }
        }

        let bytes = self
            .client
            .fetch_attachment(attachment_url.as_str())
            .await
            .map_err(|e| ImportError::Media(format!("download failed: {e}")))?;
        if bytes.is_empty() {
            return Err(ImportError::Media(format!(
                "empty response body for {attachment_url}"
            )));
        }

        let format = image::guess_format(&bytes)
            .map_err(|e| ImportError::Media(format!("not a recognized image: {e}")))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| ImportError::Media(format!("image failed to decode: {e}")))?;

        let file_name = match derived_name {
            Some(name) => name,
            None => {
                let extension = format.extensions_str().first().copied().unwrap_or("bin");
                let name = MediaLibrary::hashed_file_name(attachment_url, extension);
                // The hashed name was not knowable before the download;
                // re-check the library before storing.
                if let Some(existing) = db.find_media_by_file_name(&name).await? {
                    tracing::debug!(file_name = %name, "Reusing already-downloaded media");
                    return Ok(existing.id);
                }
                name
            }
        };

        self.library.store(&file_name, &bytes)?;

        let thumbnail_name = match self.library.store_thumbnail(
            &file_name,
            &decoded,
            format,
            self.thumbnail_size,
        ) {
            Ok(name) => Some(name),
            Err(error) => {
                // The full-size file is in place; a missing rendition is
                // not worth failing the attachment over.
                tracing::warn!(%error, file_name = %file_name, "Thumbnail generation failed");
                None
            }
        };

        let media = StoredMedia {
            id: EntityId::new().0,
            entry_id: entry_id.to_string(),
            file_name,
            thumbnail_name,
            content_type: format.to_mime_type().to_string(),
            alt_text: attachment.description.clone().unwrap_or_default(),
            created_at: Utc::now(),
        };
        db.insert_media(&media).await?;

        Ok(media.id)
    }
}

/// Validate an attachment URL: parseable, http(s), and host-bearing.
fn valid_attachment_url(attachment: &Attachment) -> Option<Url> {
    let raw = attachment.url.as_deref()?;
    let url = Url::parse(raw).ok()?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(url: Option<&str>) -> Attachment {
        serde_json::from_value(serde_json::json!({
            "type": "image",
            "url": url,
        }))
        .unwrap()
    }

    #[test]
    fn accepts_https_urls() {
        let att = attachment(Some("https://files.example.social/a.jpg"));
        assert!(valid_attachment_url(&att).is_some());
    }

    #[test]
    fn rejects_missing_and_malformed_urls() {
        assert!(valid_attachment_url(&attachment(None)).is_none());
        assert!(valid_attachment_url(&attachment(Some("not a url"))).is_none());
        assert!(valid_attachment_url(&attachment(Some("ftp://example.com/a.jpg"))).is_none());
        assert!(valid_attachment_url(&attachment(Some("data:image/png;base64,xyz"))).is_none());
    }
}
