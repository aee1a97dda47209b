//! Import pipeline orchestrator
//!
//! One `sync()` invocation is one run-to-completion pass: resolve the
//! account, fetch the next batch, then walk it oldest-first through
//! filter, transform, insert, cursor update, and media ingestion.
//!
//! Batch-level failures (configuration, authorization, fetch) abort the
//! invocation without touching the cursor. Per-status and per-attachment
//! failures are isolated: skip, log, continue. Nothing is retried within
//! an invocation; the next scheduled run starts over from the cursor.
//!
//! Overlapping invocations are possible (a slow manual run racing the
//! scheduler) and can both see the same starting cursor. This design
//! does not take a cross-invocation lock; the `source_url` uniqueness
//! constraint is the only safety net, and it resolves such a race by
//! making the later insert lose, not by preventing the double fetch.

use std::sync::Arc;

use chrono::Utc;

use crate::config::AppConfig;
use crate::data::{Database, NewEntry};
use crate::error::{ImportError, Result};
use crate::mastodon::{MastodonClient, Status, StatusQuery};
use crate::service::credentials::CredentialService;
use crate::service::filter::StatusFilter;
use crate::service::media::MediaIngestor;
use crate::service::transform::{
    ImportHooks, apply_boost_attribution, derive_title, sanitize,
};

/// Summary of one pipeline invocation
#[derive(Debug, Default)]
pub struct ImportOutcome {
    /// Statuses returned by the fetch
    pub fetched: usize,
    /// Entries created
    pub imported: usize,
    /// Statuses rejected by the filter stage
    pub skipped: usize,
    /// Media records created or reused
    pub media_stored: usize,
    /// Attachments that failed download or validation
    pub media_failed: usize,
}

/// Import pipeline service
pub struct ImportService {
    config: Arc<AppConfig>,
    db: Arc<Database>,
    client: MastodonClient,
    credentials: Arc<CredentialService>,
    media: MediaIngestor,
    hooks: Arc<dyn ImportHooks>,
}

impl ImportService {
    pub fn new(
        config: Arc<AppConfig>,
        db: Arc<Database>,
        client: MastodonClient,
        credentials: Arc<CredentialService>,
        media: MediaIngestor,
        hooks: Arc<dyn ImportHooks>,
    ) -> Self {
        Self {
            config,
            db,
            client,
            credentials,
            media,
            hooks,
        }
    }

    /// Run one import pass.
    pub async fn sync(&self) -> Result<ImportOutcome> {
        let credential = self.db.get_credential().await?;

        if credential.instance_url.is_empty() {
            return Err(ImportError::Config(
                "no instance URL configured".to_string(),
            ));
        }
        if credential.access_token.is_empty() {
            return Err(ImportError::Auth(
                "no access token; authorize access first".to_string(),
            ));
        }

        // Resolves the token to the account; a 401/403 here clears the
        // token and aborts the invocation.
        let account_id = self.credentials.fetch_account_id().await?;

        let import = &self.config.import;
        let query = StatusQuery {
            limit: import.limit,
            exclude_reblogs: !import.include_reblogs,
            exclude_replies: !import.include_replies,
            since_id: credential.latest_remote_id.clone(),
            // Tags are configured with or without a leading '#'; the API
            // wants them bare.
            tagged: import
                .tags
                .iter()
                .map(|tag| tag.trim().trim_start_matches('#').to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
        };
        let bearer = if import.public_only {
            None
        } else {
            Some(credential.access_token.as_str())
        };

        // Oldest first, so the cursor ends up at the true latest.
        let statuses = self
            .client
            .fetch_statuses(&credential.instance_url, &account_id, bearer, &query)
            .await?;

        let mut outcome = ImportOutcome {
            fetched: statuses.len(),
            ..Default::default()
        };

        if statuses.is_empty() {
            tracing::debug!("No new statuses");
            return Ok(outcome);
        }

        let filter = StatusFilter::new(&import.denylist);

        for status in &statuses {
            match self.process_status(status, &filter).await {
                Ok(Processed::Imported { media_stored, media_failed }) => {
                    outcome.imported += 1;
                    outcome.media_stored += media_stored;
                    outcome.media_failed += media_failed;
                }
                Ok(Processed::Skipped(reason)) => {
                    tracing::debug!(remote_id = %status.id, reason, "Status skipped");
                    outcome.skipped += 1;
                }
                Err(error) => {
                    // Per-status failure: never aborts the batch.
                    tracing::warn!(%error, remote_id = %status.id, "Status import failed");
                    outcome.skipped += 1;
                }
            }
        }

        tracing::info!(
            fetched = outcome.fetched,
            imported = outcome.imported,
            skipped = outcome.skipped,
            media_stored = outcome.media_stored,
            media_failed = outcome.media_failed,
            "Import pass finished"
        );

        Ok(outcome)
    }

    /// Run one status through filter, transform, insert, cursor update,
    /// hooks and media ingestion.
    async fn process_status(&self, status: &Status, filter: &StatusFilter) -> Result<Processed> {
        if let Some(reason) = filter.accept(status, &self.db).await? {
            return Ok(Processed::Skipped(reason.as_str()));
        }

        let body = sanitize(&status.content);
        let body = apply_boost_attribution(body, status);

        if let Some(reason) = StatusFilter::rejects_after_transform(&body, status) {
            return Ok(Processed::Skipped(reason.as_str()));
        }

        let import = &self.config.import;
        let title = derive_title(&body, import.title_words);

        let body = self.hooks.rewrite_body(body, status);
        let title = self.hooks.rewrite_title(title, status);

        // The filter already required a canonical URL.
        let Some(source_url) = status.canonical_url().map(str::to_string) else {
            return Ok(Processed::Skipped("missing_identity"));
        };

        // Every entry gets a non-empty, meaningful title.
        let title = if title.is_empty() {
            source_url.clone()
        } else {
            title
        };

        let entry = NewEntry {
            title,
            body,
            status: import.entry_status.clone(),
            kind: import.entry_kind.clone(),
            format: None,
            author: import.author.clone(),
            category: import.category.clone(),
            published_at: status.created_at.unwrap_or_else(Utc::now),
            source_id: status.id.clone(),
            source_url,
        };
        let entry = self.hooks.rewrite_entry(entry, status);

        let Some(entry_id) = self.db.insert_entry(&entry).await? else {
            // A concurrent invocation imported the same URL between the
            // dedup check and this insert.
            return Ok(Processed::Skipped("already_imported"));
        };

        // Cursor first: a crash after the insert must resume after this
        // status, not re-import it.
        self.db.set_latest_remote_id(&status.id).await?;
        self.hooks.after_import(&entry_id, status);

        if let Some(format) = &import.entry_format {
            self.db.set_entry_format(&entry_id, format).await?;
        }

        let mut media_stored = 0;
        let mut media_failed = 0;
        if !status.media_attachments.is_empty() {
            let feature_first = self.hooks.feature_first_image(status);
            let ingest = self
                .media
                .ingest_for_entry(&self.db, &entry_id, status, feature_first)
                .await;
            media_stored = ingest.stored;
            media_failed = ingest.failed;
        }

        tracing::info!(remote_id = %status.id, entry_id = %entry_id, "Status imported");

        Ok(Processed::Imported {
            media_stored,
            media_failed,
        })
    }
}

enum Processed {
    Imported {
        media_stored: usize,
        media_failed: usize,
    },
    Skipped(&'static str),
}
