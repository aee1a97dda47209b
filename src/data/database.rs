//! SQLite database operations
//!
//! All database access goes through this module. The local content
//! store (entries, media library records) and the remote credentials
//! live in the same database so credential mutations and cursor updates
//! are single-statement, atomic writes.

use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::ImportError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the SQLite database, creating it when missing, and run
    /// pending migrations.
    pub async fn connect(path: &Path) -> Result<Self, ImportError> {
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            ImportError::Internal(anyhow::anyhow!("Migration failed: {}", e))
        })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Credentials (single row)
    // =========================================================================

    /// Get the credential row.
    ///
    /// The row is seeded by the initial migration, so it always exists.
    pub async fn get_credential(&self) -> Result<Credential, ImportError> {
        let credential = sqlx::query_as::<_, Credential>(
            r#"
            SELECT instance_url, client_id, client_secret, access_token,
                   account_id, latest_remote_id, updated_at
            FROM credentials WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(credential)
    }

    /// Store a new instance URL, clearing everything issued for the old
    /// one: client keys, access token, cached account ID, and the sync
    /// cursor. One statement, so a crash cannot leave a token paired
    /// with the wrong host.
    pub async fn replace_instance_url(&self, instance_url: &str) -> Result<(), ImportError> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET instance_url = ?, client_id = '', client_secret = '',
                access_token = '', account_id = '', latest_remote_id = NULL,
                updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(instance_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Clear the instance URL but keep everything else.
    ///
    /// Used to pause mirroring temporarily without revoking access.
    pub async fn clear_instance_url(&self) -> Result<(), ImportError> {
        sqlx::query("UPDATE credentials SET instance_url = '', updated_at = ? WHERE id = 1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Store the client ID and secret issued by app registration.
    pub async fn set_client_app(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), ImportError> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET client_id = ?, client_secret = ?, updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(client_id)
        .bind(client_secret)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store an access token obtained from the token exchange.
    pub async fn set_access_token(&self, access_token: &str) -> Result<(), ImportError> {
        sqlx::query("UPDATE credentials SET access_token = ?, updated_at = ? WHERE id = 1")
            .bind(access_token)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Forget the access token; client keys are kept so the next
    /// authorization does not need to re-register the app.
    pub async fn clear_access_token(&self) -> Result<(), ImportError> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET access_token = '', account_id = '', updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Cache the remote account ID resolved from the access token.
    pub async fn set_account_id(&self, account_id: &str) -> Result<(), ImportError> {
        sqlx::query("UPDATE credentials SET account_id = ?, updated_at = ? WHERE id = 1")
            .bind(account_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record the most recently imported status's remote ID.
    ///
    /// Called once per successful import (not batched) so that a crash
    /// mid-batch resumes after the last imported status.
    pub async fn set_latest_remote_id(&self, remote_id: &str) -> Result<(), ImportError> {
        sqlx::query("UPDATE credentials SET latest_remote_id = ?, updated_at = ? WHERE id = 1")
            .bind(remote_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Hard reset to default credential values, cursor included.
    ///
    /// Local only; revoking the token remotely is the caller's business.
    pub async fn reset_credentials(&self) -> Result<(), ImportError> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET instance_url = '', client_id = '', client_secret = '',
                access_token = '', account_id = '', latest_remote_id = NULL,
                updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Insert a new entry.
    ///
    /// # Returns
    /// The generated entry ID, or `None` when an entry with the same
    /// `source_url` already exists. The UNIQUE constraint makes this the
    /// final word on dedup even when two invocations race.
    pub async fn insert_entry(&self, entry: &NewEntry) -> Result<Option<String>, ImportError> {
        let id = EntityId::new().0;

        let result = sqlx::query(
            r#"
            INSERT INTO entries (
                id, title, body, status, kind, format, author, category,
                published_at, source_id, source_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (source_url) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(&entry.status)
        .bind(&entry.kind)
        .bind(&entry.format)
        .bind(&entry.author)
        .bind(&entry.category)
        .bind(entry.published_at)
        .bind(&entry.source_id)
        .bind(&entry.source_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    /// Check whether some entry was already imported from this URL.
    pub async fn entry_exists_by_source_url(&self, source_url: &str) -> Result<bool, ImportError> {
        let row = sqlx::query("SELECT 1 FROM entries WHERE source_url = ? LIMIT 1")
            .bind(source_url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Get an entry by ID.
    pub async fn get_entry(&self, id: &str) -> Result<Option<Entry>, ImportError> {
        let entry = sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// Get an entry by its canonical source URL.
    pub async fn get_entry_by_source_url(
        &self,
        source_url: &str,
    ) -> Result<Option<Entry>, ImportError> {
        let entry = sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE source_url = ?")
            .bind(source_url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// List all entries in insertion order.
    pub async fn get_entries(&self) -> Result<Vec<Entry>, ImportError> {
        let entries = sqlx::query_as::<_, Entry>("SELECT * FROM entries ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Designate a media record as the entry's featured image.
    pub async fn set_featured_media(
        &self,
        entry_id: &str,
        media_id: &str,
    ) -> Result<(), ImportError> {
        sqlx::query("UPDATE entries SET featured_media_id = ? WHERE id = ?")
            .bind(media_id)
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Set an entry's format.
    pub async fn set_entry_format(&self, entry_id: &str, format: &str) -> Result<(), ImportError> {
        sqlx::query("UPDATE entries SET format = ? WHERE id = ?")
            .bind(format)
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count_entries(&self) -> Result<i64, ImportError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("n"))
    }

    // =========================================================================
    // Media
    // =========================================================================

    /// Look up a media record by its derived file name.
    pub async fn find_media_by_file_name(
        &self,
        file_name: &str,
    ) -> Result<Option<StoredMedia>, ImportError> {
        let media = sqlx::query_as::<_, StoredMedia>("SELECT * FROM media WHERE file_name = ?")
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(media)
    }

    /// Insert a media record.
    pub async fn insert_media(&self, media: &StoredMedia) -> Result<(), ImportError> {
        sqlx::query(
            r#"
            INSERT INTO media (
                id, entry_id, file_name, thumbnail_name, content_type,
                alt_text, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&media.id)
        .bind(&media.entry_id)
        .bind(&media.file_name)
        .bind(&media.thumbnail_name)
        .bind(&media.content_type)
        .bind(&media.alt_text)
        .bind(media.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get all media records linked to an entry, in insertion order.
    pub async fn get_media_by_entry(&self, entry_id: &str) -> Result<Vec<StoredMedia>, ImportError> {
        let media =
            sqlx::query_as::<_, StoredMedia>("SELECT * FROM media WHERE entry_id = ? ORDER BY rowid")
                .bind(entry_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(media)
    }

    pub async fn count_media(&self) -> Result<i64, ImportError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM media")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("n"))
    }
}
