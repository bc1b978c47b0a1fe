use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::{
    domain::{BucketName, ObjectKey},
    protocol::StoredObjectSummary,
};

/// SQLite-backed object store. Objects are addressed by bucket + key and a
/// put either inserts or overwrites in a single statement.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub summary: StoredObjectSummary,
    pub body: Vec<u8>,
}

const SUMMARY_COLUMNS: &str = "bucket, object_key, content_type, size_bytes, revision, stored_at";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Stores `body` under `bucket`/`key`, replacing any previous object with
    /// the same key. Every put is assigned a fresh, store-wide revision.
    pub async fn put_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        content_type: &str,
        body: &[u8],
    ) -> Result<StoredObjectSummary> {
        let stored_at = Utc::now();
        let rec = sqlx::query(
            "INSERT INTO objects (bucket, object_key, content_type, body, size_bytes, revision, stored_at)
             VALUES (?, ?, ?, ?, ?, (SELECT COALESCE(MAX(revision), 0) + 1 FROM objects), ?)
             ON CONFLICT(bucket, object_key) DO UPDATE SET
                content_type = excluded.content_type,
                body = excluded.body,
                size_bytes = excluded.size_bytes,
                revision = excluded.revision,
                stored_at = excluded.stored_at
             RETURNING revision",
        )
        .bind(bucket.as_str())
        .bind(key.as_str())
        .bind(content_type)
        .bind(body)
        .bind(body.len() as i64)
        .bind(stored_at)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to store object '{key}' in bucket '{bucket}'"))?;

        let revision = rec.get::<i64, _>(0);
        debug!(%bucket, %key, revision, size_bytes = body.len(), "storage: object stored");

        Ok(StoredObjectSummary {
            bucket: bucket.clone(),
            key: key.clone(),
            content_type: content_type.to_string(),
            size_bytes: body.len() as u64,
            revision,
            stored_at,
        })
    }

    pub async fn load_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<Option<StoredObject>> {
        let row = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS}, body FROM objects WHERE bucket = ? AND object_key = ?"
        ))
        .bind(bucket.as_str())
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| stored_object_from_row(&r)).transpose()
    }

    /// Returns the object with the highest revision in `bucket`.
    pub async fn latest_object(&self, bucket: &BucketName) -> Result<Option<StoredObject>> {
        let row = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS}, body
             FROM objects
             WHERE bucket = ?
             ORDER BY revision DESC
             LIMIT 1"
        ))
        .bind(bucket.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| stored_object_from_row(&r)).transpose()
    }

    /// Lists object summaries in `bucket`, most recent first.
    pub async fn list_objects(&self, bucket: &BucketName) -> Result<Vec<StoredObjectSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM objects
             WHERE bucket = ?
             ORDER BY revision DESC"
        ))
        .bind(bucket.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }
}

fn summary_from_row(row: &SqliteRow) -> Result<StoredObjectSummary> {
    Ok(StoredObjectSummary {
        bucket: BucketName(row.try_get("bucket")?),
        key: ObjectKey(row.try_get("object_key")?),
        content_type: row.try_get("content_type")?,
        size_bytes: row.try_get::<i64, _>("size_bytes")? as u64,
        revision: row.try_get("revision")?,
        stored_at: row.try_get::<DateTime<Utc>, _>("stored_at")?,
    })
}

fn stored_object_from_row(row: &SqliteRow) -> Result<StoredObject> {
    Ok(StoredObject {
        summary: summary_from_row(row)?,
        body: row.try_get("body")?,
    })
}

pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
