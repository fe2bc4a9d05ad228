use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::CacheError;
use crate::models::{normalize_key, WordEntry};

/// Last known copy of the spreadsheet, keyed by lowercased word.
#[derive(Clone)]
pub struct WordCache {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct WordRow {
    record: String,
}

impl WordCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every cached record, deleted ones included, ordered by key.
    pub async fn get_all(&self) -> Result<Vec<WordEntry>, CacheError> {
        let rows: Vec<WordRow> = sqlx::query_as("SELECT record FROM words ORDER BY word")
            .fetch_all(&self.pool)
            .await?;
        hydrate_all(rows)
    }

    /// Non-deleted records only.
    pub async fn get_active(&self) -> Result<Vec<WordEntry>, CacheError> {
        let rows: Vec<WordRow> =
            sqlx::query_as("SELECT record FROM words WHERE is_deleted = 0 ORDER BY word")
                .fetch_all(&self.pool)
                .await?;
        hydrate_all(rows)
    }

    pub async fn get(&self, word: &str) -> Result<Option<WordEntry>, CacheError> {
        let row: Option<WordRow> = sqlx::query_as("SELECT record FROM words WHERE word = ?")
            .bind(normalize_key(word))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.record)?)),
            None => Ok(None),
        }
    }

    /// Active words whose category matches, ignoring ASCII case.
    pub async fn get_by_category(&self, category: &str) -> Result<Vec<WordEntry>, CacheError> {
        let rows: Vec<WordRow> = sqlx::query_as(
            "SELECT record FROM words \
             WHERE category = ? COLLATE NOCASE AND is_deleted = 0 ORDER BY word",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        hydrate_all(rows)
    }

    /// Inserts or replaces the record stored under the entry's key.
    pub async fn put(&self, entry: &WordEntry) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;
        upsert(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replaces the whole cache with `entries` in one transaction.
    pub async fn replace_all(&self, entries: &[WordEntry]) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM words").execute(&mut *tx).await?;
        for entry in entries {
            if entry.key().is_empty() {
                tracing::debug!("skipping row without a word");
                continue;
            }
            upsert(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM words")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, CacheError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM words")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn upsert(tx: &mut Transaction<'_, Sqlite>, entry: &WordEntry) -> Result<(), CacheError> {
    let key = entry.key();
    if key.is_empty() {
        return Err(CacheError::EmptyKey);
    }
    let record = serde_json::to_string(entry)?;

    sqlx::query(
        r#"
        INSERT INTO words (word, category, is_deleted, version, record, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(word) DO UPDATE SET
            category = excluded.category,
            is_deleted = excluded.is_deleted,
            version = excluded.version,
            record = excluded.record,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&key)
    .bind(&entry.category)
    .bind(entry.is_deleted)
    .bind(entry.version as i64)
    .bind(&record)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn hydrate_all(rows: Vec<WordRow>) -> Result<Vec<WordEntry>, CacheError> {
    rows.into_iter()
        .map(|row| serde_json::from_str(&row.record).map_err(CacheError::from))
        .collect()
}
