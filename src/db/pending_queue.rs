use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::CacheError;
use crate::models::PendingOperation;

/// Durable log of mutations made while offline.
#[derive(Clone)]
pub struct PendingQueue {
    pool: SqlitePool,
}

/// An operation together with its position in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedOperation {
    pub id: i64,
    pub operation: PendingOperation,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OperationRow {
    id: i64,
    payload: String,
    created_at: String,
}

impl PendingQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends an operation and returns its ordinal.
    pub async fn enqueue(&self, operation: &PendingOperation) -> Result<i64, CacheError> {
        let payload = serde_json::to_string(operation)?;

        let result = sqlx::query(
            "INSERT INTO pending_operations (kind, word, payload, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(operation.kind().to_string())
        .bind(operation.word())
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Every queued operation, oldest first.
    pub async fn list(&self) -> Result<Vec<QueuedOperation>, CacheError> {
        let rows: Vec<OperationRow> = sqlx::query_as(
            "SELECT id, payload, created_at FROM pending_operations ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate).collect()
    }

    /// Removes one entry; false when it was already gone.
    pub async fn remove(&self, id: i64) -> Result<bool, CacheError> {
        let result = sqlx::query("DELETE FROM pending_operations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reads and removes every entry in one transaction.
    pub async fn drain_all(&self) -> Result<Vec<QueuedOperation>, CacheError> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<OperationRow> = sqlx::query_as(
            "SELECT id, payload, created_at FROM pending_operations ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;
        let operations = rows
            .into_iter()
            .map(hydrate)
            .collect::<Result<Vec<_>, _>>()?;

        sqlx::query("DELETE FROM pending_operations")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(operations)
    }

    pub async fn clear(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM pending_operations")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn len(&self) -> Result<i64, CacheError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_operations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }
}

fn hydrate(row: OperationRow) -> Result<QueuedOperation, CacheError> {
    Ok(QueuedOperation {
        id: row.id,
        operation: serde_json::from_str(&row.payload)?,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
