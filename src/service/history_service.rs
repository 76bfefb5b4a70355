use chrono::NaiveDateTime;
use sqlx::{FromRow, SqlitePool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    domain::{HistoryAction, HistoryEntry},
    error::Result,
    repository::{parse_optional_uuid, parse_uuid, to_utc},
};

#[derive(FromRow)]
struct HistoryRow {
    id: String,
    event_id: String,
    registration_id: Option<String>,
    waiting_list_id: Option<String>,
    action: String,
    email: Option<String>,
    detail: Option<String>,
    created_at: NaiveDateTime,
}

/// Append-only registration audit trail.
///
/// Entries go to the `registration_history` table. When that table is
/// missing they are kept in process memory instead, and are lost on
/// restart. There is intentionally no way to edit or remove an entry.
pub struct HistoryService {
    pool: SqlitePool,
    fallback: RwLock<Vec<HistoryEntry>>,
}

impl HistoryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            fallback: RwLock::new(Vec::new()),
        }
    }

    async fn table_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'registration_history'"
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Never fails the calling workflow: storage problems divert the entry
    /// to the in-memory buffer.
    pub async fn record(&self, entry: HistoryEntry) -> HistoryEntry {
        match self.table_exists().await {
            Ok(true) => match self.insert(&entry).await {
                Ok(()) => return entry,
                Err(e) => tracing::error!("Failed to write history entry {}: {}", entry.id, e),
            },
            Ok(false) => {
                tracing::warn!(
                    "registration_history table missing, buffering {} entry in memory",
                    entry.action.as_str()
                );
            }
            Err(e) => tracing::error!("Failed to check for history table: {}", e),
        }

        self.fallback.write().await.push(entry.clone());
        entry
    }

    async fn insert(&self, entry: &HistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO registration_history (
                id, event_id, registration_id, waiting_list_id, action, email, detail, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(entry.id.to_string())
        .bind(entry.event_id.to_string())
        .bind(entry.registration_id.map(|id| id.to_string()))
        .bind(entry.waiting_list_id.map(|id| id.to_string()))
        .bind(entry.action.as_str())
        .bind(&entry.email)
        .bind(&entry.detail)
        .bind(entry.created_at.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Newest first, optionally restricted to one event.
    pub async fn list(&self, event_id: Option<Uuid>, limit: i64) -> Result<Vec<HistoryEntry>> {
        let mut entries = if self.table_exists().await? {
            let rows = sqlx::query_as::<_, HistoryRow>(
                r#"
                SELECT id, event_id, registration_id, waiting_list_id, action, email, detail, created_at
                FROM registration_history
                WHERE ? IS NULL OR event_id = ?
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?
                "#
            )
            .bind(event_id.map(|id| id.to_string()))
            .bind(event_id.map(|id| id.to_string()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter()
                .map(Self::row_to_entry)
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let buffered = self.fallback.read().await;
        entries.extend(
            buffered
                .iter()
                .filter(|e| event_id.map_or(true, |id| e.event_id == id))
                .cloned(),
        );

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit.max(0) as usize);

        Ok(entries)
    }

    pub async fn buffered_count(&self) -> usize {
        self.fallback.read().await.len()
    }

    fn row_to_entry(row: HistoryRow) -> Result<HistoryEntry> {
        Ok(HistoryEntry {
            id: parse_uuid(&row.id)?,
            event_id: parse_uuid(&row.event_id)?,
            registration_id: parse_optional_uuid(row.registration_id.as_deref())?,
            waiting_list_id: parse_optional_uuid(row.waiting_list_id.as_deref())?,
            action: HistoryAction::parse(&row.action)?,
            email: row.email,
            detail: row.detail,
            created_at: to_utc(row.created_at),
        })
    }
}
