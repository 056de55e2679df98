//! Import Session lifecycle: exactly one active session per `(user_id,
//! platform)`, tracked across the two-phase probe/backfill walk described
//! in spec §4.2.

use chess_common::Platform;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::canonical::canonical_user_id;
use crate::error::PersistenceError;
use crate::models::{ImportPhase, ImportSessionRow};

pub struct ImportSessionStore {
    pool: SqlitePool,
}

impl ImportSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn start(&self, user_id: &str, platform: Platform) -> Result<(), PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        sqlx::query(
            "INSERT INTO import_sessions
                (user_id, platform, phase, cursor, imported_count, checked_count,
                 skipped_duplicates, started_at, status_message)
             VALUES (?, ?, ?, NULL, 0, 0, 0, CURRENT_TIMESTAMP, NULL)
             ON CONFLICT (user_id, platform) DO UPDATE SET
                phase = excluded.phase,
                cursor = NULL,
                imported_count = 0,
                checked_count = 0,
                skipped_duplicates = 0,
                started_at = CURRENT_TIMESTAMP,
                status_message = NULL",
        )
        .bind(&user_id)
        .bind(platform.as_str())
        .bind(ImportPhase::ProbeNew.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn advance(
        &self,
        user_id: &str,
        platform: Platform,
        phase: ImportPhase,
        cursor: Option<&str>,
        imported_delta: i64,
        checked_delta: i64,
        skipped_delta: i64,
    ) -> Result<(), PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        sqlx::query(
            "UPDATE import_sessions SET
                phase = ?,
                cursor = ?,
                imported_count = imported_count + ?,
                checked_count = checked_count + ?,
                skipped_duplicates = skipped_duplicates + ?
             WHERE user_id = ? AND platform = ?",
        )
        .bind(phase.as_str())
        .bind(cursor)
        .bind(imported_delta)
        .bind(checked_delta)
        .bind(skipped_delta)
        .bind(&user_id)
        .bind(platform.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail(
        &self,
        user_id: &str,
        platform: Platform,
        message: &str,
    ) -> Result<(), PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        sqlx::query(
            "UPDATE import_sessions SET phase = ?, status_message = ?
             WHERE user_id = ? AND platform = ?",
        )
        .bind(ImportPhase::Error.as_str())
        .bind(message)
        .bind(&user_id)
        .bind(platform.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drops the session row once the cooldown after completion has
    /// elapsed, allowing a fresh `start` to run again later.
    pub async fn destroy(&self, user_id: &str, platform: Platform) -> Result<(), PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        sqlx::query("DELETE FROM import_sessions WHERE user_id = ? AND platform = ?")
            .bind(&user_id)
            .bind(platform.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Option<ImportSessionRow>, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        let row: Option<ImportSessionSql> = sqlx::query_as(
            "SELECT phase, cursor, imported_count, checked_count, skipped_duplicates,
                    started_at, status_message
             FROM import_sessions WHERE user_id = ? AND platform = ?",
        )
        .bind(&user_id)
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
struct ImportSessionSql {
    phase: String,
    cursor: Option<String>,
    imported_count: i64,
    checked_count: i64,
    skipped_duplicates: i64,
    started_at: DateTime<Utc>,
    status_message: Option<String>,
}

impl From<ImportSessionSql> for ImportSessionRow {
    fn from(r: ImportSessionSql) -> Self {
        Self {
            phase: ImportPhase::parse(&r.phase).unwrap_or(ImportPhase::Error),
            cursor: r.cursor,
            imported_count: r.imported_count,
            checked_count: r.checked_count,
            skipped_duplicates: r.skipped_duplicates,
            started_at: r.started_at,
            status_message: r.status_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn test_start_then_get_returns_probe_new() {
        let db = Database::new_in_memory().await.unwrap();
        let store = ImportSessionStore::new(db.pool().clone());
        store.start("alice", Platform::Lichess).await.unwrap();

        let row = store.get("alice", Platform::Lichess).await.unwrap().unwrap();
        assert_eq!(row.phase, ImportPhase::ProbeNew);
        assert_eq!(row.imported_count, 0);
    }

    #[tokio::test]
    async fn test_advance_accumulates_counters() {
        let db = Database::new_in_memory().await.unwrap();
        let store = ImportSessionStore::new(db.pool().clone());
        store.start("bob", Platform::ChessCom).await.unwrap();

        store
            .advance("bob", Platform::ChessCom, ImportPhase::ProbeNew, Some("cursor-1"), 40, 50, 10)
            .await
            .unwrap();
        store
            .advance("bob", Platform::ChessCom, ImportPhase::BackfillOld, Some("cursor-2"), 35, 35, 0)
            .await
            .unwrap();

        let row = store.get("bob", Platform::ChessCom).await.unwrap().unwrap();
        assert_eq!(row.phase, ImportPhase::BackfillOld);
        assert_eq!(row.cursor.as_deref(), Some("cursor-2"));
        assert_eq!(row.imported_count, 75);
        assert_eq!(row.checked_count, 85);
        assert_eq!(row.skipped_duplicates, 10);
    }

    #[tokio::test]
    async fn test_restart_resets_existing_session() {
        let db = Database::new_in_memory().await.unwrap();
        let store = ImportSessionStore::new(db.pool().clone());
        store.start("carol", Platform::Lichess).await.unwrap();
        store
            .advance("carol", Platform::Lichess, ImportPhase::BackfillOld, Some("x"), 100, 100, 5)
            .await
            .unwrap();

        store.start("carol", Platform::Lichess).await.unwrap();
        let row = store.get("carol", Platform::Lichess).await.unwrap().unwrap();
        assert_eq!(row.phase, ImportPhase::ProbeNew);
        assert_eq!(row.imported_count, 0);
        assert!(row.cursor.is_none());
    }

    #[tokio::test]
    async fn test_destroy_removes_session() {
        let db = Database::new_in_memory().await.unwrap();
        let store = ImportSessionStore::new(db.pool().clone());
        store.start("dave", Platform::Lichess).await.unwrap();
        store.destroy("dave", Platform::Lichess).await.unwrap();
        assert!(store.get("dave", Platform::Lichess).await.unwrap().is_none());
    }
}
