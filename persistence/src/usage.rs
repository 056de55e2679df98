//! Rate-limit counters backing the admission control in spec §4.3:
//! anonymous callers are capped per `(client_ip, day)`, authenticated
//! callers per `(user_id, platform, month)`.

use chess_common::Platform;
use sqlx::SqlitePool;

use crate::canonical::canonical_user_id;
use crate::error::PersistenceError;

pub struct UsageStore {
    pool: SqlitePool,
}

impl UsageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Increments the anonymous counter for `day` (caller-supplied,
    /// `"%Y-%m-%d"`) and returns the count after the increment.
    pub async fn record_anonymous(&self, client_ip: &str, day: &str) -> Result<i64, PersistenceError> {
        sqlx::query(
            "INSERT INTO usage_tracking_anonymous (client_ip, day, request_count)
             VALUES (?, ?, 1)
             ON CONFLICT (client_ip, day) DO UPDATE SET
                request_count = request_count + 1",
        )
        .bind(client_ip)
        .bind(day)
        .execute(&self.pool)
        .await?;

        let (count,): (i64,) = sqlx::query_as(
            "SELECT request_count FROM usage_tracking_anonymous WHERE client_ip = ? AND day = ?",
        )
        .bind(client_ip)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn anonymous_count(&self, client_ip: &str, day: &str) -> Result<i64, PersistenceError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT request_count FROM usage_tracking_anonymous WHERE client_ip = ? AND day = ?",
        )
        .bind(client_ip)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0).unwrap_or(0))
    }

    /// Increments the authenticated counter for `month` (caller-supplied,
    /// `"%Y-%m"`) and returns the count after the increment.
    pub async fn record_authenticated(
        &self,
        user_id: &str,
        platform: Platform,
        month: &str,
    ) -> Result<i64, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        sqlx::query(
            "INSERT INTO usage_tracking_authenticated (user_id, platform, month, request_count)
             VALUES (?, ?, ?, 1)
             ON CONFLICT (user_id, platform, month) DO UPDATE SET
                request_count = request_count + 1",
        )
        .bind(&user_id)
        .bind(platform.as_str())
        .bind(month)
        .execute(&self.pool)
        .await?;

        let (count,): (i64,) = sqlx::query_as(
            "SELECT request_count FROM usage_tracking_authenticated
             WHERE user_id = ? AND platform = ? AND month = ?",
        )
        .bind(&user_id)
        .bind(platform.as_str())
        .bind(month)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn authenticated_count(
        &self,
        user_id: &str,
        platform: Platform,
        month: &str,
    ) -> Result<i64, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT request_count FROM usage_tracking_authenticated
             WHERE user_id = ? AND platform = ? AND month = ?",
        )
        .bind(&user_id)
        .bind(platform.as_str())
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn test_anonymous_counter_increments_and_persists_per_day() {
        let db = Database::new_in_memory().await.unwrap();
        let store = UsageStore::new(db.pool().clone());

        assert_eq!(store.record_anonymous("1.2.3.4", "2026-08-01").await.unwrap(), 1);
        assert_eq!(store.record_anonymous("1.2.3.4", "2026-08-01").await.unwrap(), 2);
        assert_eq!(store.record_anonymous("1.2.3.4", "2026-08-02").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_authenticated_counter_canonicalizes_chess_com_identity() {
        let db = Database::new_in_memory().await.unwrap();
        let store = UsageStore::new(db.pool().clone());

        store.record_authenticated("Hikaru", Platform::ChessCom, "2026-08").await.unwrap();
        let count = store.record_authenticated("HIKARU", Platform::ChessCom, "2026-08").await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_unrecorded_counter_reads_zero() {
        let db = Database::new_in_memory().await.unwrap();
        let store = UsageStore::new(db.pool().clone());
        assert_eq!(store.anonymous_count("9.9.9.9", "2026-08-01").await.unwrap(), 0);
        assert_eq!(
            store.authenticated_count("nobody", Platform::Lichess, "2026-08").await.unwrap(),
            0
        );
    }
}
