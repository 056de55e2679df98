//! Game + PGN repository: idempotent upserts with read-back verification,
//! chronologically ordered reads, and the left-anti-join selector for
//! unanalyzed games.

use chess_common::{AnalysisType, Platform};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::canonical::canonical_user_id;
use crate::error::PersistenceError;
use crate::models::{color_from_str, color_to_str, result_from_str, result_to_str, Game};

pub struct GameStore {
    pool: SqlitePool,
}

impl GameStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert games, counted as `(inserted, skipped_duplicates)`. A game
    /// row is considered truly committed only after a read-back query
    /// confirms its presence (spec §4.2: defence against silently-failed
    /// writes).
    pub async fn upsert_games(
        &self,
        platform: Platform,
        games: &[(String, Game, Option<String>)],
    ) -> Result<(usize, usize), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        let mut skipped = 0usize;

        for (provider_game_id, game, pgn) in games {
            let user_id = canonical_user_id(&game.user_id, platform);
            let existing: Option<(i64,)> = sqlx::query_as(
                "SELECT id FROM games WHERE user_id = ? AND platform = ? AND provider_game_id = ?",
            )
            .bind(&user_id)
            .bind(platform.as_str())
            .bind(provider_game_id)
            .fetch_optional(&mut *tx)
            .await?;

            if existing.is_some() {
                skipped += 1;
            } else {
                inserted += 1;
            }

            sqlx::query(
                "INSERT INTO games
                    (user_id, platform, provider_game_id, played_at, color, result,
                     my_rating, opponent_rating, time_control, opening, opening_normalized,
                     opening_family, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                 ON CONFLICT (user_id, platform, provider_game_id) DO UPDATE SET
                    played_at = excluded.played_at,
                    color = excluded.color,
                    result = excluded.result,
                    my_rating = excluded.my_rating,
                    opponent_rating = excluded.opponent_rating,
                    time_control = excluded.time_control,
                    opening = excluded.opening,
                    opening_normalized = excluded.opening_normalized,
                    opening_family = excluded.opening_family,
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(&user_id)
            .bind(platform.as_str())
            .bind(provider_game_id)
            .bind(game.played_at.to_rfc3339())
            .bind(color_to_str(game.color))
            .bind(result_to_str(game.result))
            .bind(game.my_rating)
            .bind(game.opponent_rating)
            .bind(&game.time_control)
            .bind(&game.opening)
            .bind(&game.opening_normalized)
            .bind(&game.opening_family)
            .execute(&mut *tx)
            .await?;

            if let Some(pgn) = pgn {
                sqlx::query(
                    "INSERT INTO games_pgn (user_id, platform, provider_game_id, pgn)
                     VALUES (?, ?, ?, ?)
                     ON CONFLICT (user_id, platform, provider_game_id) DO UPDATE SET pgn = excluded.pgn",
                )
                .bind(&user_id)
                .bind(platform.as_str())
                .bind(provider_game_id)
                .bind(pgn)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        let ids: Vec<&str> = games.iter().map(|(id, _, _)| id.as_str()).collect();
        let canonical = games
            .first()
            .map(|(_, g, _)| canonical_user_id(&g.user_id, platform))
            .unwrap_or_default();
        let committed = self.count_committed(platform, &canonical, &ids).await?;
        if committed != games.len() {
            return Err(PersistenceError::ReadBackVerificationFailed {
                expected: games.len(),
                found: committed,
            });
        }

        tracing::debug!(
            user_id = %canonical,
            platform = platform.as_str(),
            inserted,
            skipped,
            "upserted games batch"
        );
        Ok((inserted, skipped))
    }

    pub async fn game_exists(
        &self,
        user_id: &str,
        platform: Platform,
        provider_game_id: &str,
    ) -> Result<bool, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM games WHERE user_id = ? AND platform = ? AND provider_game_id = ?",
        )
        .bind(&user_id)
        .bind(platform.as_str())
        .bind(provider_game_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(existing.is_some())
    }

    async fn count_committed(
        &self,
        platform: Platform,
        user_id: &str,
        provider_game_ids: &[&str],
    ) -> Result<usize, PersistenceError> {
        if provider_game_ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; provider_game_ids.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM games WHERE user_id = ? AND platform = ? AND provider_game_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (i64,)>(&sql).bind(user_id).bind(platform.as_str());
        for id in provider_game_ids {
            query = query.bind(*id);
        }
        let (count,): (i64,) = query.fetch_one(&self.pool).await?;
        Ok(count as usize)
    }

    /// `played_at DESC, provider_game_id DESC` tiebreak, per spec §4.4.
    pub async fn get_games_ordered(
        &self,
        user_id: &str,
        platform: Platform,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Game>, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        let rows: Vec<GameRow> = sqlx::query_as(
            "SELECT user_id, platform, provider_game_id, played_at, color, result,
                    my_rating, opponent_rating, time_control, opening, opening_normalized,
                    opening_family
             FROM games
             WHERE user_id = ? AND platform = ?
             ORDER BY played_at DESC, provider_game_id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(&user_id)
        .bind(platform.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GameRow::into_game).collect())
    }

    /// Left-anti-join: games for `(user_id, platform)` with no
    /// `game_analyses` row under `analysis_type`.
    pub async fn list_unanalyzed(
        &self,
        user_id: &str,
        platform: Platform,
        analysis_type: AnalysisType,
        n: i64,
    ) -> Result<Vec<(String, DateTime<Utc>)>, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT g.provider_game_id, g.played_at
             FROM games g
             LEFT JOIN game_analyses ga
               ON ga.user_id = g.user_id
              AND ga.platform = g.platform
              AND ga.provider_game_id = g.provider_game_id
              AND ga.analysis_type = ?
             WHERE g.user_id = ? AND g.platform = ? AND ga.id IS NULL
             ORDER BY g.played_at DESC, g.provider_game_id DESC
             LIMIT ?",
        )
        .bind(analysis_type.as_str())
        .bind(&user_id)
        .bind(platform.as_str())
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, played_at)| {
                DateTime::parse_from_rfc3339(&played_at)
                    .ok()
                    .map(|dt| (id, dt.with_timezone(&Utc)))
            })
            .collect())
    }

    pub async fn delete_user_analyses(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<u64, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        let result = sqlx::query("DELETE FROM game_analyses WHERE user_id = ? AND platform = ?")
            .bind(&user_id)
            .bind(platform.as_str())
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM move_analyses WHERE user_id = ? AND platform = ?")
            .bind(&user_id)
            .bind(platform.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn fetch_pgns(
        &self,
        user_id: &str,
        platform: Platform,
        provider_game_ids: &[String],
    ) -> Result<std::collections::HashMap<String, String>, PersistenceError> {
        let user_id = canonical_user_id(user_id, platform);
        if provider_game_ids.is_empty() {
            return Ok(std::collections::HashMap::new());
        }
        let placeholders = vec!["?"; provider_game_ids.len()].join(", ");
        let sql = format!(
            "SELECT provider_game_id, pgn FROM games_pgn
             WHERE user_id = ? AND platform = ? AND provider_game_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql).bind(&user_id).bind(platform.as_str());
        for id in provider_game_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }
}

#[derive(sqlx::FromRow)]
struct GameRow {
    user_id: String,
    platform: String,
    provider_game_id: String,
    played_at: String,
    color: String,
    result: String,
    my_rating: Option<i32>,
    opponent_rating: Option<i32>,
    time_control: Option<String>,
    opening: Option<String>,
    opening_normalized: Option<String>,
    opening_family: Option<String>,
}

impl GameRow {
    fn into_game(self) -> Game {
        Game {
            user_id: self.user_id,
            platform: self.platform,
            provider_game_id: self.provider_game_id,
            played_at: DateTime::parse_from_rfc3339(&self.played_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            color: color_from_str(&self.color),
            result: result_from_str(&self.result),
            my_rating: self.my_rating,
            opponent_rating: self.opponent_rating,
            time_control: self.time_control,
            opening: self.opening,
            opening_normalized: self.opening_normalized,
            opening_family: self.opening_family,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use chess_common::{GameResult, PlayerColor};

    fn sample_game(user_id: &str, played_at: DateTime<Utc>) -> Game {
        Game {
            user_id: user_id.to_string(),
            platform: "chess.com".to_string(),
            provider_game_id: String::new(),
            played_at,
            color: PlayerColor::White,
            result: GameResult::Win,
            my_rating: Some(1500),
            opponent_rating: Some(1480),
            time_control: Some("600".to_string()),
            opening: Some("Italian Game".to_string()),
            opening_normalized: Some("Italian Game".to_string()),
            opening_family: Some("C50".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upsert_then_get_games_ordered() {
        let db = Database::new_in_memory().await.unwrap();
        let store = GameStore::new(db.pool().clone());

        let g1 = sample_game("HiKaRu", Utc::now() - chrono::Duration::hours(2));
        let g2 = sample_game("HiKaRu", Utc::now() - chrono::Duration::hours(1));

        let (inserted, skipped) = store
            .upsert_games(
                Platform::ChessCom,
                &[
                    ("game-1".to_string(), g1, Some("1. e4 e5".to_string())),
                    ("game-2".to_string(), g2, Some("1. d4 d5".to_string())),
                ],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(skipped, 0);

        let games = store
            .get_games_ordered("hikaru", Platform::ChessCom, 10, 0)
            .await
            .unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].provider_game_id, "game-2");
        assert_eq!(games[1].provider_game_id, "game-1");
    }

    #[tokio::test]
    async fn test_case_variant_user_ids_collapse_to_one_identity() {
        let db = Database::new_in_memory().await.unwrap();
        let store = GameStore::new(db.pool().clone());

        store
            .upsert_games(
                Platform::ChessCom,
                &[(
                    "game-1".to_string(),
                    sample_game("Hikaru", Utc::now()),
                    None,
                )],
            )
            .await
            .unwrap();

        let (inserted, skipped) = store
            .upsert_games(
                Platform::ChessCom,
                &[(
                    "game-1".to_string(),
                    sample_game("HIKARU", Utc::now()),
                    None,
                )],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(skipped, 1);

        let games = store
            .get_games_ordered("hikaru", Platform::ChessCom, 10, 0)
            .await
            .unwrap();
        assert_eq!(games.len(), 1);
    }

    #[tokio::test]
    async fn test_list_unanalyzed_excludes_analyzed_games() {
        let db = Database::new_in_memory().await.unwrap();
        let store = GameStore::new(db.pool().clone());

        store
            .upsert_games(
                Platform::ChessCom,
                &[
                    ("game-1".to_string(), sample_game("bob", Utc::now()), None),
                    ("game-2".to_string(), sample_game("bob", Utc::now()), None),
                ],
            )
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO game_analyses
                (user_id, platform, provider_game_id, analysis_type,
                 tactical, positional, aggressive, patient, novelty, staleness, accuracy)
             VALUES ('bob', 'chess.com', 'game-1', 'stockfish', 50, 50, 50, 50, 50, 50, 80)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let unanalyzed = store
            .list_unanalyzed("bob", Platform::ChessCom, AnalysisType::Stockfish, 10)
            .await
            .unwrap();
        assert_eq!(unanalyzed.len(), 1);
        assert_eq!(unanalyzed[0].0, "game-2");
    }
}
