//! Move Analysis + Game Analysis repository. The two are written together:
//! spec §4.3's persistence protocol is "delete+insert move rows then
//! upsert aggregate, commit, then invalidate cache" — the commit boundary
//! here covers the first two; cache invalidation is the caller's job once
//! this returns `Ok`, since this crate has no cache dependency.

use chess_common::{AnalysisType, Platform};
use sqlx::SqlitePool;

use crate::canonical::canonical_user_id;
use crate::error::PersistenceError;
use crate::models::{GameAnalysisRow, MoveAnalysisRow};

pub struct AnalysisStore {
    pool: SqlitePool,
}

pub struct AnalysisIdentity<'a> {
    pub user_id: &'a str,
    pub platform: Platform,
    pub provider_game_id: &'a str,
    pub analysis_type: AnalysisType,
}

impl AnalysisStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically replace every move-analysis row and the game-analysis
    /// aggregate for one `(identity, analysis_type)`. The aggregate is a
    /// pure function of the move rows (spec §3's invariant), so they are
    /// always rewritten together.
    pub async fn replace_analysis(
        &self,
        identity: &AnalysisIdentity<'_>,
        moves: &[MoveAnalysisRow],
        aggregate: &GameAnalysisRow,
    ) -> Result<(), PersistenceError> {
        let user_id = canonical_user_id(identity.user_id, identity.platform);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM move_analyses
             WHERE user_id = ? AND platform = ? AND provider_game_id = ? AND analysis_type = ?",
        )
        .bind(&user_id)
        .bind(identity.platform.as_str())
        .bind(identity.provider_game_id)
        .bind(identity.analysis_type.as_str())
        .execute(&mut *tx)
        .await?;

        for row in moves {
            sqlx::query(
                "INSERT INTO move_analyses
                    (user_id, platform, provider_game_id, analysis_type, ply_index, move_san,
                     centipawn_loss, is_best, is_blunder, is_mistake, is_inaccuracy,
                     evaluation_before, evaluation_after)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&user_id)
            .bind(identity.platform.as_str())
            .bind(identity.provider_game_id)
            .bind(identity.analysis_type.as_str())
            .bind(row.ply_index)
            .bind(&row.move_san)
            .bind(row.centipawn_loss)
            .bind(row.is_best)
            .bind(row.is_blunder)
            .bind(row.is_mistake)
            .bind(row.is_inaccuracy)
            .bind(row.evaluation_before)
            .bind(row.evaluation_after)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO game_analyses
                (user_id, platform, provider_game_id, analysis_type, tactical, positional,
                 aggressive, patient, novelty, staleness, accuracy, opening_accuracy,
                 middlegame_accuracy, endgame_accuracy, count_best, count_great, count_excellent,
                 count_good, count_inaccuracy, count_mistake, count_blunder, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT (user_id, platform, provider_game_id, analysis_type) DO UPDATE SET
                tactical = excluded.tactical,
                positional = excluded.positional,
                aggressive = excluded.aggressive,
                patient = excluded.patient,
                novelty = excluded.novelty,
                staleness = excluded.staleness,
                accuracy = excluded.accuracy,
                opening_accuracy = excluded.opening_accuracy,
                middlegame_accuracy = excluded.middlegame_accuracy,
                endgame_accuracy = excluded.endgame_accuracy,
                count_best = excluded.count_best,
                count_great = excluded.count_great,
                count_excellent = excluded.count_excellent,
                count_good = excluded.count_good,
                count_inaccuracy = excluded.count_inaccuracy,
                count_mistake = excluded.count_mistake,
                count_blunder = excluded.count_blunder,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(&user_id)
        .bind(identity.platform.as_str())
        .bind(identity.provider_game_id)
        .bind(identity.analysis_type.as_str())
        .bind(aggregate.tactical)
        .bind(aggregate.positional)
        .bind(aggregate.aggressive)
        .bind(aggregate.patient)
        .bind(aggregate.novelty)
        .bind(aggregate.staleness)
        .bind(aggregate.accuracy)
        .bind(aggregate.opening_accuracy)
        .bind(aggregate.middlegame_accuracy)
        .bind(aggregate.endgame_accuracy)
        .bind(aggregate.count_best)
        .bind(aggregate.count_great)
        .bind(aggregate.count_excellent)
        .bind(aggregate.count_good)
        .bind(aggregate.count_inaccuracy)
        .bind(aggregate.count_mistake)
        .bind(aggregate.count_blunder)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace only the move-analysis rows, leaving any existing
    /// game-analysis aggregate untouched. Used when a job is cut short
    /// (spec §4.3: a timed-out job keeps its completed move rows but must
    /// not publish a game-level aggregate computed from a partial game).
    pub async fn replace_moves_only(
        &self,
        identity: &AnalysisIdentity<'_>,
        moves: &[MoveAnalysisRow],
    ) -> Result<(), PersistenceError> {
        let user_id = canonical_user_id(identity.user_id, identity.platform);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM move_analyses
             WHERE user_id = ? AND platform = ? AND provider_game_id = ? AND analysis_type = ?",
        )
        .bind(&user_id)
        .bind(identity.platform.as_str())
        .bind(identity.provider_game_id)
        .bind(identity.analysis_type.as_str())
        .execute(&mut *tx)
        .await?;

        for row in moves {
            sqlx::query(
                "INSERT INTO move_analyses
                    (user_id, platform, provider_game_id, analysis_type, ply_index, move_san,
                     centipawn_loss, is_best, is_blunder, is_mistake, is_inaccuracy,
                     evaluation_before, evaluation_after)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&user_id)
            .bind(identity.platform.as_str())
            .bind(identity.provider_game_id)
            .bind(identity.analysis_type.as_str())
            .bind(row.ply_index)
            .bind(&row.move_san)
            .bind(row.centipawn_loss)
            .bind(row.is_best)
            .bind(row.is_blunder)
            .bind(row.is_mistake)
            .bind(row.is_inaccuracy)
            .bind(row.evaluation_before)
            .bind(row.evaluation_after)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn load_move_analyses(
        &self,
        identity: &AnalysisIdentity<'_>,
    ) -> Result<Vec<MoveAnalysisRow>, PersistenceError> {
        let user_id = canonical_user_id(identity.user_id, identity.platform);
        let rows: Vec<MoveAnalysisRowSql> = sqlx::query_as(
            "SELECT ply_index, move_san, centipawn_loss, is_best, is_blunder, is_mistake,
                    is_inaccuracy, evaluation_before, evaluation_after
             FROM move_analyses
             WHERE user_id = ? AND platform = ? AND provider_game_id = ? AND analysis_type = ?
             ORDER BY ply_index ASC",
        )
        .bind(&user_id)
        .bind(identity.platform.as_str())
        .bind(identity.provider_game_id)
        .bind(identity.analysis_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct MoveAnalysisRowSql {
    ply_index: i64,
    move_san: String,
    centipawn_loss: i64,
    is_best: bool,
    is_blunder: bool,
    is_mistake: bool,
    is_inaccuracy: bool,
    evaluation_before: i64,
    evaluation_after: i64,
}

impl From<MoveAnalysisRowSql> for MoveAnalysisRow {
    fn from(r: MoveAnalysisRowSql) -> Self {
        Self {
            ply_index: r.ply_index,
            move_san: r.move_san,
            centipawn_loss: r.centipawn_loss,
            is_best: r.is_best,
            is_blunder: r.is_blunder,
            is_mistake: r.is_mistake,
            is_inaccuracy: r.is_inaccuracy,
            evaluation_before: r.evaluation_before,
            evaluation_after: r.evaluation_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::games::GameStore;
    use chess_common::{GameResult, PlayerColor};
    use chrono::Utc;

    fn sample_aggregate() -> GameAnalysisRow {
        GameAnalysisRow {
            tactical: 62.0,
            positional: 55.0,
            aggressive: 48.0,
            patient: 52.0,
            novelty: 60.0,
            staleness: 40.0,
            accuracy: 91.5,
            opening_accuracy: Some(95.0),
            middlegame_accuracy: Some(88.0),
            endgame_accuracy: Some(92.0),
            count_best: 20,
            count_great: 5,
            count_excellent: 3,
            count_good: 2,
            count_inaccuracy: 1,
            count_mistake: 0,
            count_blunder: 0,
        }
    }

    #[tokio::test]
    async fn test_replace_analysis_is_atomic_and_queryable() {
        let db = Database::new_in_memory().await.unwrap();
        let games = GameStore::new(db.pool().clone());
        games
            .upsert_games(
                Platform::Lichess,
                &[(
                    "game-1".to_string(),
                    crate::models::Game {
                        user_id: "alice".to_string(),
                        platform: "lichess".to_string(),
                        provider_game_id: String::new(),
                        played_at: Utc::now(),
                        color: PlayerColor::White,
                        result: GameResult::Win,
                        my_rating: None,
                        opponent_rating: None,
                        time_control: None,
                        opening: None,
                        opening_normalized: None,
                        opening_family: None,
                    },
                    None,
                )],
            )
            .await
            .unwrap();

        let store = AnalysisStore::new(db.pool().clone());
        let identity = AnalysisIdentity {
            user_id: "alice",
            platform: Platform::Lichess,
            provider_game_id: "game-1",
            analysis_type: AnalysisType::Stockfish,
        };
        let moves = vec![MoveAnalysisRow {
            ply_index: 1,
            move_san: "e4".to_string(),
            centipawn_loss: 0,
            is_best: true,
            is_blunder: false,
            is_mistake: false,
            is_inaccuracy: false,
            evaluation_before: 20,
            evaluation_after: 25,
        }];

        store.replace_analysis(&identity, &moves, &sample_aggregate()).await.unwrap();

        let loaded = store.load_move_analyses(&identity).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].move_san, "e4");
    }

    #[tokio::test]
    async fn test_reanalysis_replaces_prior_move_rows() {
        let db = Database::new_in_memory().await.unwrap();
        let games = GameStore::new(db.pool().clone());
        games
            .upsert_games(
                Platform::Lichess,
                &[(
                    "game-1".to_string(),
                    crate::models::Game {
                        user_id: "bob".to_string(),
                        platform: "lichess".to_string(),
                        provider_game_id: String::new(),
                        played_at: Utc::now(),
                        color: PlayerColor::Black,
                        result: GameResult::Loss,
                        my_rating: None,
                        opponent_rating: None,
                        time_control: None,
                        opening: None,
                        opening_normalized: None,
                        opening_family: None,
                    },
                    None,
                )],
            )
            .await
            .unwrap();

        let store = AnalysisStore::new(db.pool().clone());
        let identity = AnalysisIdentity {
            user_id: "bob",
            platform: Platform::Lichess,
            provider_game_id: "game-1",
            analysis_type: AnalysisType::Stockfish,
        };
        let first_pass = vec![
            MoveAnalysisRow {
                ply_index: 1,
                move_san: "e4".to_string(),
                centipawn_loss: 0,
                is_best: true,
                is_blunder: false,
                is_mistake: false,
                is_inaccuracy: false,
                evaluation_before: 0,
                evaluation_after: 10,
            },
            MoveAnalysisRow {
                ply_index: 2,
                move_san: "e5".to_string(),
                centipawn_loss: 0,
                is_best: true,
                is_blunder: false,
                is_mistake: false,
                is_inaccuracy: false,
                evaluation_before: 10,
                evaluation_after: 10,
            },
        ];
        store.replace_analysis(&identity, &first_pass, &sample_aggregate()).await.unwrap();

        let second_pass = vec![MoveAnalysisRow {
            ply_index: 1,
            move_san: "d4".to_string(),
            centipawn_loss: 0,
            is_best: true,
            is_blunder: false,
            is_mistake: false,
            is_inaccuracy: false,
            evaluation_before: 0,
            evaluation_after: 15,
        }];
        store.replace_analysis(&identity, &second_pass, &sample_aggregate()).await.unwrap();

        let loaded = store.load_move_analyses(&identity).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].move_san, "d4");
    }

    #[tokio::test]
    async fn test_replace_moves_only_leaves_prior_aggregate_in_place() {
        let db = Database::new_in_memory().await.unwrap();
        let games = GameStore::new(db.pool().clone());
        games
            .upsert_games(
                Platform::Lichess,
                &[(
                    "game-1".to_string(),
                    crate::models::Game {
                        user_id: "carol".to_string(),
                        platform: "lichess".to_string(),
                        provider_game_id: String::new(),
                        played_at: Utc::now(),
                        color: PlayerColor::White,
                        result: GameResult::Win,
                        my_rating: None,
                        opponent_rating: None,
                        time_control: None,
                        opening: None,
                        opening_normalized: None,
                        opening_family: None,
                    },
                    None,
                )],
            )
            .await
            .unwrap();

        let store = AnalysisStore::new(db.pool().clone());
        let identity = AnalysisIdentity {
            user_id: "carol",
            platform: Platform::Lichess,
            provider_game_id: "game-1",
            analysis_type: AnalysisType::Stockfish,
        };
        let full_aggregate = sample_aggregate();
        store.replace_analysis(&identity, &[], &full_aggregate).await.unwrap();

        let partial_moves = vec![MoveAnalysisRow {
            ply_index: 1,
            move_san: "e4".to_string(),
            centipawn_loss: 0,
            is_best: true,
            is_blunder: false,
            is_mistake: false,
            is_inaccuracy: false,
            evaluation_before: 0,
            evaluation_after: 10,
        }];
        store.replace_moves_only(&identity, &partial_moves).await.unwrap();

        let loaded = store.load_move_analyses(&identity).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].move_san, "e4");

        let aggregate_row: (f64,) = sqlx::query_as(
            "SELECT tactical FROM game_analyses
             WHERE user_id = ? AND platform = ? AND provider_game_id = ? AND analysis_type = ?",
        )
        .bind(canonical_user_id("carol", Platform::Lichess))
        .bind(Platform::Lichess.as_str())
        .bind("game-1")
        .bind(AnalysisType::Stockfish.as_str())
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(aggregate_row.0, full_aggregate.tactical);
    }
}
