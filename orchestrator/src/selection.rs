//! Job selection for batch analysis (spec §4.3): fetch candidates
//! strictly `played_at DESC`, validate the ordering, exclude already
//! analyzed games, fetch and re-order PGNs, then take the first N.

use chess_common::{AnalysisType, Platform};
use chrono::{DateTime, Utc};
use persistence::GameStore;

use crate::error::OrchestratorError;

pub struct AnalysisCandidate {
    pub provider_game_id: String,
    pub played_at: DateTime<Utc>,
    pub pgn: String,
}

fn validate_descending(games: &[(String, DateTime<Utc>)]) -> Result<(), OrchestratorError> {
    for window in games.windows(2) {
        if window[1].1 > window[0].1 {
            return Err(OrchestratorError::OrderingViolation(format!(
                "{} (played_at {}) is newer than preceding {} (played_at {})",
                window[1].0, window[1].1, window[0].0, window[0].1
            )));
        }
    }
    Ok(())
}

pub async fn select_unanalyzed_games(
    games: &GameStore,
    user_id: &str,
    platform: Platform,
    analysis_type: AnalysisType,
    n: usize,
) -> Result<Vec<AnalysisCandidate>, OrchestratorError> {
    let ordered = games
        .list_unanalyzed(user_id, platform, analysis_type, n as i64)
        .await?;
    validate_descending(&ordered)?;

    let ids: Vec<String> = ordered.iter().map(|(id, _)| id.clone()).collect();
    let pgn_map = games.fetch_pgns(user_id, platform, &ids).await?;

    let mut candidates = Vec::with_capacity(ordered.len());
    for (provider_game_id, played_at) in ordered.into_iter().take(n) {
        let Some(pgn) = pgn_map.get(&provider_game_id) else {
            return Err(OrchestratorError::PgnUnavailable(provider_game_id));
        };
        candidates.push(AnalysisCandidate {
            provider_game_id,
            played_at,
            pgn: pgn.clone(),
        });
    }

    Ok(candidates)
}
