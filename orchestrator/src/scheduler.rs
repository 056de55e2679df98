//! Per-game analysis pipeline (spec §4.3): replay a PGN move-by-move
//! through the engine pool, classify each move, aggregate personality
//! subscores, and persist both atomically. Cancellation is checked
//! between positions; the whole job is bounded by `max_job_seconds`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aggregator::{compute_game_traits, move_level_novelty_staleness, MoveSignal};
use chess::pgn::tokenize_movetext;
use chess_common::{AnalysisType, Platform};
use cozy_chess::Board;
use engine::EnginePool;
use persistence::{AnalysisIdentity, AnalysisStore, GameAnalysisRow, GameStore, MoveAnalysisRow};

use crate::error::OrchestratorError;
use crate::job::{CancellationToken, JobProgress, JobState};

pub struct AnalysisOutcome {
    pub moves: Vec<MoveAnalysisRow>,
    pub aggregate: GameAnalysisRow,
}

/// Replays `pgn_movetext` from the standard starting position, evaluating
/// each position before and after the played move. Returns move rows plus
/// the game-level aggregate, without touching persistence.
///
/// `partial_moves` mirrors every row as soon as it's computed, so a caller
/// racing this future against a timeout can still recover completed moves
/// after the future itself is dropped (spec §4.3: a timeout preserves
/// completed move rows but not the aggregate).
pub async fn analyze_game_pgn(
    engine_pool: &Arc<EnginePool>,
    pgn_movetext: &str,
    depth: u32,
    cancellation: &CancellationToken,
    progress: &mut JobProgress,
    partial_moves: &Mutex<Vec<MoveAnalysisRow>>,
) -> Result<AnalysisOutcome, OrchestratorError> {
    let entries = tokenize_movetext(pgn_movetext);
    progress.moves_total = entries.len();

    let mut board = Board::default();
    let mut signals = Vec::with_capacity(entries.len());
    let mut rows = Vec::with_capacity(entries.len());

    for entry in entries {
        if cancellation.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let fen_before = chess::format_fen(&board);
        let non_pawn_material_before = chess::non_pawn_material(&board);

        let mv = chess::pgn::san::parse_san(&board, &entry.san)
            .map_err(|source| OrchestratorError::SanParse { ply: entry.ply, source })?;
        let san = entry.san.clone();

        let before_eval = engine_pool
            .evaluate(&fen_before, Some(depth), None, Some(Duration::from_secs(1)), None)
            .await?;

        board.play(mv);
        let fen_after = chess::format_fen(&board);
        let after_eval = engine_pool
            .evaluate(&fen_after, Some(depth), None, Some(Duration::from_secs(1)), None)
            .await?;

        // `after_eval` is from the opponent's perspective (they are now to
        // move); negate to compare against `before_eval` on a common scale.
        let eval_after_same_side = -after_eval.score_cp;
        let centipawn_loss = (before_eval.score_cp - eval_after_same_side).max(0) as u32;

        let signal = MoveSignal {
            ply: entry.ply,
            centipawn_loss,
            eval_before: chess::AnalysisScore::Centipawns(before_eval.score_cp),
            eval_after: chess::AnalysisScore::Centipawns(eval_after_same_side),
            non_pawn_material_before,
        };
        let classification = signal.classification();

        let row = MoveAnalysisRow {
            ply_index: entry.ply as i64,
            move_san: san,
            centipawn_loss: centipawn_loss as i64,
            is_best: classification == aggregator::MoveClassification::Best,
            is_blunder: classification == aggregator::MoveClassification::Blunder,
            is_mistake: classification == aggregator::MoveClassification::Mistake,
            is_inaccuracy: classification == aggregator::MoveClassification::Inaccuracy,
            evaluation_before: before_eval.score_cp as i64,
            evaluation_after: eval_after_same_side as i64,
        };
        partial_moves.lock().expect("partial_moves mutex poisoned").push(row.clone());
        rows.push(row);
        signals.push(signal);

        progress.moves_analyzed += 1;
    }

    let game_traits = compute_game_traits(&signals);
    let (move_novelty, move_staleness) = move_level_novelty_staleness(&signals);

    let count = |f: fn(aggregator::MoveClassification) -> bool| {
        rows.iter()
            .filter(|r| {
                f(aggregator::MoveClassification::from_centipawn_loss(r.centipawn_loss as u32))
            })
            .count() as i64
    };

    let aggregate = GameAnalysisRow {
        tactical: game_traits.tactical,
        positional: game_traits.positional,
        aggressive: game_traits.aggressive,
        patient: game_traits.patient,
        novelty: move_novelty,
        staleness: move_staleness,
        accuracy: if rows.is_empty() {
            100.0
        } else {
            100.0 - (rows.iter().map(|r| r.centipawn_loss).sum::<i64>() as f64 / rows.len() as f64 / 10.0).min(100.0)
        },
        opening_accuracy: None,
        middlegame_accuracy: None,
        endgame_accuracy: None,
        count_best: count(|c| c == aggregator::MoveClassification::Best),
        count_great: count(|c| c == aggregator::MoveClassification::Great),
        count_excellent: count(|c| c == aggregator::MoveClassification::Excellent),
        count_good: count(|c| c == aggregator::MoveClassification::Good),
        count_inaccuracy: count(|c| c == aggregator::MoveClassification::Inaccuracy),
        count_mistake: count(|c| c == aggregator::MoveClassification::Mistake),
        count_blunder: count(|c| c == aggregator::MoveClassification::Blunder),
    };

    Ok(AnalysisOutcome { moves: rows, aggregate })
}

/// Runs the full job for one game: analyze, then persist atomically
/// (spec §4.3's persistence protocol), bounded by `max_job_seconds`.
pub async fn run_game_analysis_job(
    engine_pool: Arc<EnginePool>,
    games: &GameStore,
    analysis_store: &AnalysisStore,
    analytics_cache: &tokio::sync::Mutex<cache::TtlLru<String, String>>,
    user_id: &str,
    platform: Platform,
    provider_game_id: &str,
    analysis_type: AnalysisType,
    pgn: &str,
    depth: u32,
    max_job_seconds: u64,
    cancellation: CancellationToken,
) -> Result<JobProgress, OrchestratorError> {
    let mut progress = JobProgress::new(1);
    progress.current_game_id = Some(provider_game_id.to_string());
    progress.phase = JobState::Running;

    ensure_game_exists(games, user_id, platform, provider_game_id, pgn).await?;

    let identity = AnalysisIdentity {
        user_id,
        platform,
        provider_game_id,
        analysis_type,
    };

    let partial_moves: Mutex<Vec<MoveAnalysisRow>> = Mutex::new(Vec::new());
    let timed_out = tokio::time::timeout(
        Duration::from_secs(max_job_seconds),
        analyze_game_pgn(&engine_pool, pgn, depth, &cancellation, &mut progress, &partial_moves),
    )
    .await;

    let outcome = match timed_out {
        Ok(result) => result?,
        Err(_) => {
            // The inner future was dropped on expiry, but every row it had
            // computed so far survived in `partial_moves`. Persist those
            // and stop: the aggregate is a function of the *whole* game, so
            // one computed from a partial game must never be written.
            let moves = partial_moves.lock().expect("partial_moves mutex poisoned").clone();
            analysis_store.replace_moves_only(&identity, &moves).await?;
            progress.phase = JobState::Failed;
            return Err(OrchestratorError::JobTimeout(max_job_seconds));
        }
    };

    analysis_store
        .replace_analysis(&identity, &outcome.moves, &outcome.aggregate)
        .await?;

    let canonical = persistence::canonical_user_id(user_id, platform);
    analytics_cache
        .lock()
        .await
        .invalidate_matching(|key: &String| key.starts_with(&format!("{canonical}|{}", platform.as_str())));

    progress.phase = JobState::Completed;
    progress.jobs_completed = 1;
    Ok(progress)
}

/// Foreign-key preflight (spec §4.3): if the game row is missing (e.g. an
/// analysis request that raced ahead of import), create a minimal row
/// from what we can infer so the Move Analysis insert doesn't violate the
/// foreign key.
async fn ensure_game_exists(
    games: &GameStore,
    user_id: &str,
    platform: Platform,
    provider_game_id: &str,
    pgn: &str,
) -> Result<(), OrchestratorError> {
    if games.game_exists(user_id, platform, provider_game_id).await? {
        return Ok(());
    }

    let tags = chess::pgn::parse_tags(pgn);
    let played_at = chess::pgn::played_at_from_tags(&tags).unwrap_or_else(chrono::Utc::now);

    let minimal = persistence::Game {
        user_id: user_id.to_string(),
        platform: platform.as_str().to_string(),
        provider_game_id: provider_game_id.to_string(),
        played_at,
        color: chess_common::PlayerColor::White,
        result: chess_common::GameResult::Draw,
        my_rating: None,
        opponent_rating: None,
        time_control: None,
        opening: tags.get("Opening").cloned(),
        opening_normalized: None,
        opening_family: tags.get("ECO").cloned(),
    };

    games
        .upsert_games(
            platform,
            &[(provider_game_id.to_string(), minimal, Some(pgn.to_string()))],
        )
        .await?;
    Ok(())
}
