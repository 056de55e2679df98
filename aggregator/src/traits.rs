//! Per-game personality trait scores (spec §4.5). Aggressive and Patient
//! follow the literal formulas spec.md gives; Tactical and Positional are
//! only specified qualitatively there ("increases with X, decreases with
//! Y") so this module picks concrete coefficients consistent with that
//! direction — recorded as a design decision rather than left ambiguous.

use crate::classification::{MoveClassification, MoveSignal};
use chess::GamePhase;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameTraitScores {
    pub tactical: f64,
    pub positional: f64,
    pub aggressive: f64,
    pub patient: f64,
    pub time_score: f64,
    pub total_moves: usize,
}

struct GameRates {
    total: usize,
    forcing: usize,
    quiet: usize,
    best_in_forcing: usize,
    quiet_best: usize,
    quiet_drift_cp: u64,
    blunders: usize,
    mistakes: usize,
    inaccuracies: usize,
    best: usize,
    endgame_moves: usize,
    max_error_streak: usize,
    max_clean_streak: usize,
}

fn collect_rates(moves: &[MoveSignal]) -> GameRates {
    let mut r = GameRates {
        total: moves.len(),
        forcing: 0,
        quiet: 0,
        best_in_forcing: 0,
        quiet_best: 0,
        quiet_drift_cp: 0,
        blunders: 0,
        mistakes: 0,
        inaccuracies: 0,
        best: 0,
        endgame_moves: 0,
        max_error_streak: 0,
        max_clean_streak: 0,
    };

    let mut error_streak = 0usize;
    let mut clean_streak = 0usize;

    for mv in moves {
        let classification = mv.classification();
        let forcing = mv.is_forcing();

        if forcing {
            r.forcing += 1;
            if classification == MoveClassification::Best {
                r.best_in_forcing += 1;
            }
        } else {
            r.quiet += 1;
            if classification == MoveClassification::Best {
                r.quiet_best += 1;
            }
            r.quiet_drift_cp += mv.centipawn_loss as u64;
        }

        match classification {
            MoveClassification::Best => r.best += 1,
            MoveClassification::Blunder => r.blunders += 1,
            MoveClassification::Mistake => r.mistakes += 1,
            MoveClassification::Inaccuracy => r.inaccuracies += 1,
            _ => {}
        }

        if mv.phase() == GamePhase::Endgame {
            r.endgame_moves += 1;
        }

        if classification.is_error() {
            error_streak += 1;
            clean_streak = 0;
            r.max_error_streak = r.max_error_streak.max(error_streak);
        } else {
            clean_streak += 1;
            error_streak = 0;
            r.max_clean_streak = r.max_clean_streak.max(clean_streak);
        }
    }

    r
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn clamp_0_100(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Time-management proxy, used when platform clock data is unavailable
/// (spec §4.5): derived purely from error/best rates.
fn time_score(r: &GameRates) -> f64 {
    let blunder_rate = ratio(r.blunders, r.total);
    let mistake_rate = ratio(r.mistakes, r.total);
    let overall_error_rate = ratio(r.blunders + r.mistakes + r.inaccuracies, r.total);
    let best_rate = ratio(r.best, r.total);
    // Consistency proxy: fraction of moves outside the worst error streak,
    // i.e. how much of the game was clean play rather than one long slide.
    let consistency = clamp_0_100(100.0 - ratio(r.max_error_streak, r.total) * 100.0);

    clamp_0_100(
        50.0 - (blunder_rate * 80.0 + mistake_rate * 40.0 + overall_error_rate * 20.0)
            + (best_rate * 30.0 + consistency * 0.2),
    )
}

const BONUS_CAP: f64 = 10.0;

pub fn compute_game_traits(moves: &[MoveSignal]) -> GameTraitScores {
    if moves.is_empty() {
        return GameTraitScores {
            tactical: 50.0,
            positional: 50.0,
            aggressive: 50.0,
            patient: 50.0,
            time_score: 50.0,
            total_moves: 0,
        };
    }

    let r = collect_rates(moves);
    let forcing_ratio = ratio(r.forcing, r.total);
    let quiet_ratio = ratio(r.quiet, r.total);
    let blunder_rate = ratio(r.blunders, r.total);
    let mistake_rate = ratio(r.mistakes, r.total);
    let inaccuracy_rate = ratio(r.inaccuracies, r.total);

    let tactical = clamp_0_100(
        50.0 + ratio(r.best_in_forcing, r.forcing.max(1)) * 40.0
            - (blunder_rate * 25.0 + mistake_rate * 15.0),
    );

    let quiet_accuracy = ratio(r.quiet_best, r.quiet.max(1)) * 40.0;
    let quiet_drift_penalty = (ratio(r.quiet_drift_cp as usize, r.quiet.max(1))).min(40.0);
    let positional = clamp_0_100(50.0 + quiet_accuracy - quiet_drift_penalty);

    let aggressive = clamp_0_100(
        50.0 + forcing_ratio * 45.0 - quiet_ratio * 38.0
            - (blunder_rate * 15.0 + mistake_rate * 10.0),
    );

    let time = time_score(&r);
    let stability_bonus = (BONUS_CAP - r.max_error_streak as f64 * 3.0).clamp(0.0, BONUS_CAP);
    let endgame_bonus = (ratio(r.endgame_moves, r.total) * BONUS_CAP).clamp(0.0, BONUS_CAP);
    let time_bonus = ((time - 50.0) / 5.0).clamp(-BONUS_CAP, BONUS_CAP);
    let streak_bonus = (r.max_clean_streak as f64).min(BONUS_CAP);

    let patient = clamp_0_100(
        50.0 + quiet_ratio * 24.0 - forcing_ratio * 44.0
            + stability_bonus
            + endgame_bonus
            + time_bonus
            + streak_bonus
            - (blunder_rate * 28.0 + mistake_rate * 16.0 + inaccuracy_rate * 10.0),
    );

    GameTraitScores {
        tactical,
        positional,
        aggressive,
        patient,
        time_score: time,
        total_moves: r.total,
    }
}

/// Move-level contribution to novelty/staleness (spec §4.5: "10%
/// move-level contribution (local pattern variety)"). Variety is how
/// many of the seven classification buckets appear in the game;
/// staleness is how dominant the single most frequent bucket is.
pub fn move_level_novelty_staleness(moves: &[MoveSignal]) -> (f64, f64) {
    if moves.is_empty() {
        return (50.0, 50.0);
    }

    let mut counts = [0usize; 7];
    for mv in moves {
        counts[mv.classification() as usize] += 1;
    }
    let distinct = counts.iter().filter(|&&c| c > 0).count();
    let max_count = counts.iter().copied().max().unwrap_or(0);

    let novelty = clamp_0_100(distinct as f64 / 7.0 * 100.0);
    let staleness = clamp_0_100(max_count as f64 / moves.len() as f64 * 100.0);
    (novelty, staleness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::AnalysisScore;

    fn clean_move(ply: u32) -> MoveSignal {
        MoveSignal {
            ply,
            centipawn_loss: 0,
            eval_before: AnalysisScore::Centipawns(10),
            eval_after: AnalysisScore::Centipawns(20),
            non_pawn_material_before: 30,
        }
    }

    fn blunder_move(ply: u32) -> MoveSignal {
        MoveSignal {
            ply,
            centipawn_loss: 400,
            eval_before: AnalysisScore::Centipawns(10),
            eval_after: AnalysisScore::Centipawns(-300),
            non_pawn_material_before: 30,
        }
    }

    #[test]
    fn test_empty_game_returns_neutral_scores() {
        let scores = compute_game_traits(&[]);
        assert_eq!(scores.tactical, 50.0);
        assert_eq!(scores.total_moves, 0);
    }

    #[test]
    fn test_clean_quiet_game_scores_high_patient_low_aggressive() {
        let moves: Vec<MoveSignal> = (1..=30).map(clean_move).collect();
        let scores = compute_game_traits(&moves);
        assert!(scores.patient > 50.0, "patient={}", scores.patient);
        assert!(scores.aggressive < 50.0, "aggressive={}", scores.aggressive);
    }

    #[test]
    fn test_blunder_heavy_game_depresses_every_trait_but_aggressive_direction() {
        let moves: Vec<MoveSignal> = (1..=10).map(blunder_move).collect();
        let scores = compute_game_traits(&moves);
        assert!(scores.patient < 50.0, "patient={}", scores.patient);
        assert!(scores.tactical < 50.0, "tactical={}", scores.tactical);
    }

    #[test]
    fn test_all_scores_stay_within_bounds() {
        let mut moves: Vec<MoveSignal> = (1..=20).map(clean_move).collect();
        moves.extend((21..=25).map(blunder_move));
        let scores = compute_game_traits(&moves);
        for v in [scores.tactical, scores.positional, scores.aggressive, scores.patient, scores.time_score] {
            assert!((0.0..=100.0).contains(&v), "out of range: {v}");
        }
    }
}
