//! Per-move classification and phase-aware signal extraction. Thresholds
//! and category names are spec.md §4.5's 5/15/25/50/100/200 CP ladder;
//! the category split itself generalizes the teacher's
//! `analysis::review_types::MoveClassification` (Best/Excellent/Good/
//! Brilliant/Inaccuracy/Mistake/Blunder) to the seven-way ladder spec.md
//! names explicitly.

use chess::AnalysisScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MoveClassification {
    Best,
    Great,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveClassification {
    pub fn from_centipawn_loss(centipawn_loss: u32) -> Self {
        match centipawn_loss {
            0..=5 => Self::Best,
            6..=15 => Self::Great,
            16..=25 => Self::Excellent,
            26..=50 => Self::Good,
            51..=100 => Self::Inaccuracy,
            101..=200 => Self::Mistake,
            _ => Self::Blunder,
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::Inaccuracy | Self::Mistake | Self::Blunder)
    }
}

/// Swing above this magnitude counts a move as "forcing" rather than
/// "quiet" (spec §4.5's forcing/quiet split). Half the teacher's 100cp
/// favorable-swing threshold: that threshold flags decisive swings,
/// this one only needs to flag positions where the evaluation moved
/// enough that a calm continuation wasn't available.
pub const FORCING_SWING_THRESHOLD_CP: i32 = 50;

/// One analyzed ply, as produced by the engine pool for a single game.
#[derive(Debug, Clone)]
pub struct MoveSignal {
    pub ply: u32,
    pub centipawn_loss: u32,
    pub eval_before: AnalysisScore,
    pub eval_after: AnalysisScore,
    pub non_pawn_material_before: u32,
}

impl MoveSignal {
    pub fn classification(&self) -> MoveClassification {
        MoveClassification::from_centipawn_loss(self.centipawn_loss)
    }

    pub fn swing_magnitude(&self) -> i32 {
        (self.eval_after.to_cp() - self.eval_before.to_cp()).abs()
    }

    pub fn is_forcing(&self) -> bool {
        self.swing_magnitude() > FORCING_SWING_THRESHOLD_CP
    }

    pub fn phase(&self) -> chess::GamePhase {
        if self.ply <= 20 {
            chess::GamePhase::Opening
        } else if self.non_pawn_material_before <= 10 {
            chess::GamePhase::Endgame
        } else {
            chess::GamePhase::Middlegame
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_ladder_boundaries() {
        assert_eq!(MoveClassification::from_centipawn_loss(0), MoveClassification::Best);
        assert_eq!(MoveClassification::from_centipawn_loss(5), MoveClassification::Best);
        assert_eq!(MoveClassification::from_centipawn_loss(6), MoveClassification::Great);
        assert_eq!(MoveClassification::from_centipawn_loss(25), MoveClassification::Excellent);
        assert_eq!(MoveClassification::from_centipawn_loss(50), MoveClassification::Good);
        assert_eq!(MoveClassification::from_centipawn_loss(100), MoveClassification::Inaccuracy);
        assert_eq!(MoveClassification::from_centipawn_loss(200), MoveClassification::Mistake);
        assert_eq!(MoveClassification::from_centipawn_loss(201), MoveClassification::Blunder);
    }

    #[test]
    fn test_is_error_excludes_good_moves() {
        assert!(!MoveClassification::Good.is_error());
        assert!(MoveClassification::Inaccuracy.is_error());
        assert!(MoveClassification::Blunder.is_error());
    }

    #[test]
    fn test_forcing_vs_quiet_swing() {
        let quiet = MoveSignal {
            ply: 10,
            centipawn_loss: 0,
            eval_before: AnalysisScore::Centipawns(20),
            eval_after: AnalysisScore::Centipawns(40),
            non_pawn_material_before: 30,
        };
        let forcing = MoveSignal {
            ply: 10,
            centipawn_loss: 0,
            eval_before: AnalysisScore::Centipawns(20),
            eval_after: AnalysisScore::Centipawns(200),
            non_pawn_material_before: 30,
        };
        assert!(!quiet.is_forcing());
        assert!(forcing.is_forcing());
    }

    #[test]
    fn test_phase_boundaries_mirror_chess_crate() {
        let opening = MoveSignal {
            ply: 15,
            centipawn_loss: 0,
            eval_before: AnalysisScore::Centipawns(0),
            eval_after: AnalysisScore::Centipawns(0),
            non_pawn_material_before: 30,
        };
        let endgame = MoveSignal {
            ply: 41,
            centipawn_loss: 0,
            eval_before: AnalysisScore::Centipawns(0),
            eval_after: AnalysisScore::Centipawns(0),
            non_pawn_material_before: 8,
        };
        assert_eq!(opening.phase(), chess::GamePhase::Opening);
        assert_eq!(endgame.phase(), chess::GamePhase::Endgame);
    }
}
