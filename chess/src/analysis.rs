//! Engine evaluation score shared across the engine pool, scheduler and
//! aggregator.

/// A positive centipawn magnitude larger than any realistic material
/// evaluation, used to represent forced mate so that mate scores sort and
/// average sensibly alongside centipawn scores (spec §4.1).
pub const MATE_SENTINEL_CP: i32 = 100_000;

/// Engine evaluation score, from the perspective of the side to move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisScore {
    Centipawns(i32),
    /// Plies to mate. Positive: side to move delivers mate. Negative: side
    /// to move is mated.
    Mate(i32),
}

impl AnalysisScore {
    /// Convert to a clamped centipawn magnitude with sign preserved, per
    /// spec §4.1: "a positive sentinel > any material CP, sign indicates
    /// side to move preference".
    pub fn to_cp(self) -> i32 {
        match self {
            Self::Centipawns(cp) => cp,
            Self::Mate(m) if m >= 0 => MATE_SENTINEL_CP,
            Self::Mate(_) => -MATE_SENTINEL_CP,
        }
    }

    /// Flip to the opponent's perspective.
    pub fn negate(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    pub fn is_mate(self) -> bool {
        matches!(self, Self::Mate(_))
    }
}

impl std::fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) if *m >= 0 => write!(f, "+M{}", m),
            Self::Mate(m) => write!(f, "-M{}", m.abs()),
        }
    }
}
