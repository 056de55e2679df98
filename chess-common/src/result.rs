use serde::{Deserialize, Serialize};

/// The color a player held in a given game, independent of any board
/// representation — this crate has no chess-engine dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

/// Outcome of a game from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

/// Which analysis pass produced a Move Analysis / Game Analysis row.
/// Part of the unique identity of both, alongside `(user_id, platform,
/// provider_game_id)` — distinct analysis_types must coexist rather than
/// overwrite one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Stockfish,
    Deep,
}

impl AnalysisType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stockfish => "stockfish",
            Self::Deep => "deep",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_color_opposite() {
        assert_eq!(PlayerColor::White.opposite(), PlayerColor::Black);
        assert_eq!(PlayerColor::Black.opposite(), PlayerColor::White);
    }
}
