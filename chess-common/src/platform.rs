use std::fmt;

use serde::{Deserialize, Serialize};

/// A supported external chess platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Lichess,
    ChessCom,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lichess => "lichess",
            Self::ChessCom => "chess.com",
        }
    }

    /// Canonicalize a user id for this platform: Chess.com usernames are
    /// case-insensitive and commonly mistyped with surrounding whitespace,
    /// so they are lowercased and trimmed; Lichess usernames are
    /// case-preserving and must pass through unchanged. Every query and
    /// every write MUST route through this function so that "Hikaru",
    /// "HIKARU" and "HiKaRu" resolve to one identity on Chess.com.
    pub fn canonicalize_user_id(self, user_id: &str) -> String {
        match self {
            Self::Lichess => user_id.to_string(),
            Self::ChessCom => user_id.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatformError(String);

impl std::str::FromStr for Platform {
    type Err = UnknownPlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lichess" => Ok(Self::Lichess),
            "chess.com" | "chesscom" => Ok(Self::ChessCom),
            other => Err(UnknownPlatformError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chess_com_canonicalization_is_case_insensitive() {
        let canonical = Platform::ChessCom.canonicalize_user_id("HiKaRu");
        assert_eq!(canonical, "hikaru");
        assert_eq!(canonical, Platform::ChessCom.canonicalize_user_id("HIKARU"));
        assert_eq!(canonical, Platform::ChessCom.canonicalize_user_id("  hikaru  "));
    }

    #[test]
    fn test_lichess_canonicalization_preserves_case() {
        assert_eq!(Platform::Lichess.canonicalize_user_id("DrNykterstein"), "DrNykterstein");
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let once = Platform::ChessCom.canonicalize_user_id("Magnus");
        let twice = Platform::ChessCom.canonicalize_user_id(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_from_str_roundtrip() {
        assert_eq!("lichess".parse::<Platform>().unwrap(), Platform::Lichess);
        assert_eq!("chess.com".parse::<Platform>().unwrap(), Platform::ChessCom);
        assert!("chessbase".parse::<Platform>().is_err());
    }
}
