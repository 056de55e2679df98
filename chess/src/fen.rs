use cozy_chess::Board;

/// Parse a FEN string into a [`Board`].
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    if fen.split_whitespace().next().is_none() {
        return Err(FenError::InvalidFormat);
    }
    fen.parse().map_err(|_| FenError::InvalidFormat)
}

/// Format a [`Board`] as a FEN string.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("invalid FEN format")]
    InvalidFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_starting_position() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        assert!(parse_fen(fen).is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_fen("not a fen").is_err());
        assert!(parse_fen("").is_err());
    }

    #[test]
    fn test_format_roundtrip() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let board = parse_fen(fen).unwrap();
        assert_eq!(format_fen(&board), fen);
    }
}
