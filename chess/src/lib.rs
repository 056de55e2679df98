pub mod analysis;
pub mod fen;
pub mod phase;
pub mod pgn;
pub mod types;
pub mod uci;

pub use analysis::AnalysisScore;
pub use fen::{format_fen, parse_fen, FenError};
pub use phase::{material_points, non_pawn_material, GamePhase};
pub use types::{PieceColor, PieceKind};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move, parse_uci_move, UciMoveError};

/// A ply is White's move when its 1-indexed position is odd.
pub fn is_white_ply(ply: u32) -> bool {
    ply % 2 == 1
}
