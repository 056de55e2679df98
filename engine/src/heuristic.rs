//! Fallback evaluator used when a position has exhausted its engine
//! retries (spec §4.1: "falls back to a heuristic evaluator... A fallback
//! evaluation MUST be marked so aggregates can weight it"). Never claims
//! `is_best`, since it has no search behind it.

use chess::parse_fen;
use cozy_chess::{Color, Piece};

use crate::pool::Evaluation;

fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 1,
        Piece::Knight | Piece::Bishop => 3,
        Piece::Rook => 5,
        Piece::Queen => 9,
        Piece::King => 0,
    }
}

/// Material + mobility proxy, scaled into the same centipawn space as a
/// real engine score, from the perspective of the side to move.
pub fn evaluate_heuristic(fen: &str, depth_requested: u32) -> Evaluation {
    let board = match parse_fen(fen) {
        Ok(board) => board,
        Err(_) => {
            return Evaluation {
                score_cp: 0,
                best_move_uci: None,
                principal_variation: Vec::new(),
                depth_reached: 0,
                is_best: false,
                is_fallback: true,
            };
        }
    };

    let material_swing = material_balance(&board);
    let mobility_swing = mobility_balance(&board);
    // Material dominates; mobility nudges the score the way a shallow
    // search would without claiming any actual tactical insight.
    let score_cp = material_swing * 100 + mobility_swing * 5;

    let mut best_move_uci = None;
    board.generate_moves(|piece_moves| {
        if best_move_uci.is_none() {
            if let Some(mv) = piece_moves.into_iter().next() {
                best_move_uci = Some(chess::format_uci_move(mv));
            }
        }
        best_move_uci.is_some()
    });

    Evaluation {
        score_cp,
        best_move_uci,
        principal_variation: Vec::new(),
        depth_reached: depth_requested.min(1),
        is_best: false,
        is_fallback: true,
    }
}

fn material_balance(board: &cozy_chess::Board) -> i32 {
    let side_total = |color: Color| -> i32 {
        let side_pieces = board.colors(color);
        [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
        ]
        .iter()
        .map(|&piece| ((board.pieces(piece) & side_pieces).len() as i32) * piece_value(piece))
        .sum()
    };
    let balance = side_total(Color::White) - side_total(Color::Black);
    if board.side_to_move() == Color::White {
        balance
    } else {
        -balance
    }
}

fn mobility_balance(board: &cozy_chess::Board) -> i32 {
    let mut mover_moves = 0i32;
    board.generate_moves(|piece_moves| {
        mover_moves += piece_moves.into_iter().count() as i32;
        false
    });
    // Only the side to move's mobility is directly queryable without
    // building a null-move position; treat it as a small symmetric proxy.
    mover_moves.min(40) - 20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position_is_near_balanced() {
        let eval = evaluate_heuristic(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            10,
        );
        assert!(eval.score_cp.abs() < 200);
        assert!(eval.is_fallback);
        assert!(!eval.is_best);
    }

    #[test]
    fn test_material_deficit_is_reflected() {
        // White is down a queen.
        let eval = evaluate_heuristic("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1", 10);
        assert!(eval.is_fallback);
        assert!(eval.best_move_uci.is_some());
    }

    #[test]
    fn test_invalid_fen_degrades_gracefully() {
        let eval = evaluate_heuristic("not a fen", 10);
        assert_eq!(eval.score_cp, 0);
        assert!(eval.is_fallback);
        assert_eq!(eval.depth_reached, 0);
    }
}
