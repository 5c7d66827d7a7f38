use chess::{Board, Color, Square, ALL_SQUARES};

use crate::pst::{self, EG_TABLE, MG_TABLE};
use crate::types::Score;

/// Table index for a piece of `color` on `sq`: tables are written from
/// White's perspective with rank 8 first, so White flips the rank.
fn pst_index(color: Color, sq: Square) -> usize {
    match color {
        Color::White => sq.to_index() ^ 56,
        Color::Black => sq.to_index(),
    }
}

/// Tapered material + piece-square evaluation.
///
/// Midgame and endgame totals are accumulated per side in one pass over the
/// board, blended by the remaining-material phase, and returned from the
/// side-to-move's perspective (positive = good for the mover).
pub fn evaluate(board: &Board) -> Score {
    let mut mg: [Score; 2] = [0, 0]; // [white, black]
    let mut eg: [Score; 2] = [0, 0];
    let mut phase: i32 = 0;

    for sq in ALL_SQUARES {
        if let Some(piece) = board.piece_on(sq) {
            let color = board.color_on(sq).unwrap();
            let idx = piece.to_index();
            let side = color.to_index();
            let table_idx = pst_index(color, sq);

            mg[side] += pst::MATERIAL[idx] + MG_TABLE[idx][table_idx];
            eg[side] += pst::MATERIAL[idx] + EG_TABLE[idx][table_idx];
            phase += pst::PHASE_WEIGHT[idx];
        }
    }

    // Promotions can push the phase past the opening total
    let phase = phase.min(pst::TOTAL_PHASE);

    let mg_total = mg[0] - mg[1];
    let eg_total = eg[0] - eg[1];
    let score = (mg_total * phase + eg_total * (pst::TOTAL_PHASE - phase)) / pst::TOTAL_PHASE;

    if board.side_to_move() == Color::White {
        score
    } else {
        -score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_startpos_near_zero() {
        let board = Board::default();
        let score = evaluate(&board);
        assert!(score.abs() < 50, "startpos score {} too far from 0", score);
    }

    #[test]
    fn test_white_up_a_queen() {
        let board = Board::from_str("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .unwrap();
        let score = evaluate(&board);
        assert!(score > 800, "white up a queen should score high, got {}", score);
    }

    #[test]
    fn test_score_is_side_relative() {
        // Black up a queen, black to move: positive for the mover
        let board = Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNB1KBNR b KQkq - 0 1")
            .unwrap();
        let score = evaluate(&board);
        assert!(score > 800, "mover's advantage must be positive, got {}", score);
    }

    #[test]
    fn test_perspective_flip_is_negation() {
        // Same piece layout, only the side to move differs
        let white = Board::from_str("4k3/8/8/3r4/8/2N5/8/4K3 w - - 0 1").unwrap();
        let black = Board::from_str("4k3/8/8/3r4/8/2N5/8/4K3 b - - 0 1").unwrap();
        assert_eq!(evaluate(&white), -evaluate(&black));
    }

    #[test]
    fn test_endgame_king_prefers_center() {
        // Pawn endgame, phase 0: the centralised king should outscore the
        // cornered one.
        let central = Board::from_str("8/8/3k4/8/3K4/8/4P3/8 w - - 0 1").unwrap();
        let cornered = Board::from_str("8/8/3k4/8/8/8/4P3/K7 w - - 0 1").unwrap();
        assert!(evaluate(&central) > evaluate(&cornered));
    }

    #[test]
    fn test_extra_pawn_wins_endgame_eval() {
        let board = Board::from_str("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        let score = evaluate(&board);
        assert!(score > 0, "extra pawn should be positive, got {}", score);
    }
}
