use arrayvec::ArrayVec;
use chess::{Board, ChessMove, MoveGen, Piece};

use crate::types::{piece_value, Score};

pub struct ScoredMove {
    pub mv: ChessMove,
    pub score: Score,
}

const HASH_MOVE_SCORE: Score = 2_000_000;
/// Keeps even the worst capture (king takes pawn) ahead of every quiet move.
const CAPTURE_BASE: Score = 1_000_000;

/// MVV-LVA: prefer valuable victims, cheap attackers.
fn mvv_lva(victim: Score, attacker: Score) -> Score {
    10 * victim - attacker
}

/// Value of the captured piece, if `mv` captures anything. A pawn moving
/// diagonally onto an empty square is an en passant capture of a pawn.
fn capture_victim(board: &Board, mv: ChessMove) -> Option<Score> {
    if let Some(victim) = board.piece_on(mv.get_dest()) {
        return Some(piece_value(victim));
    }
    let attacker = board.piece_on(mv.get_source()).unwrap();
    if attacker == Piece::Pawn
        && mv.get_source().get_file() != mv.get_dest().get_file()
        && board.piece_on(mv.get_dest()).is_none()
    {
        return Some(piece_value(Piece::Pawn));
    }
    None
}

/// Generate and order all legal moves for a node.
///
/// Priority: (1) the hash move, (2) captures by MVV-LVA — en passant and
/// capture-promotions included, non-capture promotions scored as a capture
/// of the promotion gain — (3) quiet moves in generation order. The sort is
/// stable so equal-scored quiets keep the order the rules engine produced.
pub fn order_moves(board: &Board, hash_move: Option<ChessMove>) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    for mv in MoveGen::new_legal(board) {
        let score = if Some(mv) == hash_move {
            HASH_MOVE_SCORE
        } else if let Some(victim) = capture_victim(board, mv) {
            let attacker = piece_value(board.piece_on(mv.get_source()).unwrap());
            CAPTURE_BASE + mvv_lva(victim, attacker)
        } else if let Some(promo) = mv.get_promotion() {
            let gain = piece_value(promo) - piece_value(Piece::Pawn);
            CAPTURE_BASE + mvv_lva(gain, piece_value(Piece::Pawn))
        } else {
            0
        };
        scored.push(ScoredMove { mv, score });
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Generate only capturing moves, ordered by MVV-LVA, for quiescence.
pub fn order_captures(board: &Board) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    for mv in MoveGen::new_legal(board) {
        if let Some(victim) = capture_victim(board, mv) {
            let attacker = piece_value(board.piece_on(mv.get_source()).unwrap());
            scored.push(ScoredMove {
                mv,
                score: mvv_lva(victim, attacker),
            });
        }
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}
