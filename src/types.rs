use chess::Piece;

pub type Score = i32;

pub const SCORE_INFINITY: Score = 32_000;
pub const SCORE_MATE: Score = 30_000;
pub const MAX_PLY: usize = 64;

/// Any score at or beyond this magnitude encodes a mate distance.
pub const MATE_THRESHOLD: Score = SCORE_MATE - MAX_PLY as Score;

/// Piece values in centipawns, indexed by `Piece::to_index()`.
/// The king value only matters for capture ordering.
pub const PIECE_VALUES: [Score; 6] = [100, 320, 330, 500, 900, 20_000];

pub fn piece_value(piece: Piece) -> Score {
    PIECE_VALUES[piece.to_index()]
}

pub fn is_mate_score(score: Score) -> bool {
    score.abs() >= MATE_THRESHOLD
}

/// Score for delivering mate `ply` plies from the root.
pub fn mate_in(ply: usize) -> Score {
    SCORE_MATE - ply as Score
}

/// Score for being mated `ply` plies from the root.
pub fn mated_in(ply: usize) -> Score {
    -SCORE_MATE + ply as Score
}

/// Adjust a score for TT storage: mate distances become relative to the
/// node being stored instead of the root.
pub fn score_to_tt(score: Score, ply: usize) -> Score {
    if score >= MATE_THRESHOLD {
        score + ply as Score
    } else if score <= -MATE_THRESHOLD {
        score - ply as Score
    } else {
        score
    }
}

/// Inverse of [`score_to_tt`]: rebase a stored mate distance onto the
/// ply of the probing node.
pub fn score_from_tt(score: Score, ply: usize) -> Score {
    if score >= MATE_THRESHOLD {
        score - ply as Score
    } else if score <= -MATE_THRESHOLD {
        score + ply as Score
    } else {
        score
    }
}
