use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chess::{Board, ChessMove};

use crate::evaluation::evaluate;
use crate::movegen::{order_captures, order_moves};
use crate::position::{Position, Terminal};
use crate::tt::{Bound, TranspositionTable};
use crate::types::{
    is_mate_score, mated_in, Score, MAX_PLY, SCORE_INFINITY, SCORE_MATE,
};

/// Consult the wall clock every this many nodes; the stop flag itself is
/// checked on every node.
const TIME_CHECK_INTERVAL: u64 = 2048;

/// No capture can recover a position this far below alpha (queen value).
const DELTA_MARGIN: Score = 900;

/// Mutable search state threaded through the recursion.
pub struct SearchState {
    pub nodes: u64,
    pub qnodes: u64,
    pub tt_probes: u64,
    pub tt_hits: u64,
    pub cutoffs: u64,
    pub seldepth: usize,
    pub start_time: Instant,
    pub stop: Arc<AtomicBool>,
    /// Hard per-move budget; `None` means no time limit.
    pub budget_ms: Option<u64>,
    pub tt: TranspositionTable,
    pub root_best_move: Option<ChessMove>,
    pub use_quiescence: bool,
    /// Suppress per-iteration `info` output (tests, benches).
    pub silent: bool,
    /// Include the pv section in `info` lines.
    pub emit_pv: bool,
}

impl SearchState {
    pub fn new(tt_mb: usize) -> Self {
        Self {
            nodes: 0,
            qnodes: 0,
            tt_probes: 0,
            tt_hits: 0,
            cutoffs: 0,
            seldepth: 0,
            start_time: Instant::now(),
            stop: Arc::new(AtomicBool::new(false)),
            budget_ms: None,
            tt: TranspositionTable::new(tt_mb),
            root_best_move: None,
            use_quiescence: true,
            silent: false,
            emit_pv: true,
        }
    }

    /// Reset per-search state. The TT persists; its generation is bumped.
    pub fn reset(&mut self) {
        self.nodes = 0;
        self.qnodes = 0;
        self.tt_probes = 0;
        self.tt_hits = 0;
        self.cutoffs = 0;
        self.seldepth = 0;
        self.start_time = Instant::now();
        self.stop.store(false, Ordering::SeqCst);
        self.budget_ms = None;
        self.tt.new_search();
        self.root_best_move = None;
    }

    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    pub fn total_nodes(&self) -> u64 {
        self.nodes + self.qnodes
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn check_time(&self) {
        if let Some(budget) = self.budget_ms {
            if self.elapsed_ms() >= budget {
                self.stop.store(true, Ordering::Relaxed);
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

pub struct SearchResult {
    pub best_move: Option<ChessMove>,
    pub score: Score,
    /// Deepest fully completed iteration.
    pub depth: u8,
    pub nodes: u64,
}

/// Extract the principal variation by walking the hash-move chain from the
/// root, stopping at a miss, an illegal move, or a repeated position.
pub fn extract_pv(board: &Board, tt: &TranspositionTable, max_moves: usize) -> Vec<ChessMove> {
    let mut pv = Vec::new();
    let mut current = *board;
    let mut seen: Vec<u64> = Vec::new();

    for _ in 0..max_moves.min(MAX_PLY) {
        let key = current.get_hash();
        if seen.contains(&key) {
            break;
        }
        seen.push(key);

        let mv = match tt.probe(key).and_then(|entry| entry.best_move) {
            Some(mv) if current.legal(mv) => mv,
            _ => break,
        };
        pv.push(mv);
        current = current.make_move_new(mv);
    }

    pv
}

/// Format a score for UCI output (centipawns or mate-in-N moves).
pub fn format_score(score: Score) -> String {
    if is_mate_score(score) {
        let mate_ply = SCORE_MATE - score.abs();
        let mate_moves = (mate_ply + 1) / 2;
        if score > 0 {
            format!("score mate {}", mate_moves)
        } else {
            format!("score mate -{}", mate_moves)
        }
    } else {
        format!("score cp {}", score)
    }
}

/// Iterative deepening: search depth 1, 2, ... up to `max_depth`, committing
/// only fully completed iterations. Returns the best move found.
pub fn search(pos: &mut Position, state: &mut SearchState, max_depth: u8) -> SearchResult {
    let mut best_move: Option<ChessMove> = None;
    let mut best_score: Score = -SCORE_INFINITY;
    let mut depth_reached: u8 = 0;
    let root_key = pos.key();

    for depth in 1..=max_depth {
        state.root_best_move = None;
        let score = negamax(pos, state, depth, 0, -SCORE_INFINITY, SCORE_INFINITY);

        if state.is_stopped() {
            // Interrupted: keep the previous iteration's result. The partial
            // best is only used when no iteration ever completed.
            if best_move.is_none() {
                best_move = state.root_best_move;
            }
            break;
        }

        best_score = score;
        depth_reached = depth;
        if let Some(mv) = state.root_best_move {
            best_move = Some(mv);
        } else if let Some(entry) = state.tt.probe(root_key) {
            if entry.best_move.is_some() {
                best_move = entry.best_move;
            }
        }

        if !state.silent {
            let elapsed_ms = state.elapsed_ms().max(1);
            let nps = state.total_nodes() * 1000 / elapsed_ms;
            let pv = if state.emit_pv {
                extract_pv(pos.board(), &state.tt, depth as usize)
            } else {
                Vec::new()
            };
            let pv_str: String = pv
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "info depth {} seldepth {} {} nodes {} time {} nps {} pv {}",
                depth,
                state.seldepth.max(depth as usize),
                format_score(best_score),
                state.total_nodes(),
                elapsed_ms,
                nps,
                pv_str
            );
        }

        // Soft limit: a fresh iteration rarely finishes once half the
        // budget is gone.
        if let Some(budget) = state.budget_ms {
            if state.elapsed_ms() > budget / 2 {
                break;
            }
        }

        // Forced mate found: deeper iterations cannot improve it
        if is_mate_score(best_score) {
            break;
        }
    }

    // If no iteration completed, best_score still holds the -INF sentinel,
    // which would read back as a bogus mate score. Mirror the best_move
    // fallback and report a neutral score instead.
    let score = if depth_reached == 0 { 0 } else { best_score };

    SearchResult {
        best_move,
        score,
        depth: depth_reached,
        nodes: state.total_nodes(),
    }
}

/// Negamax with alpha-beta pruning over the window `[alpha, beta)`.
fn negamax(
    pos: &mut Position,
    state: &mut SearchState,
    depth: u8,
    ply: usize,
    mut alpha: Score,
    beta: Score,
) -> Score {
    debug_assert!(alpha < beta);

    state.nodes += 1;
    if state.total_nodes() % TIME_CHECK_INTERVAL == 0 {
        state.check_time();
    }
    if state.is_stopped() {
        return 0;
    }

    // Terminal tests are skipped at the root: the game is known to be live
    // there, and a draw claim would leave no move to return.
    if ply > 0 {
        if let Some(reason) = pos.terminal() {
            return match reason {
                Terminal::Checkmate => mated_in(ply),
                _ => 0,
            };
        }
    }

    if ply >= MAX_PLY {
        return evaluate(pos.board());
    }

    if depth == 0 {
        if state.use_quiescence {
            return quiescence(pos, state, ply, alpha, beta);
        }
        return evaluate(pos.board());
    }

    let key = pos.key();
    let mut hash_move: Option<ChessMove> = None;

    state.tt_probes += 1;
    if let Some(entry) = state.tt.probe(key) {
        state.tt_hits += 1;
        hash_move = entry.best_move;
        // Never cut at the root: the returned score carries no move
        if ply > 0 && entry.depth >= depth {
            if let Some(score) = TranspositionTable::usable_score(entry, ply, alpha, beta) {
                return score;
            }
        }
    }

    let moves = order_moves(pos.board(), hash_move);
    if moves.is_empty() {
        // The terminal test above should have caught this
        return if pos.in_check() { mated_in(ply) } else { 0 };
    }

    let alpha_orig = alpha;
    let mut best: Score = -SCORE_INFINITY;
    let mut best_move: Option<ChessMove> = None;

    for scored in &moves {
        pos.push(scored.mv);
        let score = -negamax(pos, state, depth - 1, ply + 1, -beta, -alpha);
        pos.pop();

        if state.is_stopped() {
            // Partial results are unsound as bounds: no TT store
            return best;
        }

        if score > best {
            best = score;
            best_move = Some(scored.mv);
            if ply == 0 {
                state.root_best_move = Some(scored.mv);
            }
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            state.cutoffs += 1;
            break;
        }
    }

    let bound = if best <= alpha_orig {
        Bound::Upper
    } else if best >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    };
    state.tt.store(key, depth, best, bound, best_move, ply);

    best
}

/// Captures-only extension of the search, with stand-pat. Keeps the
/// evaluation honest across capture sequences the fixed depth cannot see.
fn quiescence(
    pos: &mut Position,
    state: &mut SearchState,
    ply: usize,
    mut alpha: Score,
    beta: Score,
) -> Score {
    state.qnodes += 1;
    state.seldepth = state.seldepth.max(ply);
    if state.total_nodes() % TIME_CHECK_INTERVAL == 0 {
        state.check_time();
    }
    if state.is_stopped() {
        return 0;
    }

    if let Some(reason) = pos.terminal() {
        return match reason {
            Terminal::Checkmate => mated_in(ply),
            _ => 0,
        };
    }

    if ply >= MAX_PLY {
        return evaluate(pos.board());
    }

    let stand_pat = evaluate(pos.board());
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    // Delta pruning: even the largest capture cannot rescue this position
    if stand_pat + DELTA_MARGIN < alpha {
        return alpha;
    }

    let captures = order_captures(pos.board());
    for scored in &captures {
        pos.push(scored.mv);
        let score = -quiescence(pos, state, ply + 1, -beta, -alpha);
        pos.pop();

        if state.is_stopped() {
            return alpha;
        }
        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mate_in;
    use chess::MoveGen;

    fn test_state() -> SearchState {
        let mut state = SearchState::new(16);
        state.silent = true;
        state
    }

    /// Plain fixed-depth negamax without pruning or caching, used as the
    /// ground truth for the alpha-beta implementation.
    fn reference_minimax(pos: &mut Position, state: &mut SearchState, depth: u8, ply: usize) -> Score {
        if ply > 0 {
            if let Some(reason) = pos.terminal() {
                return match reason {
                    Terminal::Checkmate => mated_in(ply),
                    _ => 0,
                };
            }
        }
        if depth == 0 {
            return quiescence(pos, state, ply, -SCORE_INFINITY, SCORE_INFINITY);
        }
        let moves = order_moves(pos.board(), None);
        if moves.is_empty() {
            return if pos.in_check() { mated_in(ply) } else { 0 };
        }
        let mut best = -SCORE_INFINITY;
        for scored in &moves {
            pos.push(scored.mv);
            let score = -reference_minimax(pos, state, depth - 1, ply + 1);
            pos.pop();
            best = best.max(score);
        }
        best
    }

    #[test]
    fn test_search_finds_a_move() {
        let mut pos = Position::startpos();
        let mut state = test_state();
        let result = search(&mut pos, &mut state, 3);
        assert!(result.best_move.is_some());
        assert!(result.nodes > 0);
        assert_eq!(result.depth, 3);
    }

    #[test]
    fn test_back_rank_mate_in_one() {
        let mut pos =
            Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1").unwrap();
        let mut state = test_state();
        let result = search(&mut pos, &mut state, 3);
        assert_eq!(result.best_move.unwrap().to_string(), "e1e8");
        assert_eq!(result.score, mate_in(1));
    }

    #[test]
    fn test_fools_mate_response() {
        // 1. f3 e5 2. g4 — Black mates with Qh4
        let mut pos = Position::startpos();
        for m in ["f2f3", "e7e5", "g2g4"] {
            pos.apply_uci_move(m).unwrap();
        }
        let mut state = test_state();
        let result = search(&mut pos, &mut state, 3);
        assert_eq!(result.best_move.unwrap().to_string(), "d8h4");
        assert_eq!(result.score, mate_in(1));
    }

    #[test]
    fn test_scholars_mate() {
        let mut pos = Position::from_fen(
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
        )
        .unwrap();
        let mut state = test_state();
        let result = search(&mut pos, &mut state, 2);
        assert_eq!(result.best_move.unwrap().to_string(), "h5f7");
    }

    #[test]
    fn test_startpos_is_balanced() {
        let mut pos = Position::startpos();
        let mut state = test_state();
        let result = search(&mut pos, &mut state, 4);
        assert!(
            result.score.abs() <= 100,
            "startpos at depth 4 scored {}",
            result.score
        );
        let mv = result.best_move.unwrap().to_string();
        assert!(
            ["e2e4", "d2d4", "g1f3", "c2c4"].contains(&mv.as_str()),
            "unexpected opening move {}",
            mv
        );
    }

    #[test]
    fn test_checkmated_root_scores_mate() {
        // Side to move has no legal moves and is in check
        let mut pos = Position::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        let mut state = test_state();
        let score = negamax(&mut pos, &mut state, 1, 0, -SCORE_INFINITY, SCORE_INFINITY);
        assert_eq!(score, mated_in(0));
    }

    #[test]
    fn test_repetition_scores_zero() {
        let mut pos = Position::startpos();
        for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            pos.apply_uci_move(m).unwrap();
        }
        let mut state = test_state();
        let score = negamax(&mut pos, &mut state, 3, 1, -SCORE_INFINITY, SCORE_INFINITY);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_alpha_beta_matches_reference() {
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
            "4k3/8/8/3q4/8/8/3Q4/4K3 w - - 0 1",
        ];
        for fen in fens {
            for depth in [1u8, 2] {
                let mut pos = Position::from_fen(fen).unwrap();
                let mut state = test_state();
                let ab = negamax(&mut pos, &mut state, depth, 0, -SCORE_INFINITY, SCORE_INFINITY);

                let mut pos = Position::from_fen(fen).unwrap();
                let mut state = test_state();
                let reference = reference_minimax(&mut pos, &mut state, depth, 0);

                assert_eq!(ab, reference, "divergence at depth {} for {}", depth, fen);
            }
        }
    }

    #[test]
    fn test_quiescence_corrects_hanging_capture() {
        // The black queen on d5 is defended by the e6 pawn. A depth-1 search
        // without quiescence "wins" it; quiescence sees the recapture.
        let fen = "4k3/8/4p3/3q4/8/8/8/3QK3 w - - 0 1";

        let mut pos = Position::from_fen(fen).unwrap();
        let mut shallow = test_state();
        shallow.use_quiescence = false;
        let greedy = search(&mut pos, &mut shallow, 1);

        let mut pos = Position::from_fen(fen).unwrap();
        let mut quiet = test_state();
        let corrected = search(&mut pos, &mut quiet, 1);

        assert!(
            greedy.score - corrected.score >= 500,
            "quiescence correction too small: {} vs {}",
            greedy.score,
            corrected.score
        );
    }

    #[test]
    fn test_warm_tt_reduces_nodes() {
        let mut pos = Position::startpos();
        let mut state = test_state();

        search(&mut pos, &mut state, 4);
        let cold_nodes = state.total_nodes();

        state.reset();
        let mut pos = Position::startpos();
        let warm = search(&mut pos, &mut state, 4);
        let warm_nodes = state.total_nodes();

        assert!(
            warm_nodes < cold_nodes,
            "warm TT should cut nodes: {} vs {}",
            warm_nodes,
            cold_nodes
        );
        assert!(warm.best_move.is_some());
    }

    #[test]
    fn test_warm_tt_preserves_score() {
        let mut pos = Position::startpos();
        let mut state = test_state();
        let cold = search(&mut pos, &mut state, 4);

        state.reset();
        let mut pos = Position::startpos();
        let warm = search(&mut pos, &mut state, 4);

        assert_eq!(cold.score, warm.score);
    }

    #[test]
    fn test_stop_preserves_best_move() {
        let mut pos = Position::startpos();
        let mut state = test_state();
        state.budget_ms = Some(1);
        state.start_time = Instant::now();
        let result = search(&mut pos, &mut state, 20);
        assert!(result.best_move.is_some());
        let mv = result.best_move.unwrap();
        assert!(MoveGen::new_legal(pos.board()).any(|m| m == mv));
    }

    #[test]
    fn test_cancel_before_first_iteration_reports_sane_score() {
        let mut pos = Position::startpos();
        let mut state = test_state();
        // Stop already requested when the search starts: depth 1 is
        // cancelled on its very first node and never completes.
        state.stop.store(true, Ordering::SeqCst);
        let result = search(&mut pos, &mut state, 4);
        assert_eq!(result.depth, 0);
        assert_eq!(result.score, 0);
        assert!(!is_mate_score(result.score));
        assert_eq!(format_score(result.score), "score cp 0");
    }

    #[test]
    fn test_budget_is_respected() {
        let mut pos = Position::startpos();
        let mut state = test_state();
        state.budget_ms = Some(50);
        state.start_time = Instant::now();
        let started = Instant::now();
        search(&mut pos, &mut state, 30);
        assert!(
            started.elapsed().as_millis() < 700,
            "search overshot its budget"
        );
    }

    #[test]
    fn test_pv_extraction() {
        let mut pos = Position::startpos();
        let mut state = test_state();
        search(&mut pos, &mut state, 4);
        let pv = extract_pv(pos.board(), &state.tt, 4);
        assert!(!pv.is_empty());
        // PV moves must be playable in sequence
        let mut board = *pos.board();
        for mv in pv {
            assert!(board.legal(mv));
            board = board.make_move_new(mv);
        }
    }

    #[test]
    fn test_mate_score_format() {
        assert_eq!(format_score(mate_in(1)), "score mate 1");
        assert_eq!(format_score(mate_in(3)), "score mate 2");
        assert_eq!(format_score(mated_in(1)), "score mate -1");
        assert_eq!(format_score(mated_in(3)), "score mate -2");
        assert_eq!(format_score(100), "score cp 100");
        assert_eq!(format_score(-50), "score cp -50");
    }
}
