//! Engine façade: owns the configuration, the persistent search state
//! (transposition table included) and the current game position.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chess::{ChessMove, MoveGen};

use crate::config::EngineConfig;
use crate::position::{Position, PositionError};
use crate::search::{self, SearchState};
use crate::time::{self, ClockReport};
use crate::types::{Score, MAX_PLY};

/// Statistics accumulated over one `choose_move` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub qnodes: u64,
    pub tt_probes: u64,
    pub tt_hits: u64,
    pub cutoffs: u64,
    pub depth_reached: u8,
    pub seldepth: usize,
    pub elapsed_ms: u64,
}

pub struct SearchReport {
    pub best_move: Option<ChessMove>,
    pub score: Score,
    pub stats: SearchStats,
}

pub struct Engine {
    pub config: EngineConfig,
    pub state: SearchState,
    position: Position,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut state = SearchState::new(config.search.tt_mb);
        state.use_quiescence = config.search.quiescence;
        state.emit_pv = config.logging.emit_pv;
        Self {
            config,
            state,
            position: Position::startpos(),
        }
    }

    /// Forget everything game-specific: clear the cache, reset the board.
    pub fn new_game(&mut self) {
        self.state.tt.clear();
        self.position = Position::startpos();
    }

    /// Replace the current position. An invalid FEN or an illegal move in
    /// the list aborts the whole update, leaving the old position in place.
    pub fn set_position(&mut self, fen: Option<&str>, moves: &[&str]) -> Result<(), PositionError> {
        let mut position = match fen {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::startpos(),
        };
        for mv in moves {
            position.apply_uci_move(mv)?;
        }
        self.position = position;
        Ok(())
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Flag shared with the search; setting it makes the in-flight search
    /// unwind and commit its best move so far.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.state.stop.clone()
    }

    pub fn stop(&self) {
        self.state.stop.store(true, Ordering::SeqCst);
    }

    /// Pick a move for the current position under the reported clock.
    pub fn choose_move(&mut self, clock: &ClockReport) -> SearchReport {
        self.state.reset();
        self.state.use_quiescence = self.config.search.quiescence;
        self.state.emit_pv = self.config.logging.emit_pv;
        self.state.budget_ms =
            time::budget_ms(clock, self.position.side_to_move(), self.config.search.time_ms);

        let max_depth = clock
            .fixed_depth
            .unwrap_or(self.config.search.max_depth)
            .clamp(1, MAX_PLY as u8);

        if self.config.logging.emit_depth_log {
            match self.state.budget_ms {
                Some(budget) => log::debug!("search budget {}ms, depth limit {}", budget, max_depth),
                None => log::debug!("depth-only search to depth {}", max_depth),
            }
        }

        let mut position = self.position.clone();
        let result = search::search(&mut position, &mut self.state, max_depth);

        // The adapter must always have a move to emit; fall back to the
        // first legal one if the search was cancelled before depth 1.
        let best_move = result
            .best_move
            .or_else(|| MoveGen::new_legal(self.position.board()).next());

        let stats = SearchStats {
            nodes: self.state.nodes,
            qnodes: self.state.qnodes,
            tt_probes: self.state.tt_probes,
            tt_hits: self.state.tt_hits,
            cutoffs: self.state.cutoffs,
            depth_reached: result.depth,
            seldepth: self.state.seldepth,
            elapsed_ms: self.state.elapsed_ms(),
        };

        if self.config.logging.emit_depth_log {
            log::debug!(
                "search done: depth {} in {}ms, {} nodes ({} quiescence), {} tt hits / {} probes",
                stats.depth_reached,
                stats.elapsed_ms,
                stats.nodes + stats.qnodes,
                stats.qnodes,
                stats.tt_hits,
                stats.tt_probes,
            );
        }

        SearchReport {
            best_move,
            score: result.score,
            stats,
        }
    }
}
