//! Per-move time budgeting.
//!
//! Converts the clock state reported with `go` into a single millisecond
//! budget for the upcoming search. The budget is a soft target: iterative
//! deepening stops starting new iterations past half of it, and the in-node
//! clock check aborts an iteration that runs it out entirely.

use chess::Color;

/// Margin subtracted from an exact `movetime` so the reply leaves the
/// process before the arbiter's clock runs out.
const MOVE_OVERHEAD_MS: u64 = 50;

/// Never think for less than this, even in deep time trouble.
const MIN_BUDGET_MS: u64 = 10;

/// Assumed number of moves left when the time control does not say.
const DEFAULT_MOVES_TO_GO: u64 = 30;

/// Clock state parsed from a `go` command. Absent fields were not sent.
#[derive(Debug, Clone, Default)]
pub struct ClockReport {
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: Option<u64>,
    pub binc_ms: Option<u64>,
    pub movetime_ms: Option<u64>,
    pub movestogo: Option<u64>,
    pub infinite: bool,
    pub fixed_depth: Option<u8>,
}

/// Compute the budget for one move. `None` means unbounded (the search is
/// limited by depth instead).
pub fn budget_ms(clock: &ClockReport, side: Color, fallback_ms: u64) -> Option<u64> {
    if clock.infinite || clock.fixed_depth.is_some() {
        return None;
    }

    if let Some(movetime) = clock.movetime_ms {
        return Some(movetime.saturating_sub(MOVE_OVERHEAD_MS).max(1));
    }

    let (remaining, inc) = match side {
        Color::White => (clock.wtime_ms, clock.winc_ms.unwrap_or(0)),
        Color::Black => (clock.btime_ms, clock.binc_ms.unwrap_or(0)),
    };

    match remaining {
        Some(remaining) => {
            // Spread the remaining time over the moves still to come,
            // with a cushion of two extra moves when movestogo is known.
            let moves_left = clock.movestogo.map_or(DEFAULT_MOVES_TO_GO, |m| m + 2);
            let mut budget = remaining / moves_left.max(1) + inc;
            // Never sink more than half the clock into one move
            budget = budget.min(remaining / 2);
            Some(budget.max(MIN_BUDGET_MS))
        }
        None => Some(fallback_ms),
    }
}
