use chess::ChessMove;

use crate::types::{score_from_tt, score_to_tt, Score};

/// What the stored score tells us about the true value of the subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// True minimax value of the subtree.
    Exact,
    /// Fail-high: true value >= stored score.
    Lower,
    /// Fail-low: true value <= stored score.
    Upper,
}

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub key: u64, // full Zobrist key, for collision detection
    pub depth: u8,
    pub score: Score,
    pub bound: Bound,
    pub best_move: Option<ChessMove>,
    pub generation: u8,
}

impl Default for TTEntry {
    fn default() -> Self {
        Self {
            key: 0,
            depth: 0,
            score: 0,
            bound: Bound::Exact,
            best_move: None,
            generation: 0,
        }
    }
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    mask: usize, // size - 1, for fast modulo
    generation: u8,
}

impl TranspositionTable {
    /// Create a table of the given size in megabytes, rounded down to a
    /// power of two entries.
    pub fn new(mb: usize) -> Self {
        let entry_size = std::mem::size_of::<TTEntry>();
        let num_entries = (mb * 1024 * 1024) / entry_size;
        let size = (num_entries.next_power_of_two() / 2).max(1024);

        Self {
            entries: vec![TTEntry::default(); size],
            mask: size - 1,
            generation: 0,
        }
    }

    /// Bump the generation counter. Called once per search so entries from
    /// earlier searches lose their replacement priority.
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Look up a position. Only an exact key match is ever returned;
    /// an index collision with a different key is a miss.
    pub fn probe(&self, key: u64) -> Option<&TTEntry> {
        let entry = &self.entries[key as usize & self.mask];
        if entry.key == key {
            Some(entry)
        } else {
            None
        }
    }

    /// Check whether a probed entry settles the node within `[alpha, beta]`,
    /// returning the ply-rebased score if it does. The caller is responsible
    /// for the `entry.depth >= depth` test.
    pub fn usable_score(entry: &TTEntry, ply: usize, alpha: Score, beta: Score) -> Option<Score> {
        let score = score_from_tt(entry.score, ply);
        match entry.bound {
            Bound::Exact => Some(score),
            Bound::Lower if score >= beta => Some(score),
            Bound::Upper if score <= alpha => Some(score),
            _ => None,
        }
    }

    /// Write an entry. Replacement is always-replace with a depth preference
    /// on same-key writes: replace if the slot is empty, holds a different
    /// position, holds a same-key entry of no greater depth, or is stale.
    pub fn store(
        &mut self,
        key: u64,
        depth: u8,
        score: Score,
        bound: Bound,
        best_move: Option<ChessMove>,
        ply: usize,
    ) {
        let idx = key as usize & self.mask;
        let existing = &self.entries[idx];

        let should_replace = existing.key == 0
            || existing.key != key
            || depth >= existing.depth
            || existing.generation != self.generation;

        if !should_replace {
            return;
        }

        self.entries[idx] = TTEntry {
            key,
            depth,
            score: score_to_tt(score, ply),
            bound,
            best_move,
            generation: self.generation,
        };
    }

    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = TTEntry::default();
        }
        self.generation = 0;
    }
}
