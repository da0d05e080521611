//! Foragers for local search move selection.
//!
//! Foragers collect the moves the acceptor let through during a step and
//! pick the one to actually apply.

use std::fmt::Debug;

use tutorplan_core::domain::PlanningSolution;

use crate::heuristic::r#move::Move;

/// Trait for collecting and selecting moves in local search.
///
/// Foragers are responsible for:
/// - Collecting accepted moves during move evaluation
/// - Deciding when to quit evaluating early
/// - Selecting the move to apply
pub trait LocalSearchForager<S, M>: Send + Debug
where
    S: PlanningSolution,
    M: Move<S>,
{
    /// Called at the start of each step to reset state.
    fn step_started(&mut self);

    /// Adds an accepted move to the forager.
    fn add_move(&mut self, m: M, score: S::Score);

    /// Returns true if the forager has collected enough moves and
    /// wants to stop evaluating more.
    fn is_quit_early(&self) -> bool;

    /// Picks the best move from those collected.
    ///
    /// Returns None if no moves were accepted.
    fn pick_move(&mut self) -> Option<(M, S::Score)>;
}

/// A forager that collects a limited number of accepted moves.
///
/// Once the limit is reached, it quits early. It picks the best move among
/// those collected; ties keep the move that was collected first, which keeps
/// steps deterministic.
pub struct AcceptedCountForager<S: PlanningSolution, M> {
    accepted_count_limit: usize,
    accepted_moves: Vec<(M, S::Score)>,
}

impl<S: PlanningSolution, M> AcceptedCountForager<S, M> {
    /// Creates a new forager with the given limit.
    ///
    /// # Arguments
    /// * `accepted_count_limit` - Stop after collecting this many accepted moves
    pub fn new(accepted_count_limit: usize) -> Self {
        Self {
            accepted_count_limit,
            accepted_moves: Vec::new(),
        }
    }
}

impl<S: PlanningSolution, M> Debug for AcceptedCountForager<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptedCountForager")
            .field("accepted_count_limit", &self.accepted_count_limit)
            .field("accepted_count", &self.accepted_moves.len())
            .finish()
    }
}

impl<S, M> LocalSearchForager<S, M> for AcceptedCountForager<S, M>
where
    S: PlanningSolution,
    M: Move<S>,
{
    fn step_started(&mut self) {
        self.accepted_moves.clear();
    }

    fn add_move(&mut self, m: M, score: S::Score) {
        self.accepted_moves.push((m, score));
    }

    fn is_quit_early(&self) -> bool {
        self.accepted_moves.len() >= self.accepted_count_limit
    }

    fn pick_move(&mut self) -> Option<(M, S::Score)> {
        if self.accepted_moves.is_empty() {
            return None;
        }

        let mut best_index = 0;
        let mut best_score = &self.accepted_moves[0].1;

        for (i, (_, score)) in self.accepted_moves.iter().enumerate().skip(1) {
            if score > best_score {
                best_index = i;
                best_score = score;
            }
        }

        Some(self.accepted_moves.swap_remove(best_index))
    }
}
