//! Solver-level scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

/// Top-level scope for the entire solving process.
///
/// Owns the score director, the best-so-far snapshot, the seeded RNG and the
/// cooperative cancellation flag. Phases borrow the scope for the duration of
/// their run; the solver consumes it at the end.
///
/// Generic over `D: ScoreDirector<S>` for zero type erasure.
pub struct SolverScope<S: PlanningSolution, D: ScoreDirector<S>> {
    score_director: D,
    best_solution: Option<S>,
    best_score: Option<S::Score>,
    rng: StdRng,
    start_time: Option<Instant>,
    total_step_count: u64,
    total_move_count: u64,
    terminate_early_flag: Option<Arc<AtomicBool>>,
}

impl<S: PlanningSolution, D: ScoreDirector<S>> SolverScope<S, D> {
    pub fn new(score_director: D) -> Self {
        Self {
            score_director,
            best_solution: None,
            best_score: None,
            rng: StdRng::from_os_rng(),
            start_time: None,
            total_step_count: 0,
            total_move_count: 0,
            terminate_early_flag: None,
        }
    }

    pub fn with_seed(score_director: D, seed: u64) -> Self {
        Self {
            score_director,
            best_solution: None,
            best_score: None,
            rng: StdRng::seed_from_u64(seed),
            start_time: None,
            total_step_count: 0,
            total_move_count: 0,
            terminate_early_flag: None,
        }
    }

    pub fn start_solving(&mut self) {
        self.start_time = Some(Instant::now());
        self.total_step_count = 0;
        self.total_move_count = 0;
    }

    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.start_time.map(|t| t.elapsed())
    }

    pub fn score_director(&self) -> &D {
        &self.score_director
    }

    pub fn score_director_mut(&mut self) -> &mut D {
        &mut self.score_director
    }

    /// Splits the scope into the director and the RNG.
    ///
    /// Sampling phases need both at once: the RNG drives move selection while
    /// the director evaluates the sampled move. A single `&mut self` accessor
    /// for each would fall foul of the borrow checker.
    pub fn director_and_rng(&mut self) -> (&mut D, &mut StdRng) {
        (&mut self.score_director, &mut self.rng)
    }

    pub fn working_solution(&self) -> &S {
        self.score_director.working_solution()
    }

    pub fn working_solution_mut(&mut self) -> &mut S {
        self.score_director.working_solution_mut()
    }

    pub fn calculate_score(&mut self) -> S::Score {
        self.score_director.calculate_score()
    }

    pub fn best_solution(&self) -> Option<&S> {
        self.best_solution.as_ref()
    }

    pub fn best_score(&self) -> Option<&S::Score> {
        self.best_score.as_ref()
    }

    /// Snapshots the working solution as the new best if it strictly
    /// improves on the current best.
    pub fn update_best_solution(&mut self) {
        let current_score = self.score_director.calculate_score();
        let is_better = match &self.best_score {
            None => true,
            Some(best) => current_score > *best,
        };

        if is_better {
            self.best_solution = Some(self.score_director.clone_working_solution());
            self.best_score = Some(current_score);
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn increment_step_count(&mut self) -> u64 {
        self.total_step_count += 1;
        self.total_step_count
    }

    pub fn total_step_count(&self) -> u64 {
        self.total_step_count
    }

    pub fn add_move_count(&mut self, evaluated: u64) {
        self.total_move_count += evaluated;
    }

    pub fn total_move_count(&self) -> u64 {
        self.total_move_count
    }

    pub fn take_best_solution(self) -> Option<S> {
        self.best_solution
    }

    /// Consumes the scope, returning the best snapshot or, before any best
    /// exists, a clone of the working solution.
    pub fn take_best_or_working_solution(self) -> S {
        self.best_solution
            .unwrap_or_else(|| self.score_director.clone_working_solution())
    }

    pub fn set_terminate_early_flag(&mut self, flag: Arc<AtomicBool>) {
        self.terminate_early_flag = Some(flag);
    }

    pub fn is_terminate_early(&self) -> bool {
        self.terminate_early_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::toy_director;
    use tutorplan_core::score::HardSoftScore;

    #[test]
    fn test_update_best_requires_strict_improvement() {
        let director = toy_director(vec![Some(1), Some(1)]);
        let mut scope = SolverScope::with_seed(director, 0);

        scope.update_best_solution();
        assert_eq!(scope.best_score(), Some(&HardSoftScore::of_soft(-1)));

        // Same score again: the snapshot must not be replaced.
        let snapshot_before = scope.best_solution().unwrap().slots.clone();
        scope.update_best_solution();
        assert_eq!(scope.best_solution().unwrap().slots, snapshot_before);

        // Strictly better score: the snapshot moves.
        scope.working_solution_mut().slots[1] = Some(2);
        scope.score_director_mut().reset();
        scope.update_best_solution();
        assert_eq!(scope.best_score(), Some(&HardSoftScore::ZERO));
    }

    #[test]
    fn test_terminate_early_flag() {
        let director = toy_director(vec![Some(1)]);
        let mut scope = SolverScope::with_seed(director, 0);
        assert!(!scope.is_terminate_early());

        let flag = Arc::new(AtomicBool::new(false));
        scope.set_terminate_early_flag(Arc::clone(&flag));
        assert!(!scope.is_terminate_early());

        flag.store(true, Ordering::SeqCst);
        assert!(scope.is_terminate_early());
    }

    #[test]
    fn test_take_best_or_working_falls_back() {
        let director = toy_director(vec![Some(3), Some(4)]);
        let scope = SolverScope::with_seed(director, 0);
        let solution = scope.take_best_or_working_solution();
        assert_eq!(solution.slots, vec![Some(3), Some(4)]);
    }
}
