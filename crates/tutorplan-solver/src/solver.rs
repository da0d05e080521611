//! Solver implementation.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

use crate::phase::Phase;
use crate::scope::SolverScope;
use crate::termination::Termination;

/// The main solver that optimizes planning solutions.
///
/// Uses macro-generated tuple implementations for phases, preserving
/// concrete types through the entire pipeline (zero-erasure architecture).
///
/// The first phase in the tuple always runs to completion, so the returned
/// solution is initialized even under a zero time budget or an immediate
/// cancellation. The solver-level termination and the early-termination flag
/// are consulted before every later phase; phases also check them at their
/// own step boundaries.
///
/// # Type Parameters
/// * `P` - Tuple of phases to execute
/// * `T` - Termination condition (use `Option<ConcreteTermination>`)
/// * `S` - Solution type
/// * `D` - Score director type
///
/// # Example
///
/// ```
/// use tutorplan_solver::solver::{Solver, NoTermination};
/// use tutorplan_solver::termination::TimeTermination;
/// use tutorplan_solver::phase::Phase;
/// use tutorplan_solver::scope::SolverScope;
/// use tutorplan_core::domain::PlanningSolution;
/// use tutorplan_core::score::HardSoftScore;
/// use tutorplan_scoring::{IncrementalScoreDirector, ScoreDirector};
///
/// #[derive(Clone, Debug)]
/// struct MySolution { score: Option<HardSoftScore> }
///
/// impl PlanningSolution for MySolution {
///     type Score = HardSoftScore;
///     fn score(&self) -> Option<Self::Score> { self.score }
///     fn set_score(&mut self, score: Option<Self::Score>) { self.score = score; }
/// }
///
/// #[derive(Debug)]
/// struct NoOpPhase;
///
/// impl<S: PlanningSolution, D: ScoreDirector<S>> Phase<S, D> for NoOpPhase {
///     fn solve(&mut self, _: &mut SolverScope<S, D>) {}
///     fn phase_type_name(&self) -> &'static str { "NoOp" }
/// }
///
/// type MyDirector = IncrementalScoreDirector<MySolution, ()>;
///
/// // Create solver with phases and termination
/// let solver: Solver<(NoOpPhase,), Option<TimeTermination>, MySolution, MyDirector> =
///     Solver::new((NoOpPhase,)).with_termination(TimeTermination::seconds(30));
/// ```
pub struct Solver<P, T, S, D> {
    phases: P,
    termination: T,
    terminate_early_flag: Arc<AtomicBool>,
    solving: Arc<AtomicBool>,
    _phantom: PhantomData<fn(S, D)>,
}

impl<P: Debug, T: Debug, S, D> Debug for Solver<P, T, S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("phases", &self.phases)
            .field("termination", &self.termination)
            .finish()
    }
}

impl<P, S, D> Solver<P, NoTermination, S, D>
where
    S: PlanningSolution,
{
    /// Creates a new solver with the given phases tuple and no termination.
    pub fn new(phases: P) -> Self {
        Solver {
            phases,
            termination: NoTermination,
            terminate_early_flag: Arc::new(AtomicBool::new(false)),
            solving: Arc::new(AtomicBool::new(false)),
            _phantom: PhantomData,
        }
    }

    /// Sets the termination condition.
    pub fn with_termination<T>(self, termination: T) -> Solver<P, Option<T>, S, D> {
        Solver {
            phases: self.phases,
            termination: Some(termination),
            terminate_early_flag: self.terminate_early_flag,
            solving: self.solving,
            _phantom: PhantomData,
        }
    }
}

impl<P, T, S, D> Solver<P, T, S, D>
where
    S: PlanningSolution,
{
    /// Requests early termination of the solving process.
    ///
    /// This method is thread-safe and can be called from another thread.
    pub fn terminate_early(&self) -> bool {
        if self.solving.load(Ordering::SeqCst) {
            self.terminate_early_flag.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Returns a handle that can request early termination from another
    /// thread, even after the solver has been moved into a closure.
    ///
    /// The flag is sticky: it stays raised across solves until cleared
    /// through this handle.
    pub fn terminate_early_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminate_early_flag)
    }

    /// Replaces the early-termination flag with a shared one, so a group of
    /// solvers can be cancelled together.
    pub fn with_shared_terminate_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.terminate_early_flag = flag;
        self
    }

    /// Returns true if the solver is currently solving.
    pub fn is_solving(&self) -> bool {
        self.solving.load(Ordering::SeqCst)
    }
}

/// Marker type indicating no termination.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTermination;

/// Marker trait for termination types that can be used in Solver.
pub trait MaybeTermination<S: PlanningSolution, D: ScoreDirector<S>>: Send {
    /// Checks if the solver should terminate.
    fn should_terminate(&self, solver_scope: &SolverScope<S, D>) -> bool;
}

impl<S: PlanningSolution, D: ScoreDirector<S>, T: Termination<S, D>> MaybeTermination<S, D>
    for Option<T>
{
    fn should_terminate(&self, solver_scope: &SolverScope<S, D>) -> bool {
        match self {
            Some(t) => t.is_terminated(solver_scope),
            None => false,
        }
    }
}

impl<S: PlanningSolution, D: ScoreDirector<S>> MaybeTermination<S, D> for NoTermination {
    fn should_terminate(&self, _solver_scope: &SolverScope<S, D>) -> bool {
        false
    }
}

impl<S: PlanningSolution, D: ScoreDirector<S>> Termination<S, D> for NoTermination {
    fn is_terminated(&self, _solver_scope: &SolverScope<S, D>) -> bool {
        false
    }
}

macro_rules! impl_solver {
    ($first_idx:tt: $FirstP:ident $(, $idx:tt: $P:ident)*) => {
        impl<S, D, T, $FirstP $(, $P)*> Solver<($FirstP, $($P,)*), T, S, D>
        where
            S: PlanningSolution,
            D: ScoreDirector<S>,
            T: MaybeTermination<S, D>,
            $FirstP: Phase<S, D>,
            $($P: Phase<S, D>,)*
        {
            /// Solves using the provided score director and a random seed
            /// drawn from the operating system.
            pub fn solve(&mut self, score_director: D) -> S {
                let solver_scope = SolverScope::new(score_director);
                self.solve_scope(solver_scope)
            }

            /// Solves using the provided score director and a fixed seed.
            ///
            /// Two runs over equal input with the same seed walk the same
            /// step sequence and return the same solution.
            pub fn solve_seeded(&mut self, score_director: D, seed: u64) -> S {
                let solver_scope = SolverScope::with_seed(score_director, seed);
                self.solve_scope(solver_scope)
            }

            fn solve_scope(&mut self, mut solver_scope: SolverScope<S, D>) -> S {
                self.solving.store(true, Ordering::SeqCst);
                solver_scope.set_terminate_early_flag(self.terminate_early_flag.clone());
                solver_scope.start_solving();

                // The first phase is exempt from the solver-level checks so
                // an unassigned solution always leaves construction whole.
                tracing::debug!(
                    "Starting phase {} ({})",
                    $first_idx,
                    self.phases.$first_idx.phase_type_name()
                );
                self.phases.$first_idx.solve(&mut solver_scope);
                tracing::debug!(
                    "Finished phase {} ({}) with score {:?}",
                    $first_idx,
                    self.phases.$first_idx.phase_type_name(),
                    solver_scope.best_score()
                );

                $(
                    if !self.check_termination(&solver_scope) {
                        tracing::debug!(
                            "Starting phase {} ({})",
                            $idx,
                            self.phases.$idx.phase_type_name()
                        );
                        self.phases.$idx.solve(&mut solver_scope);
                        tracing::debug!(
                            "Finished phase {} ({}) with score {:?}",
                            $idx,
                            self.phases.$idx.phase_type_name(),
                            solver_scope.best_score()
                        );
                    }
                )*

                self.solving.store(false, Ordering::SeqCst);
                solver_scope.take_best_or_working_solution()
            }

            #[allow(dead_code)]
            fn check_termination(&self, solver_scope: &SolverScope<S, D>) -> bool {
                if self.terminate_early_flag.load(Ordering::SeqCst) {
                    return true;
                }
                self.termination.should_terminate(solver_scope)
            }
        }
    };
}

impl_solver!(0: P0);
impl_solver!(0: P0, 1: P1);
impl_solver!(0: P0, 1: P1, 2: P2);
impl_solver!(0: P0, 1: P1, 2: P2, 3: P3);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::r#move::ReassignMove;
    use crate::heuristic::selector::{
        ReassignMoveSelector, SwapMoveSelector, UnionMoveSelector,
    };
    use crate::phase::construction::{BestFitForager, ConstructionHeuristicPhase, FirstFitForager};
    use crate::phase::local_search::{
        AcceptedCountForager, HillClimbingAcceptor, LocalSearchPhase,
    };
    use crate::termination::StepCountTermination;
    use crate::test_utils::{toy_descriptor, toy_director, toy_entity_count, ToySolution};
    use tutorplan_core::score::HardSoftScore;

    fn two_phase_solver_result(seed: u64) -> ToySolution {
        let construction = ConstructionHeuristicPhase::new(
            toy_descriptor(),
            toy_entity_count,
            BestFitForager::new(),
        );
        let selector = UnionMoveSelector::new(
            ReassignMoveSelector::new(toy_descriptor(), toy_entity_count),
            SwapMoveSelector::new(toy_descriptor(), toy_entity_count),
        );
        let local_search = LocalSearchPhase::new(
            selector,
            HillClimbingAcceptor::new(),
            AcceptedCountForager::new(4),
            StepCountTermination::new(300),
        );

        let mut solver = Solver::new((construction, local_search));
        solver.solve_seeded(toy_director(vec![None; 6]), seed)
    }

    #[test]
    fn test_two_phase_solve_reaches_zero() {
        let solution = two_phase_solver_result(42);

        assert!(solution.slots.iter().all(Option::is_some));
        assert_eq!(solution.score, Some(HardSoftScore::ZERO));
    }

    #[test]
    fn test_solve_is_deterministic_per_seed() {
        assert_eq!(two_phase_solver_result(7).slots, two_phase_solver_result(7).slots);
    }

    #[test]
    fn test_zero_step_budget_still_initializes() {
        let construction = ConstructionHeuristicPhase::new(
            toy_descriptor(),
            toy_entity_count,
            FirstFitForager::new(),
        );
        let local_search = LocalSearchPhase::new(
            ReassignMoveSelector::new(toy_descriptor(), toy_entity_count),
            HillClimbingAcceptor::new(),
            AcceptedCountForager::new(1),
            StepCountTermination::new(1_000),
        );

        let mut solver = Solver::new((construction, local_search))
            .with_termination(StepCountTermination::new(0));
        let solution = solver.solve_seeded(toy_director(vec![None; 3]), 0);

        // The solver-level budget was exhausted before local search, but
        // construction still completed.
        assert!(solution.slots.iter().all(Option::is_some));
    }

    #[test]
    fn test_terminate_early_requires_active_solve() {
        let construction = ConstructionHeuristicPhase::new(
            toy_descriptor(),
            toy_entity_count,
            FirstFitForager::<ToySolution, ReassignMove<ToySolution, i32>>::new(),
        );
        let solver: Solver<_, NoTermination, ToySolution, crate::test_utils::ToyDirector> =
            Solver::new((construction,));

        assert!(!solver.is_solving());
        assert!(!solver.terminate_early());
    }
}
