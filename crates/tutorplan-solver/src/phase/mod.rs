//! Solver phases.
//!
//! Phases are the main building blocks of solving:
//! - ConstructionHeuristicPhase: assigns every open variable an initial value
//! - LocalSearchPhase: improves an initialized solution step by step

pub mod construction;
pub mod local_search;

use std::fmt::Debug;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

use crate::scope::SolverScope;

/// A phase of the solving process.
///
/// Phases are executed in sequence by the solver. Each phase has its own
/// strategy for constructing or improving the working solution.
///
/// # Type Parameters
/// * `S` - The planning solution type
/// * `D` - The score director type
pub trait Phase<S: PlanningSolution, D: ScoreDirector<S>>: Send + Debug {
    /// Executes this phase.
    ///
    /// The phase modifies the working solution in the solver scope and
    /// updates the best solution when improvements are found.
    fn solve(&mut self, solver_scope: &mut SolverScope<S, D>);

    /// Returns the name of this phase type.
    fn phase_type_name(&self) -> &'static str;
}
