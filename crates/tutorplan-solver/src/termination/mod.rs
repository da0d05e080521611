//! Termination conditions for solver phases.

mod composite;
mod step_count;
mod time;
mod unimproved;

use std::fmt::Debug;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

use crate::scope::SolverScope;

pub use composite::OrTermination;
pub use step_count::StepCountTermination;
pub use time::TimeTermination;
pub use unimproved::UnimprovedStepCountTermination;

/// Trait for determining when to stop solving.
///
/// # Type Parameters
/// * `S` - The planning solution type
/// * `D` - The score director type
pub trait Termination<S: PlanningSolution, D: ScoreDirector<S>>: Send + Debug {
    /// Returns true if solving should terminate.
    fn is_terminated(&self, solver_scope: &SolverScope<S, D>) -> bool;
}

/// A disabled termination slot: `None` never terminates.
///
/// Configuration wiring assembles an [`OrTermination`] from optional limits;
/// limits the user left out become `None` slots instead of boxed trait
/// objects.
impl<S, D, T> Termination<S, D> for Option<T>
where
    S: PlanningSolution,
    D: ScoreDirector<S>,
    T: Termination<S, D>,
{
    fn is_terminated(&self, solver_scope: &SolverScope<S, D>) -> bool {
        self.as_ref().is_some_and(|t| t.is_terminated(solver_scope))
    }
}

#[cfg(test)]
mod tests;
