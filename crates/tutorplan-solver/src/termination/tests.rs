//! Integration tests for termination conditions.

use super::*;
use crate::scope::SolverScope;
use crate::test_utils::{toy_director, ToyDirector};
use std::time::Duration;

fn scope() -> SolverScope<crate::test_utils::ToySolution, ToyDirector> {
    SolverScope::with_seed(toy_director(vec![Some(0), Some(1)]), 0)
}

#[test]
fn test_step_count_termination() {
    let mut scope = scope();
    let term = StepCountTermination::new(3);

    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    scope.increment_step_count();
    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    assert!(term.is_terminated(&scope));
}

#[test]
fn test_time_termination() {
    let mut scope = scope();
    let term = TimeTermination::new(Duration::ZERO);

    // Clock not started yet: elapsed is None, so no termination.
    assert!(!term.is_terminated(&scope));

    scope.start_solving();
    assert!(term.is_terminated(&scope));

    let generous = TimeTermination::seconds(3600);
    assert!(!generous.is_terminated(&scope));
}

#[test]
fn test_unimproved_step_count_termination() {
    let mut scope = scope();
    scope.update_best_solution();
    let term = UnimprovedStepCountTermination::new(3);

    assert!(!term.is_terminated(&scope));

    // Three steps with a flat best score trip the limit.
    scope.increment_step_count();
    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    assert!(term.is_terminated(&scope));
}

#[test]
fn test_unimproved_resets_on_improvement() {
    // Start from a duplicate pair so a strict improvement is possible.
    let mut scope = SolverScope::with_seed(toy_director(vec![Some(0), Some(0)]), 0);
    scope.update_best_solution();
    let term = UnimprovedStepCountTermination::new(2);

    scope.increment_step_count();
    assert!(!term.is_terminated(&scope));

    // An improvement resets the counter.
    scope.working_solution_mut().slots[1] = Some(2);
    scope.score_director_mut().reset();
    scope.update_best_solution();
    scope.increment_step_count();
    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    assert!(term.is_terminated(&scope));
}

#[test]
fn test_or_termination() {
    let mut scope = scope();
    let term = OrTermination((
        StepCountTermination::new(2),
        TimeTermination::seconds(3600),
    ));

    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    scope.increment_step_count();
    assert!(term.is_terminated(&scope));
}

#[test]
fn test_option_termination_slots() {
    let mut scope = scope();
    let term = OrTermination((
        None::<TimeTermination>,
        Some(StepCountTermination::new(1)),
    ));

    assert!(!term.is_terminated(&scope));
    scope.increment_step_count();
    assert!(term.is_terminated(&scope));

    let never = OrTermination((None::<TimeTermination>, None::<StepCountTermination>));
    assert!(!never.is_terminated(&scope));
}
