//! EitherMove - a move that is one of two underlying move types.
//!
//! Selectors that mix move types (for example reassigns and swaps over the
//! same variable) need a single concrete type to hand to the phase. This enum
//! wraps the two alternatives and delegates every `Move` method.

use std::fmt::Debug;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

use super::Move;

/// A move drawn from one of two move types.
#[derive(Clone, Debug)]
pub enum EitherMove<A, B> {
    /// A move of the first type.
    Left(A),
    /// A move of the second type.
    Right(B),
}

impl<S, A, B> Move<S> for EitherMove<A, B>
where
    S: PlanningSolution,
    A: Move<S>,
    B: Move<S>,
{
    fn is_doable(&self, score_director: &dyn ScoreDirector<S>) -> bool {
        match self {
            EitherMove::Left(m) => m.is_doable(score_director),
            EitherMove::Right(m) => m.is_doable(score_director),
        }
    }

    fn do_move(&self, score_director: &mut dyn ScoreDirector<S>) {
        match self {
            EitherMove::Left(m) => m.do_move(score_director),
            EitherMove::Right(m) => m.do_move(score_director),
        }
    }

    fn entity_indices(&self) -> &[usize] {
        match self {
            EitherMove::Left(m) => m.entity_indices(),
            EitherMove::Right(m) => m.entity_indices(),
        }
    }

    fn variable_name(&self) -> &'static str {
        match self {
            EitherMove::Left(m) => m.variable_name(),
            EitherMove::Right(m) => m.variable_name(),
        }
    }
}
