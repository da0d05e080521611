//! Move system for modifying planning solutions.
//!
//! Moves are the fundamental operations that modify planning variables during
//! solving. The solver explores the solution space by applying different moves
//! and evaluating their impact on the score.
//!
//! # Architecture
//!
//! All moves are fully typed with inline value storage:
//! - `ReassignMove<S, V>` - assigns a value to one entity's variable
//! - `SwapMove<S, V>` - exchanges a variable's values between two entities
//! - `EitherMove<A, B>` - a move drawn from one of two selectors
//!
//! Legality is domain membership only: a move may worsen the score and still
//! be doable; the acceptor decides its fate after rescoring. Undo is handled
//! by `RecordingScoreDirector`, not by moves returning undo data.

mod either;
mod reassign;
mod swap;

use std::fmt::Debug;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

pub use either::EitherMove;
pub use reassign::ReassignMove;
pub use swap::SwapMove;

/// A move that modifies one or more planning variables.
///
/// Moves execute against `&mut dyn ScoreDirector<S>` so the same move type
/// works against the real director and the recording wrapper used for
/// candidate evaluation.
///
/// # Implementation Notes
/// - Moves should be lightweight and cloneable
/// - `do_move` must fire `before_variable_changed`/`after_variable_changed`
///   around each mutation and register an undo closure
pub trait Move<S: PlanningSolution>: Send + Sync + Debug + Clone {
    /// Returns true if this move can be executed in the current state.
    ///
    /// A move is not doable when it would be a no-op (assigning the value
    /// already present, or swapping equal values).
    fn is_doable(&self, score_director: &dyn ScoreDirector<S>) -> bool;

    /// Executes this move against the score director.
    fn do_move(&self, score_director: &mut dyn ScoreDirector<S>);

    /// Returns the indices of the entities this move touches.
    fn entity_indices(&self) -> &[usize];

    /// Returns the name of the variable this move modifies.
    fn variable_name(&self) -> &'static str;
}
