//! Incremental constraint scoring for the tutorplan timetabling engine.
//!
//! The scoring layer keeps a running score in sync with the working solution
//! through an explicit retract/insert protocol: every variable change goes
//! through a score director, which notifies each registered constraint before
//! and after the change and folds the resulting deltas into a cached total.
//! Score and state can never silently diverge.

pub mod constraint;
pub mod director;

pub use constraint::{ConstraintResult, ConstraintSet, IncrementalConstraint};
pub use director::{IncrementalScoreDirector, RecordingScoreDirector, ScoreDirector};
