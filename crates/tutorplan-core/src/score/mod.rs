//! Score types for representing solution quality
//!
//! Scores are used to compare solutions and guide the optimization process.
//! All score types are immutable and implement arithmetic operations.

mod hard_soft;
mod traits;

pub use hard_soft::HardSoftScore;
pub use traits::Score;
