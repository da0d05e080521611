//! Core building blocks for the tutorplan timetabling engine.
//!
//! This crate defines the score arithmetic and the solution trait that the
//! scoring and solver crates build on. It carries no solver logic itself.

pub mod domain;
pub mod score;

pub use domain::PlanningSolution;
pub use score::{HardSoftScore, Score};
