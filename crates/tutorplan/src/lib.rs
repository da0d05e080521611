//! School timetabling: students into tutor-led classrooms.
//!
//! The library side of the `tutorplan` binary. [`solve`] runs the whole
//! pipeline over a [`Timetable`]; the submodules expose the pieces (CSV
//! loading, the constraint catalogue, console reports, delimited export)
//! on their own.

pub mod constraints;
pub mod demo_data;
pub mod domain;
pub mod loader;
pub mod output;
pub mod report;
pub mod solver;

pub use demo_data::DemoData;
pub use domain::{
    default_timeslots, Assignment, Cohort, Level, Platform, Student, Timeslot, Timetable, Tutor,
};
pub use loader::{load_problem, LoadError};
pub use solver::{solve, solve_with_cancel, SolveError};
