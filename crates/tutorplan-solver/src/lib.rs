//! Local-search solver for the tutorplan timetabling engine.
//!
//! The solver drives a planning solution through two phases:
//!
//! 1. **Construction**: every unassigned planning variable receives an
//!    initial value from its registered value range (first-fit or best-fit).
//! 2. **Local search**: candidate moves are sampled from the registered
//!    variables, evaluated through incremental rescoring with recorded undo,
//!    and accepted per a configurable acceptor until a termination fires.
//!
//! The best solution and score are tracked separately from the working state,
//! so the solver can be stopped at any step boundary and still hand back its
//! best-known result. Given a fixed random seed, a run is deterministic.
//!
//! For problems worth more than one start, [`parallel::multi_start`] launches
//! independent seeded runs and reduces to the best final score.

pub mod heuristic;
pub mod parallel;
pub mod phase;
pub mod scope;
pub mod solver;
pub mod termination;

pub use heuristic::r#move::{EitherMove, Move, ReassignMove, SwapMove};
pub use heuristic::selector::{
    MoveSelector, ReassignMoveSelector, SwapMoveSelector, UnionMoveSelector,
};
pub use heuristic::VariableDescriptor;
pub use phase::construction::{BestFitForager, ConstructionHeuristicPhase, FirstFitForager};
pub use phase::local_search::{
    AcceptedCountForager, Acceptor, HillClimbingAcceptor, LateAcceptanceAcceptor,
    LocalSearchPhase, SimulatedAnnealingAcceptor,
};
pub use phase::Phase;
pub use scope::SolverScope;
pub use solver::{NoTermination, Solver};
pub use termination::{
    OrTermination, StepCountTermination, Termination, TimeTermination,
    UnimprovedStepCountTermination,
};

#[cfg(test)]
pub(crate) mod test_utils;
