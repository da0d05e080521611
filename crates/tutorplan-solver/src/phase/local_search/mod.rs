//! Local search phase.
//!
//! Improves an initialized solution by sampling moves, evaluating each one
//! through incremental rescoring with recorded undo, and applying the move
//! the forager picks from those the acceptor let through.

mod acceptor;
mod forager;
mod phase;

pub use acceptor::{
    Acceptor, HillClimbingAcceptor, LateAcceptanceAcceptor, SimulatedAnnealingAcceptor,
};
pub use forager::{AcceptedCountForager, LocalSearchForager};
pub use phase::LocalSearchPhase;
