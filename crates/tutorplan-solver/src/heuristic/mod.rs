//! Move system and variable registrations.

pub mod r#move;
pub mod selector;

mod descriptor;

pub use descriptor::VariableDescriptor;
