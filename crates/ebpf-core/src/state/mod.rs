//! Machine state model primitives.

/// Register file types and storage model.
pub mod registers;
/// Run-state machine.
pub mod run_state;

pub use registers::{Register, RegisterFile, REGISTER_COUNT};
pub use run_state::RunState;
