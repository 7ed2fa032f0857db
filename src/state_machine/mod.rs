// State machine module for the operation lifecycle.
//
// Pure validation logic with no I/O. Store implementations enforce these
// rules at the persistence boundary; runners rely on the typed errors to
// distinguish benign finalize races from corruption.

pub mod states;
pub mod transition;

pub use states::{OperationState, WriteAheadState};
pub use transition::{transition, validate_transition};
