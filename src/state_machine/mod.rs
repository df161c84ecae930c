// Step lifecycle state machine
//
// Tracks one step invocation from pickup to its terminal state. The
// awaiting-input state only exists while the input gate is blocking.

pub mod events;
pub mod states;
pub mod step_state_machine;

pub use events::StepEvent;
pub use states::StepState;
pub use step_state_machine::{StepStateError, StepStateMachine};
