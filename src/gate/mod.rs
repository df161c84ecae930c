pub mod input;
pub mod input_gate;

pub use input::{default_value, default_value_with, InputRequest, InputType, InputValue, NumberRange};
pub use input_gate::{InputGate, InputOutcome};
