//! # Orchestration Engine
//!
//! Sequential step chaining with result threading.
//!
//! ## Core Components
//!
//! - **ChainOrchestrator**: assigns the run identity, announces the run and
//!   hands the ordered chain to a queue
//! - **TaskQueue**: seam to whatever executes the chain; `InProcessQueue`
//!   runs it on a tokio task
//! - **StepExecutor**: harness around one step invocation (state machine,
//!   notifications, failure conversion)
//! - **PipelineStep**: the pluggable body of a stage, driven through
//!   `StepExecution`

pub mod orchestrator;
pub mod queue;
pub mod step_executor;
pub mod step_handler;
pub mod types;

pub use orchestrator::ChainOrchestrator;
pub use queue::{ChainHandle, EnqueueError, InProcessQueue, TaskQueue};
pub use step_executor::StepExecutor;
pub use step_handler::{PipelineStep, StepExecution, StepOutput};
pub use types::{PipelineRun, StepContext, StepResult};
