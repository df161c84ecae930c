#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Interactive Pipeline
//!
//! Orchestration substrate for a multi-step data pipeline whose steps can
//! pause for a human decision and resume with it.
//!
//! ## Overview
//!
//! A run is a strict chain of steps. Each step receives the accumulated
//! result of every earlier step, may block on the input gate, reports its
//! local progress and returns what it adds. Status flows to observers over a
//! best-effort broadcast channel; a client that disconnects while a step is
//! waiting on it cancels that wait, and the step continues with a default.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Chain orchestrator, queue seam and step harness
//! - [`gate`] - Blocking request/await for human input
//! - [`progress`] - Pipeline-wide progress from step-local percentages
//! - [`session`] - Connected clients and cancellation on disconnect
//! - [`store`] - Expiring key-value store used by the gate and sessions
//! - [`events`] - Notification model, broadcast channel and sinks
//! - [`state_machine`] - Per-step lifecycle states
//! - [`workload`] - The four placeholder steps and their randomness source
//! - [`control`] - Inbound launch, submit-input and connection routing
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use interactive_pipeline::config::ConfigManager;
//! use interactive_pipeline::control::ControlSurface;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let surface = ControlSurface::bootstrap(ConfigManager::load()?);
//! let mut notifications = surface.subscribe();
//!
//! let run = surface.launch(Some(100)).await?;
//! while let Ok(notification) = notifications.recv().await {
//!     println!("{} [{}] {}", notification.task_name, notification.status, notification.result);
//! }
//! let final_result = run.wait().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod control;
pub mod error;
pub mod events;
pub mod gate;
pub mod logging;
pub mod orchestration;
pub mod progress;
pub mod session;
pub mod state_machine;
pub mod store;
pub mod workload;

pub use config::{ConfigManager, PipelineConfig};
pub use control::ControlSurface;
pub use error::{PipelineError, Result};
pub use events::{EventPublisher, Notification, NotificationStatus, Notifier};
pub use gate::{InputGate, InputOutcome, InputRequest, InputType, InputValue};
pub use orchestration::{ChainHandle, ChainOrchestrator, PipelineStep, StepOutput, StepResult};
pub use progress::{ProgressAggregator, ProgressSnapshot};
pub use session::{ClientSession, SessionManager};
pub use store::{InMemoryStore, KeyValueStore};
