//! Compensating workflow steps for all-or-nothing multi-step operations.
//!
//! A saga runs its steps strictly in order, feeding each step's output into
//! the next step's input. Every successful forward action leaves behind a
//! compensation record holding the step's typed compensation data. If a
//! later step fails, or the execution is cancelled or runs past its
//! deadline, the recorded compensations are replayed last-completed-first.
//! A compensation failure never stops the unwind; it is collected and
//! reported so the caller knows which effects could not be undone.

mod adapters;
mod audit;
mod builder;
mod config;
mod erased;
mod error;
mod execution;
mod nested;
mod record;
mod saga;
mod step;
mod unwind;

pub use adapters::ContinueOnError;
pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use builder::SagaBuilder;
pub use config::SagaConfig;
pub use error::{CompensationError, ConfigurationError, SagaError, StepFailure, Trigger};
pub use execution::{ExecutionOptions, ExecutionState};
pub use nested::NestedSaga;
pub use record::CompensationStack;
pub use saga::Saga;
pub use step::{SagaStep, StepResponse};
pub use unwind::UnwindOutcome;
