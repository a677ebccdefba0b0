use std::error::Error as StdError;
use std::fmt::{self, Debug};
use std::time::Duration;

use thiserror::Error;

use crate::execution::ExecutionState;

/// A saga that cannot be run as built. Raised before any step executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("step name '{step}' is used more than once in the saga")]
    DuplicateStepName { step: String },

    #[error("step '{step}' has no compensating action but the saga requires one for every step")]
    MissingCompensation { step: String },
}

/// Error from a failed compensation operation.
#[derive(Debug, thiserror::Error)]
#[error("compensation failed for step '{step}': {description}")]
pub struct CompensationError<E> {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The underlying error.
    #[source]
    pub error: E,
}

/// What stopped a saga and started its unwind.
#[derive(Debug)]
#[non_exhaustive]
pub enum Trigger<E> {
    /// A forward action failed.
    Step { step: String, source: E },

    /// The caller cancelled the execution.
    Cancelled { completed_steps: usize },

    /// The execution ran past its deadline.
    TimedOut {
        limit: Duration,
        completed_steps: usize,
    },

    /// A nested saga failed and unwound itself; `cause` is what stopped it.
    Nested {
        step: String,
        cause: Box<Trigger<E>>,
    },

    /// A nested saga is being unwound because its enclosing saga failed.
    EnclosingUnwind,
}

impl<E> Trigger<E> {
    /// Name of the failed step, when a step failure triggered the unwind.
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::Step { step, .. } | Self::Nested { step, .. } => Some(step),
            _ => None,
        }
    }
}

impl<E> fmt::Display for Trigger<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step { step, .. } => write!(f, "step '{step}' failed"),
            Self::Cancelled { completed_steps } => {
                write!(f, "execution cancelled after {completed_steps} completed step(s)")
            }
            Self::TimedOut {
                limit,
                completed_steps,
            } => write!(
                f,
                "execution exceeded its {limit:?} deadline after {completed_steps} completed step(s)"
            ),
            Self::Nested { step, .. } => write!(f, "nested saga '{step}' failed"),
            Self::EnclosingUnwind => f.write_str("enclosing saga is unwinding"),
        }
    }
}

impl<E: StdError + 'static> StdError for Trigger<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Step { source, .. } => Some(source),
            Self::Nested { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// How a step's forward action failed, as seen by the executor.
#[derive(Debug)]
#[non_exhaustive]
pub enum StepFailure<E> {
    /// The step itself returned an error and left nothing behind.
    Error(E),

    /// The step ran a nested saga that failed and unwound itself.
    ///
    /// `compensation_errors` holds the nested compensations that failed;
    /// their effects are still in place and belong to the enclosing
    /// saga's outcome.
    Nested {
        trigger: Trigger<E>,
        compensation_errors: Vec<CompensationError<E>>,
    },
}

/// Error from saga execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E: Debug> {
    /// The saga was rejected before running.
    #[error("invalid saga configuration")]
    Configuration(#[from] ConfigurationError),

    /// The saga failed and every completed step was compensated.
    #[error("{trigger}; all completed steps were compensated")]
    RolledBack {
        /// What started the unwind.
        #[source]
        trigger: Trigger<E>,
    },

    /// The saga failed and some compensations also failed.
    #[error("{trigger}; {} compensation(s) also failed", compensation_errors.len())]
    CompensationFailed {
        /// What started the unwind.
        #[source]
        trigger: Trigger<E>,
        /// Errors from failed compensations, in unwind order.
        compensation_errors: Vec<CompensationError<E>>,
    },
}

impl<E: Debug> SagaError<E> {
    /// The failure that started the unwind.
    #[must_use]
    pub fn trigger(&self) -> Option<&Trigger<E>> {
        match self {
            Self::RolledBack { trigger } | Self::CompensationFailed { trigger, .. } => {
                Some(trigger)
            }
            Self::Configuration(_) => None,
        }
    }

    /// Whether every effect of the failed execution was reversed.
    ///
    /// A configuration error never ran anything, so it counts as clean.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::CompensationFailed { .. })
    }

    /// Steps whose effects are still in place after the unwind.
    #[must_use]
    pub fn unrecoverable_steps(&self) -> Vec<&str> {
        match self {
            Self::CompensationFailed {
                compensation_errors,
                ..
            } => compensation_errors.iter().map(|e| e.step.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Terminal state of the execution, if one ran.
    #[must_use]
    pub fn terminal_state(&self) -> Option<ExecutionState> {
        match self {
            Self::Configuration(_) => None,
            Self::RolledBack { .. } => Some(ExecutionState::FailedClean),
            Self::CompensationFailed { .. } => Some(ExecutionState::FailedDirty),
        }
    }
}
