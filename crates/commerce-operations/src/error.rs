use std::path::PathBuf;
use std::time::Duration;

use commerce_core::{DataAccessError, RecordId};
use commerce_saga::{ConfigurationError, SagaError, Trigger};
use thiserror::Error;

/// Details about a failed compensation during workflow rollback.
#[derive(Debug)]
pub struct CompensationFailure {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The error that occurred during compensation.
    pub error: Box<OperationError>,
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error("invalid workflow configuration")]
    Configuration(#[from] ConfigurationError),

    #[error("quote '{0}' not found")]
    QuoteNotFound(RecordId),

    #[error("quote '{id}' is '{status}', expected one of: {}", expected.join(", "))]
    InvalidQuoteStatus {
        id: RecordId,
        status: String,
        expected: Vec<&'static str>,
    },

    #[error("quote '{0}' has no cart")]
    MissingCart(RecordId),

    #[error("cart '{0}' not found")]
    CartNotFound(RecordId),

    #[error("cart '{id}' has {current} item(s); adding {added} overflows the item count")]
    ItemCountOverflow { id: RecordId, current: u64, added: u64 },

    #[error("{resource}: update failed and the partially written batch could not be restored")]
    RestoreFailed {
        resource: &'static str,
        #[source]
        update: Box<OperationError>,
        restore: Box<OperationError>,
    },

    #[error("failed to read settings file '{path}'")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{path}'")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid input for workflow '{workflow}'")]
    InvalidInput {
        workflow: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize output of workflow '{workflow}'")]
    OutputSerialize {
        workflow: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("execution cancelled after {completed_steps} completed step(s)")]
    Cancelled { completed_steps: usize },

    #[error("execution exceeded its {limit:?} deadline after {completed_steps} completed step(s)")]
    TimedOut {
        limit: Duration,
        completed_steps: usize,
    },

    #[error("{0}")]
    Interrupted(String),

    #[error("sub-workflow failed {}", failure_point(step.as_deref()))]
    NestedFailed {
        step: Option<String>,
        #[source]
        source: Box<OperationError>,
    },

    #[error("workflow failed {}; all completed steps were compensated", failure_point(step.as_deref()))]
    SagaFailed {
        step: Option<String>,
        #[source]
        source: Box<OperationError>,
    },

    #[error(
        "workflow failed {} and {} compensation(s) also failed", failure_point(step.as_deref()), compensation_failures.len()
    )]
    SagaCompensationFailed {
        step: Option<String>,
        source: Box<OperationError>,
        compensation_failures: Vec<CompensationFailure>,
    },
}

pub type Result<T> = std::result::Result<T, OperationError>;

impl OperationError {
    /// Whether a failed workflow left effects that were not undone.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        matches!(self, Self::SagaCompensationFailed { .. })
    }

    /// Steps whose effects remain after a dirty rollback.
    #[must_use]
    pub fn unrecoverable_steps(&self) -> Vec<&str> {
        match self {
            Self::SagaCompensationFailed {
                compensation_failures,
                ..
            } => compensation_failures
                .iter()
                .map(|f| f.step.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn failure_point(step: Option<&str>) -> String {
    match step {
        Some(step) => format!("at step '{step}'"),
        None => "between steps".to_string(),
    }
}

fn split_trigger(trigger: Trigger<OperationError>) -> (Option<String>, OperationError) {
    match trigger {
        Trigger::Step { step, source } => (Some(step), source),
        Trigger::Cancelled { completed_steps } => {
            (None, OperationError::Cancelled { completed_steps })
        }
        Trigger::TimedOut {
            limit,
            completed_steps,
        } => (
            None,
            OperationError::TimedOut {
                limit,
                completed_steps,
            },
        ),
        Trigger::Nested { step, cause } => {
            let (inner_step, source) = split_trigger(*cause);
            (
                Some(step),
                OperationError::NestedFailed {
                    step: inner_step,
                    source: Box::new(source),
                },
            )
        }
        other => (None, OperationError::Interrupted(other.to_string())),
    }
}

impl From<SagaError<OperationError>> for OperationError {
    fn from(err: SagaError<OperationError>) -> Self {
        match err {
            SagaError::Configuration(e) => Self::Configuration(e),
            SagaError::RolledBack { trigger } => {
                let (step, source) = split_trigger(trigger);
                Self::SagaFailed {
                    step,
                    source: Box::new(source),
                }
            }
            SagaError::CompensationFailed {
                trigger,
                compensation_errors,
            } => {
                let (step, source) = split_trigger(trigger);
                let compensation_failures = compensation_errors
                    .into_iter()
                    .map(|e| CompensationFailure {
                        step: e.step,
                        description: e.description,
                        error: Box::new(e.error),
                    })
                    .collect();
                Self::SagaCompensationFailed {
                    step,
                    source: Box::new(source),
                    compensation_failures,
                }
            }
            other => Self::Interrupted(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use commerce_saga::CompensationError;

    use super::*;

    fn store_down() -> OperationError {
        OperationError::DataAccess(DataAccessError::Unavailable {
            resource: "carts",
            reason: "connection reset".to_string(),
        })
    }

    #[test]
    fn rolled_back_step_failure_keeps_step_and_cause() {
        let err: OperationError = SagaError::RolledBack {
            trigger: Trigger::Step {
                step: "update-carts".to_string(),
                source: store_down(),
            },
        }
        .into();

        assert!(!err.is_dirty());
        assert!(err.to_string().contains("at step 'update-carts'"));
        let OperationError::SagaFailed { step, source } = err else {
            panic!("expected SagaFailed");
        };
        assert_eq!(step.as_deref(), Some("update-carts"));
        assert!(matches!(*source, OperationError::DataAccess(_)));
    }

    #[test]
    fn cancelled_trigger_has_no_step() {
        let err: OperationError = SagaError::RolledBack {
            trigger: Trigger::Cancelled { completed_steps: 2 },
        }
        .into();

        assert!(err.to_string().contains("between steps"));
        assert!(matches!(
            err,
            OperationError::SagaFailed { ref source, .. }
                if matches!(**source, OperationError::Cancelled { completed_steps: 2 })
        ));
    }

    #[test]
    fn compensation_failures_are_listed_as_unrecoverable() {
        let err: OperationError = SagaError::CompensationFailed {
            trigger: Trigger::Step {
                step: "update-carts".to_string(),
                source: store_down(),
            },
            compensation_errors: vec![CompensationError {
                step: "update-quotes".to_string(),
                description: "restore quotes".to_string(),
                error: store_down(),
            }],
        }
        .into();

        assert!(err.is_dirty());
        assert_eq!(err.unrecoverable_steps(), vec!["update-quotes"]);
        assert!(err.to_string().contains("1 compensation(s) also failed"));
    }

    #[test]
    fn nested_trigger_keeps_outer_and_inner_steps() {
        let err: OperationError = SagaError::RolledBack {
            trigger: Trigger::Nested {
                step: "add-line-items".to_string(),
                cause: Box::new(Trigger::Step {
                    step: "update-item-count".to_string(),
                    source: store_down(),
                }),
            },
        }
        .into();

        assert!(err.to_string().contains("at step 'add-line-items'"));
        let OperationError::SagaFailed { source, .. } = err else {
            panic!("expected SagaFailed");
        };
        assert_eq!(
            source.to_string(),
            "sub-workflow failed at step 'update-item-count'"
        );
    }

    #[test]
    fn invalid_status_lists_expected_statuses() {
        let err = OperationError::InvalidQuoteStatus {
            id: RecordId::from("quote_1"),
            status: "accepted".to_string(),
            expected: vec!["pending_merchant", "pending_customer"],
        };

        let msg = err.to_string();

        assert!(msg.contains("'accepted'"));
        assert!(msg.contains("pending_merchant, pending_customer"));
    }
}
