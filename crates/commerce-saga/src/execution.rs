use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Trigger;
use crate::record::{CompensationRecord, CompensationStack};

/// Lifecycle of a single saga execution.
///
/// ```text
/// Pending -> Running -> Succeeded
///                    -> Unwinding -> FailedClean
///                                 -> FailedDirty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    Pending,
    Running,
    Succeeded,
    Unwinding,
    /// Every completed step was compensated; safe to retry.
    FailedClean,
    /// At least one compensation failed; needs manual reconciliation.
    FailedDirty,
}

impl ExecutionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedClean | Self::FailedDirty)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Succeeded | Self::Unwinding)
                | (Self::Unwinding, Self::FailedClean | Self::FailedDirty)
        )
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Unwinding => "unwinding",
            Self::FailedClean => "failed (clean)",
            Self::FailedDirty => "failed (dirty)",
        };
        f.write_str(label)
    }
}

/// Per-call controls for a saga execution.
///
/// Both controls are checked at step boundaries only: a step that is
/// already running always finishes and is recorded before the unwind
/// begins.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    cancellation: Option<CancellationToken>,
    deadline: Option<Duration>,
}

impl ExecutionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub(crate) fn or_deadline(mut self, fallback: Option<Duration>) -> Self {
        if self.deadline.is_none() {
            self.deadline = fallback;
        }
        self
    }
}

/// Mutable state owned by one running saga.
pub(crate) struct Execution<Ctx, Err> {
    state: ExecutionState,
    stack: CompensationStack<Ctx, Err>,
    started: Instant,
    options: ExecutionOptions,
}

impl<Ctx, Err> Execution<Ctx, Err> {
    pub(crate) fn new(options: ExecutionOptions) -> Self {
        Self {
            state: ExecutionState::Pending,
            stack: CompensationStack::new(),
            started: Instant::now(),
            options,
        }
    }

    pub(crate) fn state(&self) -> ExecutionState {
        self.state
    }

    pub(crate) fn transition(&mut self, next: ExecutionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid execution transition {} -> {next}",
            self.state
        );
        self.state = next;
    }

    pub(crate) fn completed_steps(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn record(&mut self, record: CompensationRecord<Ctx, Err>) {
        self.stack.push(record);
    }

    /// Checks for cancellation or an elapsed deadline at a step boundary.
    pub(crate) fn interruption(&self) -> Option<Trigger<Err>> {
        let completed_steps = self.completed_steps();

        if self
            .options
            .cancellation()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Some(Trigger::Cancelled { completed_steps });
        }

        match self.options.deadline() {
            Some(limit) if self.started.elapsed() >= limit => Some(Trigger::TimedOut {
                limit,
                completed_steps,
            }),
            _ => None,
        }
    }

    pub(crate) fn into_stack(self) -> CompensationStack<Ctx, Err> {
        self.stack
    }
}
