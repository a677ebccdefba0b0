use std::time::{Duration, Instant};

use crate::execution::ExecutionState;

/// Where a step ended up by the time the execution finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// The forward action completed and was not undone.
    Executed,
    /// The step ran but chose not to act.
    Skipped,
    /// The forward action failed; this step triggered the unwind.
    Failed,
    /// The forward action completed and was later undone.
    Compensated,
    /// Undoing the forward action failed; its effect remains.
    CompensationFailed,
}

impl StepStatus {
    fn marker(self) -> &'static str {
        match self {
            Self::Executed => "✓",
            Self::Skipped => "-",
            Self::Failed => "✗",
            Self::Compensated => "↩",
            Self::CompensationFailed => "⚠",
        }
    }
}

/// One step's entry in a [`SagaAuditLog`].
#[derive(Debug)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub started_at: Instant,
    /// Set when the forward action returns, and moved forward again when
    /// the step is compensated.
    pub completed_at: Option<Instant>,
    /// What compensating this step does. Only set for completed steps.
    pub compensation_description: Option<String>,
}

impl StepRecord {
    /// Time from the start of the step to its last recorded change.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.completed_at
            .map(|done| done.saturating_duration_since(self.started_at))
    }
}

/// What happened during one execution: a record per step that was
/// started, and every execution state passed through.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
    states: Vec<ExecutionState>,
}

impl SagaAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&mut self, state: ExecutionState) {
        self.states.push(state);
    }

    pub(crate) fn step_started(&mut self, name: &str) {
        self.records.push(StepRecord {
            name: name.to_string(),
            status: StepStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
        });
    }

    pub(crate) fn step_completed(&mut self, compensation_description: String) {
        self.finish_current(StepStatus::Executed);
        if let Some(current) = self.records.last_mut() {
            current.compensation_description = Some(compensation_description);
        }
    }

    pub(crate) fn step_skipped(&mut self) {
        self.finish_current(StepStatus::Skipped);
    }

    pub(crate) fn step_failed(&mut self) {
        self.finish_current(StepStatus::Failed);
    }

    pub(crate) fn step_compensated(&mut self, name: &str) {
        self.finish_named(name, StepStatus::Compensated);
    }

    pub(crate) fn compensation_failed(&mut self, name: &str) {
        self.finish_named(name, StepStatus::CompensationFailed);
    }

    fn finish_current(&mut self, status: StepStatus) {
        if let Some(current) = self.records.last_mut() {
            current.status = status;
            current.completed_at = Some(Instant::now());
        }
    }

    fn finish_named(&mut self, name: &str, status: StepStatus) {
        if let Some(record) = self.records.iter_mut().find(|r| r.name == name) {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Steps that ended with the given status, in execution order.
    pub fn with_status(&self, status: StepStatus) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(move |r| r.status == status)
    }

    #[must_use]
    pub fn states(&self) -> &[ExecutionState] {
        &self.states
    }

    /// The state the execution is in, or ended in.
    #[must_use]
    pub fn state(&self) -> Option<ExecutionState> {
        self.states.last().copied()
    }

    /// One line per step with a status marker, then the final state.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self
            .records
            .iter()
            .map(|r| format!("{} {}", r.status.marker(), r.name))
            .collect();
        if let Some(state) = self.state() {
            lines.push(format!("= {state}"));
        }
        lines.join("\n")
    }
}
