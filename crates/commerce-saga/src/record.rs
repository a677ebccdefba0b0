use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::CompensationError;
use crate::step::SagaStep;

/// A step's compensation bound to the data it captured.
///
/// Implementations own both the step and its typed compensation data, so
/// routing a record to the right compensator needs no type inspection.
pub(crate) trait Compensator<Ctx, Err>: Send {
    fn compensate<'a>(
        self: Box<Self>,
        ctx: &'a Ctx,
    ) -> BoxFuture<'a, Result<(), Vec<CompensationError<Err>>>>
    where
        Ctx: 'a;
}

pub(crate) struct PendingCompensation<S: SagaStep> {
    step: Arc<S>,
    data: S::Compensation,
}

impl<S: SagaStep> PendingCompensation<S> {
    pub(crate) fn new(step: Arc<S>, data: S::Compensation) -> Self {
        Self { step, data }
    }
}

impl<S> Compensator<S::Context, S::Error> for PendingCompensation<S>
where
    S: SagaStep + 'static,
{
    fn compensate<'a>(
        self: Box<Self>,
        ctx: &'a S::Context,
    ) -> BoxFuture<'a, Result<(), Vec<CompensationError<S::Error>>>>
    where
        S::Context: 'a,
    {
        let Self { step, data } = *self;
        Box::pin(async move { step.revert(ctx, data).await })
    }
}

/// Created only after a step's forward action succeeded.
pub(crate) struct CompensationRecord<Ctx, Err> {
    pub(crate) step: &'static str,
    pub(crate) description: String,
    /// `None` when the step reported nothing to undo.
    pub(crate) compensator: Option<Box<dyn Compensator<Ctx, Err>>>,
}

/// Compensation records of one execution, in completion order.
///
/// A stack is owned by exactly one execution. It is dropped when the
/// execution succeeds and consumed by [`CompensationStack::unwind`] when it
/// fails. Nested sagas hand their stack to the enclosing saga as their own
/// compensation data.
pub struct CompensationStack<Ctx, Err> {
    pub(crate) records: Vec<CompensationRecord<Ctx, Err>>,
}

impl<Ctx, Err> CompensationStack<Ctx, Err> {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, record: CompensationRecord<Ctx, Err>) {
        self.records.push(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names of the recorded steps in completion order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.records.iter().map(|record| record.step).collect()
    }
}

impl<Ctx, Err> std::fmt::Debug for CompensationStack<Ctx, Err> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompensationStack")
            .field("steps", &self.step_names())
            .finish()
    }
}
