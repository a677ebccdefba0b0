use std::fmt::Debug;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{CompensationError, StepFailure};
use crate::step::{SagaStep, StepResponse};

/// Runs a step whose failure should not abort the saga.
///
/// A failure of the inner step is logged and turned into a skipped
/// `None` output with nothing to compensate. A success yields
/// `Some(output)` and keeps the inner step's compensation. A nested saga
/// that failed and could not undo all of its own steps is not skippable;
/// that failure still aborts the enclosing saga.
pub struct ContinueOnError<S> {
    inner: S,
}

impl<S> ContinueOnError<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> SagaStep for ContinueOnError<S>
where
    S: SagaStep,
    S::Error: Debug,
{
    type Input = S::Input;
    type Output = Option<S::Output>;
    type Compensation = S::Compensation;
    type Context = S::Context;
    type Error = S::Error;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        match self.inner.execute(ctx, input).await {
            Ok(response) => Ok(optional(response)),
            Err(error) => {
                warn!(step = self.inner.name(), ?error, "optional step failed, continuing");
                Ok(StepResponse::skipped(None))
            }
        }
    }

    async fn attempt(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, StepFailure<Self::Error>> {
        match self.inner.attempt(ctx, input).await {
            Ok(response) => Ok(optional(response)),
            Err(StepFailure::Nested {
                trigger,
                compensation_errors,
            }) if !compensation_errors.is_empty() => Err(StepFailure::Nested {
                trigger,
                compensation_errors,
            }),
            Err(failure) => {
                warn!(step = self.inner.name(), ?failure, "optional step failed, continuing");
                Ok(StepResponse::skipped(None))
            }
        }
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        compensation: Self::Compensation,
    ) -> Result<(), Self::Error> {
        self.inner.compensate(ctx, compensation).await
    }

    async fn revert(
        &self,
        ctx: &Self::Context,
        compensation: Self::Compensation,
    ) -> Result<(), Vec<CompensationError<Self::Error>>> {
        self.inner.revert(ctx, compensation).await
    }

    fn is_compensable(&self) -> bool {
        self.inner.is_compensable()
    }

    fn compensation_description(&self) -> String {
        self.inner.compensation_description()
    }
}

fn optional<O, C>(response: StepResponse<O, C>) -> StepResponse<Option<O>, C> {
    match response.into_parts() {
        (output, Some(compensation)) => StepResponse::new(Some(output), compensation),
        (output, None) => StepResponse::without_compensation(Some(output)),
    }
}
