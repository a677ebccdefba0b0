use std::fmt::Debug;

use async_trait::async_trait;

use crate::audit::SagaAuditLog;
use crate::error::{CompensationError, SagaError, StepFailure, Trigger};
use crate::execution::ExecutionOptions;
use crate::record::CompensationStack;
use crate::saga::Saga;
use crate::step::{SagaStep, StepResponse};
use crate::unwind::UnwindOutcome;

/// A saga used as a single step of an enclosing saga.
///
/// If the inner saga fails, it unwinds itself before the enclosing saga
/// sees the failure. If it succeeds, its compensation stack becomes this
/// step's compensation data, so a later failure in the enclosing saga
/// unwinds the inner steps in reverse order as one unit.
///
/// Inner compensations that fail either way are reported by the
/// enclosing saga under the inner step names.
pub struct NestedSaga<Input, Output, Ctx, Err> {
    name: &'static str,
    saga: Saga<Input, Output, Ctx, Err>,
}

impl<Input, Output, Ctx, Err> Saga<Input, Output, Ctx, Err> {
    /// Wrap this saga so it can be added to another saga with `then`.
    #[must_use]
    pub fn into_step(self, name: &'static str) -> NestedSaga<Input, Output, Ctx, Err> {
        NestedSaga { name, saga: self }
    }
}

#[async_trait]
impl<Input, Output, Ctx, E> SagaStep for NestedSaga<Input, Output, Ctx, E>
where
    Input: Send + 'static,
    Output: Send + 'static,
    Ctx: Send + Sync + 'static,
    E: Debug + Send + From<SagaError<E>> + 'static,
{
    type Input = Input;
    type Output = Output;
    type Compensation = CompensationStack<Ctx, E>;
    type Context = Ctx;
    type Error = E;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        let mut audit_log = SagaAuditLog::new();
        let (output, stack) = self
            .saga
            .run(ctx, input, ExecutionOptions::default(), &mut audit_log)
            .await
            .map_err(E::from)?;
        Ok(respond(output, stack))
    }

    async fn attempt(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, StepFailure<Self::Error>> {
        let mut audit_log = SagaAuditLog::new();
        match self
            .saga
            .run(ctx, input, ExecutionOptions::default(), &mut audit_log)
            .await
        {
            Ok((output, stack)) => Ok(respond(output, stack)),
            Err(SagaError::RolledBack { trigger }) => Err(StepFailure::Nested {
                trigger,
                compensation_errors: Vec::new(),
            }),
            Err(SagaError::CompensationFailed {
                trigger,
                compensation_errors,
            }) => Err(StepFailure::Nested {
                trigger,
                compensation_errors,
            }),
            Err(error @ SagaError::Configuration(_)) => Err(StepFailure::Error(E::from(error))),
        }
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        stack: Self::Compensation,
    ) -> Result<(), Self::Error> {
        match stack.unwind(ctx).await {
            UnwindOutcome::Clean => Ok(()),
            UnwindOutcome::Dirty(compensation_errors) => {
                Err(E::from(SagaError::CompensationFailed {
                    trigger: Trigger::EnclosingUnwind,
                    compensation_errors,
                }))
            }
        }
    }

    async fn revert(
        &self,
        ctx: &Self::Context,
        stack: Self::Compensation,
    ) -> Result<(), Vec<CompensationError<Self::Error>>> {
        match stack.unwind(ctx).await {
            UnwindOutcome::Clean => Ok(()),
            UnwindOutcome::Dirty(compensation_errors) => Err(compensation_errors),
        }
    }

    fn is_compensable(&self) -> bool {
        self.saga.is_compensable()
    }

    fn compensation_description(&self) -> String {
        format!("unwind nested saga {}", self.name)
    }
}

fn respond<Output, Ctx, E>(
    output: Output,
    stack: CompensationStack<Ctx, E>,
) -> StepResponse<Output, CompensationStack<Ctx, E>> {
    if stack.is_empty() {
        StepResponse::without_compensation(output)
    } else {
        StepResponse::new(output, stack)
    }
}
