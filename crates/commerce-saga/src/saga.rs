use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::audit::SagaAuditLog;
use crate::config::SagaConfig;
use crate::erased::{BoxedValue, ErasedStep};
use crate::error::{CompensationError, SagaError, StepFailure, Trigger};
use crate::execution::{Execution, ExecutionOptions, ExecutionState};
use crate::record::CompensationStack;
use crate::unwind::{UnwindOutcome, unwind};

/// A compiled saga ready for execution.
///
/// Sagas execute a sequence of steps, where each step's output becomes the
/// next step's input. If any step fails, previously completed steps are
/// compensated in reverse order (LIFO). A saga holds no per-execution
/// state, so one instance can serve many concurrent executions.
pub struct Saga<Input, Output, Ctx, Err> {
    steps: Vec<Arc<dyn ErasedStep<Ctx, Err>>>,
    config: SagaConfig,
    _phantom: PhantomData<fn(Input) -> Output>,
}

impl<Input, Output, Ctx, Err> Clone for Saga<Input, Output, Ctx, Err> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            config: self.config.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<Input, Output, Ctx, Err> Saga<Input, Output, Ctx, Err> {
    pub(crate) fn from_parts(steps: Vec<Arc<dyn ErasedStep<Ctx, Err>>>, config: SagaConfig) -> Self {
        Self {
            steps,
            config,
            _phantom: PhantomData,
        }
    }

    /// Names of the steps in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    #[must_use]
    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    pub(crate) fn is_compensable(&self) -> bool {
        self.steps.iter().any(|step| step.is_compensable())
    }
}

impl<Input, Output, Ctx, Err> Saga<Input, Output, Ctx, Err>
where
    Input: Send + 'static,
    Output: Send + 'static,
    Err: Debug,
{
    /// Execute the saga, returning the final output on success.
    ///
    /// On failure, compensates all previously completed steps in reverse order.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::RolledBack` if the execution failed and every
    /// completed step was compensated, and `SagaError::CompensationFailed`
    /// if some compensations also failed.
    pub async fn execute(&self, ctx: &Ctx, input: Input) -> Result<Output, SagaError<Err>> {
        self.execute_with(ctx, input, ExecutionOptions::default())
            .await
    }

    /// Execute the saga with a cancellation token and/or deadline.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute); cancellation and an elapsed
    /// deadline unwind exactly like a step failure.
    pub async fn execute_with(
        &self,
        ctx: &Ctx,
        input: Input,
        options: ExecutionOptions,
    ) -> Result<Output, SagaError<Err>> {
        let (result, _audit_log) = self.execute_with_audit(ctx, input, options).await;
        result
    }

    /// Execute the saga and return both the result and an audit log.
    ///
    /// The audit log tracks all step executions, compensations and
    /// execution state changes.
    pub async fn execute_with_audit(
        &self,
        ctx: &Ctx,
        input: Input,
        options: ExecutionOptions,
    ) -> (Result<Output, SagaError<Err>>, SagaAuditLog) {
        let mut audit_log = SagaAuditLog::new();
        let result = self
            .run(ctx, input, options, &mut audit_log)
            .await
            .map(|(output, _stack)| output);
        (result, audit_log)
    }

    /// Runs every step and, on success, hands back the compensation stack
    /// so an enclosing saga can unwind this one later.
    pub(crate) async fn run(
        &self,
        ctx: &Ctx,
        input: Input,
        options: ExecutionOptions,
        audit_log: &mut SagaAuditLog,
    ) -> Result<(Output, CompensationStack<Ctx, Err>), SagaError<Err>> {
        let mut execution = Execution::new(options.or_deadline(self.config.timeout()));
        audit_log.enter(execution.state());

        execution.transition(ExecutionState::Running);
        audit_log.enter(execution.state());

        let mut current_input: BoxedValue = Box::new(input);

        for step in &self.steps {
            if let Some(trigger) = execution.interruption() {
                return Err(self.abort(ctx, execution, trigger, audit_log).await);
            }

            let step_name = step.name();
            debug!(step = step_name, "executing step");
            audit_log.step_started(step_name);

            match step.execute_erased(ctx, current_input).await {
                Ok(response) => {
                    if response.skipped {
                        debug!(step = step_name, "step skipped");
                        audit_log.step_skipped();
                    } else {
                        audit_log.step_completed(response.record.description.clone());
                    }
                    execution.record(response.record);
                    current_input = response.output;
                }
                Err(failure) => {
                    debug!(step = step_name, "step failed");
                    audit_log.step_failed();
                    let (trigger, leftovers) = match failure {
                        StepFailure::Error(source) => (
                            Trigger::Step {
                                step: step_name.to_string(),
                                source,
                            },
                            Vec::new(),
                        ),
                        StepFailure::Nested {
                            trigger,
                            compensation_errors,
                        } => (
                            Trigger::Nested {
                                step: step_name.to_string(),
                                cause: Box::new(trigger),
                            },
                            compensation_errors,
                        ),
                    };
                    return Err(self
                        .abort_with(ctx, execution, trigger, leftovers, audit_log)
                        .await);
                }
            }
        }

        // The last step may have finished after a cancellation or the
        // deadline; the execution still counts as interrupted.
        if let Some(trigger) = execution.interruption() {
            return Err(self.abort(ctx, execution, trigger, audit_log).await);
        }

        execution.transition(ExecutionState::Succeeded);
        audit_log.enter(execution.state());
        info!(steps = self.steps.len(), "saga succeeded");

        let output = current_input
            .downcast::<Output>()
            .expect("type-state builder guarantees final output type");
        Ok((*output, execution.into_stack()))
    }

    async fn abort(
        &self,
        ctx: &Ctx,
        execution: Execution<Ctx, Err>,
        trigger: Trigger<Err>,
        audit_log: &mut SagaAuditLog,
    ) -> SagaError<Err> {
        self.abort_with(ctx, execution, trigger, Vec::new(), audit_log)
            .await
    }

    /// Unwinds the completed steps. `leftovers` are compensations that
    /// already failed inside the failing step, such as a nested saga's.
    async fn abort_with(
        &self,
        ctx: &Ctx,
        mut execution: Execution<Ctx, Err>,
        trigger: Trigger<Err>,
        mut leftovers: Vec<CompensationError<Err>>,
        audit_log: &mut SagaAuditLog,
    ) -> SagaError<Err> {
        execution.transition(ExecutionState::Unwinding);
        audit_log.enter(execution.state());
        debug!(
            completed_steps = execution.completed_steps(),
            "unwinding completed steps"
        );

        if let UnwindOutcome::Dirty(errors) =
            unwind(ctx, execution.into_stack(), Some(&mut *audit_log)).await
        {
            leftovers.extend(errors);
        }

        if leftovers.is_empty() {
            audit_log.enter(ExecutionState::FailedClean);
            info!(failed_step = ?trigger.step(), "saga rolled back");
            return SagaError::RolledBack { trigger };
        }

        audit_log.enter(ExecutionState::FailedDirty);
        let unrecoverable: Vec<&str> = leftovers.iter().map(|e| e.step.as_str()).collect();
        error!(
            failed_step = ?trigger.step(),
            unrecoverable = ?unrecoverable,
            "saga rollback incomplete, manual reconciliation required"
        );
        SagaError::CompensationFailed {
            trigger,
            compensation_errors: leftovers,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::audit::StepStatus;
    use crate::builder::SagaBuilder;
    use crate::step::{SagaStep, StepResponse};

    struct TestContext {
        compensation_log: Mutex<Vec<String>>,
    }

    impl TestContext {
        fn new() -> Self {
            Self {
                compensation_log: Mutex::new(Vec::new()),
            }
        }

        fn log(&self) -> Vec<String> {
            self.compensation_log.lock().expect("log lock").clone()
        }
    }

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("{0}")]
    struct TestError(String);

    struct AddStep {
        name: &'static str,
        value: i32,
    }

    #[async_trait]
    impl SagaStep for AddStep {
        type Input = i32;
        type Output = i32;
        type Compensation = i32;
        type Context = TestContext;
        type Error = TestError;

        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(
            &self,
            _ctx: &Self::Context,
            input: Self::Input,
        ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
            Ok(StepResponse::new(input + self.value, input))
        }

        async fn compensate(
            &self,
            ctx: &Self::Context,
            before: Self::Compensation,
        ) -> Result<(), Self::Error> {
            ctx.compensation_log
                .lock()
                .expect("log lock")
                .push(format!("compensate {} back to {}", self.name, before));
            Ok(())
        }
    }

    struct FailingStep {
        error_msg: &'static str,
    }

    #[async_trait]
    impl SagaStep for FailingStep {
        type Input = i32;
        type Output = i32;
        type Compensation = ();
        type Context = TestContext;
        type Error = TestError;

        fn name(&self) -> &'static str {
            "failing"
        }

        async fn execute(
            &self,
            _ctx: &Self::Context,
            _input: Self::Input,
        ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
            Err(TestError(self.error_msg.to_string()))
        }
    }

    struct FailingCompensationStep {
        name: &'static str,
    }

    #[async_trait]
    impl SagaStep for FailingCompensationStep {
        type Input = i32;
        type Output = i32;
        type Compensation = i32;
        type Context = TestContext;
        type Error = TestError;

        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(
            &self,
            _ctx: &Self::Context,
            input: Self::Input,
        ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
            Ok(StepResponse::new(input, input))
        }

        async fn compensate(
            &self,
            _ctx: &Self::Context,
            _before: Self::Compensation,
        ) -> Result<(), Self::Error> {
            Err(TestError(format!("compensation failed for {}", self.name)))
        }
    }

    #[tokio::test]
    async fn multi_step_saga_flows_data_through_steps() -> anyhow::Result<()> {
        let ctx = TestContext::new();
        let saga = SagaBuilder::new()
            .then(AddStep {
                name: "add_10",
                value: 10,
            })
            .then(AddStep {
                name: "add_5",
                value: 5,
            })
            .build()?;

        let result = saga.execute(&ctx, 5).await?;

        assert_eq!(result, 20);
        assert!(ctx.log().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn compensation_happens_in_lifo_order_with_captured_data() -> anyhow::Result<()> {
        let ctx = TestContext::new();
        let saga = SagaBuilder::new()
            .then(AddStep {
                name: "add_10",
                value: 10,
            })
            .then(AddStep {
                name: "add_3",
                value: 3,
            })
            .then(FailingStep { error_msg: "boom" })
            .build()?;

        let err = saga.execute(&ctx, 5).await.expect_err("saga should fail");

        assert!(matches!(
            err,
            SagaError::RolledBack { trigger: Trigger::Step { ref step, .. } } if step == "failing"
        ));
        assert_eq!(
            ctx.log(),
            vec!["compensate add_3 back to 15", "compensate add_10 back to 5"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn first_step_failure_requires_no_compensation() -> anyhow::Result<()> {
        let ctx = TestContext::new();
        let saga = SagaBuilder::new()
            .then(FailingStep {
                error_msg: "immediate failure",
            })
            .build()?;

        let err = saga.execute(&ctx, 42).await.expect_err("saga should fail");

        assert!(err.is_clean());
        assert!(ctx.log().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_saga_returns_input_unchanged() -> anyhow::Result<()> {
        let ctx = TestContext::new();
        let saga: Saga<i32, i32, TestContext, TestError> = SagaBuilder::new().build()?;

        let (result, audit_log) = saga
            .execute_with_audit(&ctx, 42, ExecutionOptions::default())
            .await;

        assert_eq!(result?, 42);
        assert!(audit_log.records().is_empty());
        assert_eq!(audit_log.state(), Some(ExecutionState::Succeeded));
        Ok(())
    }

    #[tokio::test]
    async fn compensation_failure_returns_compensation_failed_error() -> anyhow::Result<()> {
        let ctx = TestContext::new();
        let saga = SagaBuilder::new()
            .then(AddStep {
                name: "add_10",
                value: 10,
            })
            .then(FailingCompensationStep {
                name: "will_fail_comp",
            })
            .then(FailingStep {
                error_msg: "trigger compensation",
            })
            .build()?;

        let err = saga.execute(&ctx, 5).await.expect_err("saga should fail");

        match &err {
            SagaError::CompensationFailed {
                trigger,
                compensation_errors,
            } => {
                assert_eq!(trigger.step(), Some("failing"));
                assert_eq!(compensation_errors.len(), 1);
                assert_eq!(compensation_errors[0].step, "will_fail_comp");
            }
            other => panic!("expected CompensationFailed, got {other:?}"),
        }
        assert_eq!(err.unrecoverable_steps(), vec!["will_fail_comp"]);
        assert_eq!(ctx.log(), vec!["compensate add_10 back to 5"]);
        Ok(())
    }

    #[tokio::test]
    async fn audit_log_tracks_compensation_status_and_states() -> anyhow::Result<()> {
        let ctx = TestContext::new();
        let saga = SagaBuilder::new()
            .then(AddStep {
                name: "add_10",
                value: 10,
            })
            .then(FailingCompensationStep {
                name: "will_fail_comp",
            })
            .then(FailingStep {
                error_msg: "trigger compensation",
            })
            .build()?;

        let (result, audit_log) = saga
            .execute_with_audit(&ctx, 5, ExecutionOptions::default())
            .await;

        assert!(result.is_err());
        let records = audit_log.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, StepStatus::Compensated);
        assert_eq!(records[1].status, StepStatus::CompensationFailed);
        assert_eq!(records[2].status, StepStatus::Failed);
        assert_eq!(
            audit_log.states(),
            &[
                ExecutionState::Pending,
                ExecutionState::Running,
                ExecutionState::Unwinding,
                ExecutionState::FailedDirty,
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn saga_is_reusable_across_executions() -> anyhow::Result<()> {
        let ctx = TestContext::new();
        let saga = SagaBuilder::new()
            .then(AddStep {
                name: "add_1",
                value: 1,
            })
            .build()?;

        assert_eq!(saga.execute(&ctx, 1).await?, 2);
        assert_eq!(saga.clone().execute(&ctx, 10).await?, 11);
        Ok(())
    }
}
