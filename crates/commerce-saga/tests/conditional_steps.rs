//! Integration tests for steps that may skip their work or have nothing to undo.

use std::sync::Mutex;

use async_trait::async_trait;
use commerce_saga::{
    ContinueOnError, ExecutionOptions, SagaBuilder, SagaStep, StepResponse, StepStatus,
};

#[derive(Default)]
struct TestContext {
    operations_log: Mutex<Vec<String>>,
}

impl TestContext {
    fn push(&self, entry: impl Into<String>) {
        self.operations_log
            .lock()
            .expect("log lock")
            .push(entry.into());
    }

    fn log(&self) -> Vec<String> {
        self.operations_log.lock().expect("log lock").clone()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

#[derive(Clone)]
struct WriteRequest {
    data: String,
    should_write: bool,
}

/// Writes only when asked to; an untouched store has nothing to undo.
struct ConditionalWriteStep;

#[async_trait]
impl SagaStep for ConditionalWriteStep {
    type Input = WriteRequest;
    type Output = WriteRequest;
    type Compensation = String;
    type Context = TestContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "conditional_write"
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        if input.should_write {
            ctx.push(format!("wrote: {}", input.data));
            let written = input.data.clone();
            Ok(StepResponse::new(input, written))
        } else {
            ctx.push("skipped write");
            Ok(StepResponse::without_compensation(input))
        }
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        written: Self::Compensation,
    ) -> Result<(), Self::Error> {
        ctx.push(format!("compensate write: {written}"));
        Ok(())
    }
}

struct FailStep;

#[async_trait]
impl SagaStep for FailStep {
    type Input = WriteRequest;
    type Output = WriteRequest;
    type Compensation = ();
    type Context = TestContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "fail"
    }

    async fn execute(
        &self,
        _ctx: &Self::Context,
        _input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        Err(TestError("intentional failure".to_string()))
    }
}

struct NotifyStep {
    fail: bool,
}

#[async_trait]
impl SagaStep for NotifyStep {
    type Input = WriteRequest;
    type Output = WriteRequest;
    type Compensation = ();
    type Context = TestContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "notify"
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        if self.fail {
            return Err(TestError("mail server down".to_string()));
        }
        ctx.push("notified");
        Ok(StepResponse::without_compensation(input))
    }

    fn is_compensable(&self) -> bool {
        false
    }
}

/// Unwraps the optional notification result back into the request.
struct RequireRequest {
    fallback: WriteRequest,
}

#[async_trait]
impl SagaStep for RequireRequest {
    type Input = Option<WriteRequest>;
    type Output = WriteRequest;
    type Compensation = ();
    type Context = TestContext;
    type Error = TestError;

    fn name(&self) -> &'static str {
        "require_request"
    }

    async fn execute(
        &self,
        _ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        Ok(StepResponse::without_compensation(
            input.unwrap_or_else(|| self.fallback.clone()),
        ))
    }

    fn is_compensable(&self) -> bool {
        false
    }
}

fn request(should_write: bool) -> WriteRequest {
    WriteRequest {
        data: "test_data".to_string(),
        should_write,
    }
}

#[tokio::test]
async fn conditional_step_compensates_when_it_wrote() -> anyhow::Result<()> {
    let ctx = TestContext::default();
    let saga = SagaBuilder::new()
        .then(ConditionalWriteStep)
        .then(FailStep)
        .build()?;

    let result = saga.execute(&ctx, request(true)).await;

    assert!(result.is_err());
    assert_eq!(
        ctx.log(),
        vec!["wrote: test_data", "compensate write: test_data"]
    );
    Ok(())
}

#[tokio::test]
async fn empty_compensation_data_performs_no_undo() -> anyhow::Result<()> {
    let ctx = TestContext::default();
    let saga = SagaBuilder::new()
        .then(ConditionalWriteStep)
        .then(FailStep)
        .build()?;

    let (result, audit_log) = saga
        .execute_with_audit(&ctx, request(false), ExecutionOptions::default())
        .await;

    assert!(result.is_err());
    assert_eq!(ctx.log(), vec!["skipped write"]);
    assert_eq!(audit_log.records()[0].status, StepStatus::Executed);
    Ok(())
}

#[tokio::test]
async fn continue_on_error_skips_failed_optional_step() -> anyhow::Result<()> {
    let ctx = TestContext::default();
    let saga = SagaBuilder::new()
        .then(ConditionalWriteStep)
        .then(ContinueOnError::new(NotifyStep { fail: true }))
        .then(RequireRequest {
            fallback: request(false),
        })
        .build()?;

    let (result, audit_log) = saga
        .execute_with_audit(&ctx, request(true), ExecutionOptions::default())
        .await;

    let output = result?;
    assert!(!output.should_write);
    assert_eq!(ctx.log(), vec!["wrote: test_data"]);
    assert_eq!(audit_log.records()[1].status, StepStatus::Skipped);
    Ok(())
}

#[tokio::test]
async fn continue_on_error_passes_through_success() -> anyhow::Result<()> {
    let ctx = TestContext::default();
    let saga = SagaBuilder::new()
        .then(ContinueOnError::new(NotifyStep { fail: false }))
        .then(RequireRequest {
            fallback: request(false),
        })
        .build()?;

    let output = saga.execute(&ctx, request(true)).await?;

    assert!(output.should_write);
    assert_eq!(ctx.log(), vec!["notified"]);
    Ok(())
}

#[tokio::test]
async fn unwind_keeps_status_of_steps_with_nothing_to_undo() -> anyhow::Result<()> {
    let ctx = TestContext::default();
    let saga = SagaBuilder::new()
        .then(ConditionalWriteStep)
        .then(ContinueOnError::new(NotifyStep { fail: true }))
        .then(RequireRequest {
            fallback: request(true),
        })
        .then(FailStep)
        .build()?;

    let (result, audit_log) = saga
        .execute_with_audit(&ctx, request(true), ExecutionOptions::default())
        .await;

    assert!(result.is_err());
    let statuses: Vec<StepStatus> = audit_log.records().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Compensated,
            StepStatus::Skipped,
            StepStatus::Executed,
            StepStatus::Failed,
        ]
    );
    Ok(())
}
