use std::any::Any;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::StepFailure;
use crate::record::{CompensationRecord, Compensator, PendingCompensation};
use crate::step::SagaStep;

pub(crate) type BoxedValue = Box<dyn Any + Send>;

pub(crate) struct ErasedResponse<Ctx, Err> {
    pub(crate) output: BoxedValue,
    pub(crate) record: CompensationRecord<Ctx, Err>,
    pub(crate) skipped: bool,
}

pub(crate) trait ErasedStep<Ctx, Err>: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_compensable(&self) -> bool;

    fn compensation_description(&self) -> String;

    fn execute_erased<'a>(
        &'a self,
        ctx: &'a Ctx,
        input: BoxedValue,
    ) -> BoxFuture<'a, Result<ErasedResponse<Ctx, Err>, StepFailure<Err>>>;
}

pub(crate) struct StepWrapper<S> {
    step: Arc<S>,
}

impl<S> StepWrapper<S> {
    pub(crate) fn new(step: S) -> Self {
        Self {
            step: Arc::new(step),
        }
    }
}

impl<S> ErasedStep<S::Context, S::Error> for StepWrapper<S>
where
    S: SagaStep + 'static,
{
    fn name(&self) -> &'static str {
        self.step.name()
    }

    fn is_compensable(&self) -> bool {
        self.step.is_compensable()
    }

    fn compensation_description(&self) -> String {
        self.step.compensation_description()
    }

    fn execute_erased<'a>(
        &'a self,
        ctx: &'a S::Context,
        input: BoxedValue,
    ) -> BoxFuture<'a, Result<ErasedResponse<S::Context, S::Error>, StepFailure<S::Error>>> {
        Box::pin(async move {
            let typed_input = input
                .downcast::<S::Input>()
                .expect("type-state builder guarantees correct input type");
            let response = self.step.attempt(ctx, *typed_input).await?;
            let skipped = response.is_skipped();
            let (output, data) = response.into_parts();

            let compensator = data.map(|data| {
                Box::new(PendingCompensation::new(Arc::clone(&self.step), data))
                    as Box<dyn Compensator<S::Context, S::Error>>
            });
            let record = CompensationRecord {
                step: self.step.name(),
                description: self.step.compensation_description(),
                compensator,
            };

            Ok(ErasedResponse {
                output: Box::new(output),
                record,
                skipped,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::step::StepResponse;

    struct TestContext {
        multiplier: i32,
    }

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    struct MultiplyStep;

    #[async_trait]
    impl SagaStep for MultiplyStep {
        type Input = i32;
        type Output = i32;
        type Compensation = i32;
        type Context = TestContext;
        type Error = TestError;

        fn name(&self) -> &'static str {
            "multiply"
        }

        async fn execute(
            &self,
            ctx: &Self::Context,
            input: Self::Input,
        ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
            Ok(StepResponse::new(input * ctx.multiplier, input))
        }
    }

    struct ReadOnlyStep;

    #[async_trait]
    impl SagaStep for ReadOnlyStep {
        type Input = String;
        type Output = usize;
        type Compensation = ();
        type Context = TestContext;
        type Error = TestError;

        fn name(&self) -> &'static str {
            "read_only"
        }

        async fn execute(
            &self,
            _ctx: &Self::Context,
            input: Self::Input,
        ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
            Ok(StepResponse::without_compensation(input.len()))
        }

        fn is_compensable(&self) -> bool {
            false
        }
    }

    struct FailingStep;

    #[async_trait]
    impl SagaStep for FailingStep {
        type Input = String;
        type Output = ();
        type Compensation = ();
        type Context = TestContext;
        type Error = TestError;

        fn name(&self) -> &'static str {
            "failing"
        }

        async fn execute(
            &self,
            _ctx: &Self::Context,
            input: Self::Input,
        ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
            Err(TestError(input))
        }
    }

    #[test]
    fn wrapper_delegates_name_and_description() {
        let wrapper = StepWrapper::new(MultiplyStep);

        assert_eq!(wrapper.name(), "multiply");
        assert_eq!(wrapper.compensation_description(), "undo multiply");
        assert!(wrapper.is_compensable());
    }

    #[tokio::test]
    async fn wrapper_executes_with_erased_types() {
        let ctx = TestContext { multiplier: 3 };
        let wrapper = StepWrapper::new(MultiplyStep);

        let response = wrapper
            .execute_erased(&ctx, Box::new(7_i32))
            .await
            .expect("execution should succeed");

        let output = response
            .output
            .downcast::<i32>()
            .expect("output should be i32");
        assert_eq!(*output, 21);
        assert_eq!(response.record.step, "multiply");
        assert!(response.record.compensator.is_some());
        assert!(!response.skipped);
    }

    #[tokio::test]
    async fn record_compensator_runs_step_compensation() {
        let ctx = TestContext { multiplier: 3 };
        let wrapper = StepWrapper::new(MultiplyStep);

        let response = wrapper
            .execute_erased(&ctx, Box::new(7_i32))
            .await
            .expect("execution should succeed");
        let compensator = response
            .record
            .compensator
            .expect("multiply captures its input");

        assert!(compensator.compensate(&ctx).await.is_ok());
    }

    #[tokio::test]
    async fn empty_compensation_produces_record_without_compensator() {
        let ctx = TestContext { multiplier: 1 };
        let wrapper = StepWrapper::new(ReadOnlyStep);

        let response = wrapper
            .execute_erased(&ctx, Box::new(String::from("abc")))
            .await
            .expect("execution should succeed");

        assert_eq!(response.record.step, "read_only");
        assert!(response.record.compensator.is_none());
        assert!(!wrapper.is_compensable());
    }

    #[tokio::test]
    async fn wrapper_propagates_errors() {
        let ctx = TestContext { multiplier: 1 };
        let wrapper = StepWrapper::new(FailingStep);

        let result = wrapper
            .execute_erased(&ctx, Box::new(String::from("test error")))
            .await;

        let err = result.err().expect("should have an error");
        assert!(matches!(err, StepFailure::Error(TestError(ref msg)) if msg == "test error"));
    }
}
