use async_trait::async_trait;

use crate::error::{CompensationError, StepFailure};

/// What a successful forward action hands back to the executor.
///
/// The output flows into the next step. The compensation data, when
/// present, is everything the step needs to reverse its own effect and is
/// handed back verbatim to [`SagaStep::compensate`] during an unwind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResponse<Output, Compensation> {
    output: Output,
    compensation: Option<Compensation>,
    skipped: bool,
}

impl<Output, Compensation> StepResponse<Output, Compensation> {
    /// A result whose effect can be reversed with `compensation`.
    #[must_use]
    pub fn new(output: Output, compensation: Compensation) -> Self {
        Self {
            output,
            compensation: Some(compensation),
            skipped: false,
        }
    }

    /// A result with nothing to undo.
    ///
    /// The step still gets a compensation record, but the executor will not
    /// call [`SagaStep::compensate`] for it.
    #[must_use]
    pub fn without_compensation(output: Output) -> Self {
        Self {
            output,
            compensation: None,
            skipped: false,
        }
    }

    /// A result produced without performing the step's action.
    #[must_use]
    pub fn skipped(output: Output) -> Self {
        Self {
            output,
            compensation: None,
            skipped: true,
        }
    }

    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    #[must_use]
    pub fn has_compensation(&self) -> bool {
        self.compensation.is_some()
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn into_parts(self) -> (Output, Option<Compensation>) {
        (self.output, self.compensation)
    }

    /// Replace the output, keeping the compensation data.
    ///
    /// Lets a step delegate to another step and reshape what it returns.
    pub fn map_output<T>(self, f: impl FnOnce(Output) -> T) -> StepResponse<T, Compensation> {
        StepResponse {
            output: f(self.output),
            compensation: self.compensation,
            skipped: self.skipped,
        }
    }
}

/// A step in a saga that can be executed and compensated.
///
/// Each step transforms an input into an output and captures the state it
/// needs to undo itself. Compensation must depend only on that captured
/// data and on external state reachable through the context, never on the
/// forward output.
///
/// # Type Parameters
///
/// - `Input`: Data received from the previous step (or saga entry point)
/// - `Output`: Data produced for the next step
/// - `Compensation`: Snapshot captured by `execute` for `compensate`
/// - `Context`: Shared dependencies (injected, not passed between steps)
/// - `Error`: The error type for step failures
#[async_trait]
pub trait SagaStep: Send + Sync {
    /// Data received from the previous step or saga entry point.
    type Input: Send + 'static;

    /// Data produced for the next step.
    type Output: Send + 'static;

    /// State captured by the forward action to reverse its effect.
    type Compensation: Send + 'static;

    /// Shared context providing dependencies.
    type Context: Send + Sync;

    /// Error type for step failures.
    type Error: Send;

    /// Name used in logs, audit records and error messages. Must be unique
    /// within a saga.
    fn name(&self) -> &'static str;

    /// Run the forward action.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails to complete. A failed step leaves
    /// no compensation record behind.
    async fn execute(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error>;

    /// Reverse the forward action using the data it captured.
    ///
    /// The default implementation is a no-op, suitable for read-only steps.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails.
    async fn compensate(
        &self,
        ctx: &Self::Context,
        compensation: Self::Compensation,
    ) -> Result<(), Self::Error> {
        let _ = (ctx, compensation);
        Ok(())
    }

    /// Run the forward action on behalf of the executor.
    ///
    /// The default wraps [`execute`](Self::execute). A step that runs a
    /// whole saga overrides it so that nested compensations which could
    /// not be applied reach the enclosing saga's outcome.
    ///
    /// # Errors
    ///
    /// Returns how the forward action failed.
    async fn attempt(
        &self,
        ctx: &Self::Context,
        input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, StepFailure<Self::Error>> {
        self.execute(ctx, input).await.map_err(StepFailure::Error)
    }

    /// Compensate on behalf of the executor.
    ///
    /// The default wraps [`compensate`](Self::compensate) and attributes a
    /// failure to this step. A nested saga reports its own steps instead.
    ///
    /// # Errors
    ///
    /// Returns every compensation that could not be applied.
    async fn revert(
        &self,
        ctx: &Self::Context,
        compensation: Self::Compensation,
    ) -> Result<(), Vec<CompensationError<Self::Error>>> {
        self.compensate(ctx, compensation)
            .await
            .map_err(|error| {
                vec![CompensationError {
                    step: self.name().to_string(),
                    description: self.compensation_description(),
                    error,
                }]
            })
    }

    /// Whether this step has a real compensating action.
    ///
    /// Read-only steps that keep the default `compensate` should return
    /// `false`; sagas configured to require compensation reject them.
    fn is_compensable(&self) -> bool {
        true
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}
