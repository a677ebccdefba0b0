use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::SagaConfig;
use crate::erased::{ErasedStep, StepWrapper};
use crate::error::ConfigurationError;
use crate::saga::Saga;
use crate::step::SagaStep;

/// Type-state builder for constructing type-safe sagas.
///
/// A fresh builder is an identity saga over `Input`. Each call to
/// [`then`](Self::then) appends a step whose input type must equal the
/// current output type, so the compiler enforces that:
/// - Each step's input type matches the previous step's output type
/// - The saga's input type matches the first step's input
/// - The saga's output type matches the last step's output
///
/// # Compile-time Type Safety
///
/// Mismatched types will not compile:
///
/// ```compile_fail
/// use async_trait::async_trait;
/// use commerce_saga::{SagaBuilder, SagaStep, StepResponse};
///
/// struct StepA;
/// #[async_trait]
/// impl SagaStep for StepA {
///     type Input = i32;
///     type Output = String;  // Outputs String
///     type Compensation = ();
///     type Context = ();
///     type Error = ();
///     fn name(&self) -> &'static str { "a" }
///     async fn execute(&self, _: &(), input: i32) -> Result<StepResponse<String, ()>, ()> {
///         Ok(StepResponse::without_compensation(input.to_string()))
///     }
/// }
///
/// struct StepB;
/// #[async_trait]
/// impl SagaStep for StepB {
///     type Input = i32;  // Expects i32, not String!
///     type Output = i32;
///     type Compensation = ();
///     type Context = ();
///     type Error = ();
///     fn name(&self) -> &'static str { "b" }
///     async fn execute(&self, _: &(), input: i32) -> Result<StepResponse<i32, ()>, ()> {
///         Ok(StepResponse::without_compensation(input * 2))
///     }
/// }
///
/// // StepB expects i32 but StepA outputs String
/// let saga = SagaBuilder::new()
///     .then(StepA)
///     .then(StepB)  // Compile error here!
///     .build();
/// ```
///
/// Naming problems are caught by [`build`](Self::build), before any step
/// can run.
pub struct SagaBuilder<Input, Output, Ctx, Err> {
    steps: Vec<Arc<dyn ErasedStep<Ctx, Err>>>,
    config: SagaConfig,
    _phantom: PhantomData<fn(Input) -> Output>,
}

impl<Input, Ctx, Err> SagaBuilder<Input, Input, Ctx, Err> {
    /// Create a builder with no steps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            config: SagaConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl<Input, Ctx, Err> Default for SagaBuilder<Input, Input, Ctx, Err> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Input, CurrentOutput, Ctx, Err> SagaBuilder<Input, CurrentOutput, Ctx, Err> {
    /// Add another step to the saga.
    ///
    /// The step's input type must match the current output type.
    #[must_use]
    pub fn then<S>(self, step: S) -> SagaBuilder<Input, S::Output, Ctx, Err>
    where
        S: SagaStep<Input = CurrentOutput, Context = Ctx, Error = Err> + 'static,
    {
        let mut steps = self.steps;
        steps.push(Arc::new(StepWrapper::new(step)));
        SagaBuilder {
            steps,
            config: self.config,
            _phantom: PhantomData,
        }
    }

    /// Apply settings to the saga under construction.
    #[must_use]
    pub fn with_config(mut self, config: SagaConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the saga from the accumulated steps.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::DuplicateStepName` if two steps share a
    /// name, and `ConfigurationError::MissingCompensation` if the config
    /// requires compensation and a step declares none.
    pub fn build(self) -> Result<Saga<Input, CurrentOutput, Ctx, Err>, ConfigurationError> {
        validate(&self.steps, &self.config)?;
        Ok(Saga::from_parts(self.steps, self.config))
    }
}

fn validate<Ctx, Err>(
    steps: &[Arc<dyn ErasedStep<Ctx, Err>>],
    config: &SagaConfig,
) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.name()) {
            return Err(ConfigurationError::DuplicateStepName {
                step: step.name().to_string(),
            });
        }
        if config.require_compensation() && !step.is_compensable() {
            return Err(ConfigurationError::MissingCompensation {
                step: step.name().to_string(),
            });
        }
    }
    Ok(())
}
