use std::marker::PhantomData;

use async_trait::async_trait;
use commerce_core::{NewRecord, Record, RecordId, Resource};
use commerce_saga::{SagaStep, StepResponse};
use tracing::debug;

use crate::OperationError;
use crate::traits::{DataAccessPort, HasPort};

/// Creates records of resource `R` and deletes them on unwind.
pub struct CreateRecordsStep<R, Ctx> {
    name: &'static str,
    _marker: PhantomData<fn() -> (R, Ctx)>,
}

impl<R, Ctx> CreateRecordsStep<R, Ctx> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<R, Ctx> SagaStep for CreateRecordsStep<R, Ctx>
where
    R: Resource,
    Ctx: HasPort<R> + 'static,
{
    type Input = Vec<NewRecord>;
    type Output = Vec<Record>;
    type Compensation = Vec<RecordId>;
    type Context = Ctx;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        records: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        if records.is_empty() {
            return Ok(StepResponse::without_compensation(Vec::new()));
        }

        let created = ctx.port().create(records).await?;
        let ids = created.iter().map(|record| record.id.clone()).collect();
        debug!(
            step = self.name,
            resource = R::NAME,
            count = created.len(),
            "created records"
        );
        Ok(StepResponse::new(created, ids))
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        ids: Self::Compensation,
    ) -> Result<(), Self::Error> {
        debug!(
            step = self.name,
            resource = R::NAME,
            count = ids.len(),
            "deleting created records"
        );
        ctx.port().delete(&ids).await
    }

    fn compensation_description(&self) -> String {
        format!("delete created {}", R::NAME)
    }
}
