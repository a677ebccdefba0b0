use std::marker::PhantomData;

use async_trait::async_trait;
use commerce_core::{Record, Resource, Selection, UpdateRequest};
use commerce_saga::{SagaStep, StepResponse};
use tracing::debug;

use crate::OperationError;
use crate::traits::{DataAccessPort, HasPort};

/// State of updated records before the update, as compensation data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeImage {
    /// Records restricted to `selection`, read before the update.
    pub records: Vec<Record>,
    /// Fields and relations the update touched.
    pub selection: Selection,
}

impl BeforeImage {
    /// Updates that put every captured record back to its before-state.
    #[must_use]
    pub fn restore_requests(&self) -> Vec<UpdateRequest> {
        self.records
            .iter()
            .map(|record| record.to_update_request(&self.selection))
            .collect()
    }
}

/// Bulk-updates records of resource `R` and restores them on unwind.
///
/// The forward action reads the before-image of every targeted record,
/// restricted to the keys the payload touches, then applies the payload.
pub struct UpdateRecordsStep<R, Ctx> {
    name: &'static str,
    _marker: PhantomData<fn() -> (R, Ctx)>,
}

impl<R, Ctx> UpdateRecordsStep<R, Ctx> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<R, Ctx> SagaStep for UpdateRecordsStep<R, Ctx>
where
    R: Resource,
    Ctx: HasPort<R> + 'static,
{
    type Input = Vec<UpdateRequest>;
    type Output = Vec<Record>;
    type Compensation = BeforeImage;
    type Context = Ctx;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        updates: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        if updates.is_empty() {
            debug!(step = self.name, resource = R::NAME, "no updates requested");
            return Ok(StepResponse::without_compensation(Vec::new()));
        }

        let selection = Selection::from_updates(&updates);
        let (updated, before) = ctx
            .port()
            .update_capturing_previous(updates, &selection)
            .await?;
        debug!(
            step = self.name,
            resource = R::NAME,
            updated = updated.len(),
            captured = before.len(),
            "updated records"
        );

        Ok(StepResponse::new(
            updated,
            BeforeImage {
                records: before,
                selection,
            },
        ))
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        image: Self::Compensation,
    ) -> Result<(), Self::Error> {
        if image.records.is_empty() {
            return Ok(());
        }
        debug!(
            step = self.name,
            resource = R::NAME,
            count = image.records.len(),
            "restoring records from before-image"
        );
        ctx.port().update(image.restore_requests()).await?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        format!("restore {} to their previous values", R::NAME)
    }
}
