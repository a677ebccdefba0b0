use std::marker::PhantomData;

use async_trait::async_trait;
use commerce_core::{Carts, LineItems, Quotes, RecordId, Selection, UpdateRequest};
use commerce_saga::{SagaStep, StepResponse};
use serde_json::{Map, Value};
use tracing::debug;

use super::data::QuoteFlow;
use crate::OperationError;
use crate::context::CommerceContext;
use crate::steps::{BeforeImage, CreateRecordsStep, UpdateRecordsStep};
use crate::traits::DataAccessPort;

/// Reads the quote, checks its status and resolves its cart.
pub struct LoadQuoteStep<Q, C, L> {
    allowed: Vec<&'static str>,
    _marker: PhantomData<fn() -> (Q, C, L)>,
}

impl<Q, C, L> LoadQuoteStep<Q, C, L> {
    #[must_use]
    pub fn new(allowed: Vec<&'static str>) -> Self {
        Self {
            allowed,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<Q, C, L> SagaStep for LoadQuoteStep<Q, C, L>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    type Input = QuoteFlow;
    type Output = QuoteFlow;
    type Compensation = ();
    type Context = CommerceContext<Q, C, L>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        "load-quote"
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        let selection = Selection::new().with_field("status").with_field("cart_id");
        let quote = ctx
            .quotes()
            .list(std::slice::from_ref(&input.quote_id), &selection)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OperationError::QuoteNotFound(input.quote_id.clone()))?;

        let status = quote.get_str("status").unwrap_or_default();
        if !self.allowed.iter().any(|allowed| *allowed == status) {
            return Err(OperationError::InvalidQuoteStatus {
                id: input.quote_id.clone(),
                status: status.to_string(),
                expected: self.allowed.clone(),
            });
        }

        let cart_id = quote
            .get_str("cart_id")
            .map(RecordId::from)
            .ok_or_else(|| OperationError::MissingCart(input.quote_id.clone()))?;
        debug!(quote = %input.quote_id, cart = %cart_id, status, "loaded quote");

        input.cart_id = Some(cart_id);
        Ok(StepResponse::without_compensation(input))
    }

    fn is_compensable(&self) -> bool {
        false
    }

    fn compensation_description(&self) -> String {
        "nothing to undo, quote was only read".to_string()
    }
}

fn cart_of(input: &QuoteFlow) -> Result<RecordId, OperationError> {
    input
        .cart_id
        .clone()
        .ok_or_else(|| OperationError::MissingCart(input.quote_id.clone()))
}

/// Moves the quote to a new status.
pub struct SetQuoteStatusStep<Q, C, L> {
    status: &'static str,
    update: UpdateRecordsStep<Quotes, CommerceContext<Q, C, L>>,
}

impl<Q, C, L> SetQuoteStatusStep<Q, C, L> {
    #[must_use]
    pub fn new(status: &'static str) -> Self {
        Self {
            status,
            update: UpdateRecordsStep::new("update-quote-status"),
        }
    }
}

#[async_trait]
impl<Q, C, L> SagaStep for SetQuoteStatusStep<Q, C, L>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    type Input = QuoteFlow;
    type Output = QuoteFlow;
    type Compensation = BeforeImage;
    type Context = CommerceContext<Q, C, L>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        self.update.name()
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        let update = UpdateRequest::new(input.quote_id.clone()).set("status", self.status);
        let response = self.update.execute(ctx, vec![update]).await?;
        Ok(response.map_output(|updated| {
            input.quote = updated.into_iter().next();
            input
        }))
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        image: Self::Compensation,
    ) -> Result<(), Self::Error> {
        self.update.compensate(ctx, image).await
    }

    fn compensation_description(&self) -> String {
        "restore previous quote status".to_string()
    }
}

/// Locks or releases the quote's cart through its `metadata.locked` flag.
///
/// Other metadata keys are carried over unchanged.
pub struct SetCartLockStep<Q, C, L> {
    locked: bool,
    update: UpdateRecordsStep<Carts, CommerceContext<Q, C, L>>,
}

impl<Q, C, L> SetCartLockStep<Q, C, L> {
    #[must_use]
    pub fn lock() -> Self {
        Self {
            locked: true,
            update: UpdateRecordsStep::new("lock-cart"),
        }
    }

    #[must_use]
    pub fn release() -> Self {
        Self {
            locked: false,
            update: UpdateRecordsStep::new("release-cart"),
        }
    }
}

#[async_trait]
impl<Q, C, L> SagaStep for SetCartLockStep<Q, C, L>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    type Input = QuoteFlow;
    type Output = QuoteFlow;
    type Compensation = BeforeImage;
    type Context = CommerceContext<Q, C, L>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        self.update.name()
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        let cart_id = cart_of(&input)?;
        let cart = ctx
            .carts()
            .list(
                std::slice::from_ref(&cart_id),
                &Selection::new().with_relation("metadata"),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OperationError::CartNotFound(cart_id.clone()))?;

        let mut metadata: Map<String, Value> = cart
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        metadata.insert("locked".to_string(), Value::Bool(self.locked));

        let update = UpdateRequest::new(cart_id).set("metadata", Value::Object(metadata));
        let response = self.update.execute(ctx, vec![update]).await?;
        Ok(response.map_output(|updated| {
            input.cart = updated.into_iter().next();
            input
        }))
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        image: Self::Compensation,
    ) -> Result<(), Self::Error> {
        self.update.compensate(ctx, image).await
    }

    fn compensation_description(&self) -> String {
        "restore previous cart metadata".to_string()
    }
}

/// Creates the requested line items on the quote's cart.
pub struct CreateLineItemsStep<Q, C, L> {
    create: CreateRecordsStep<LineItems, CommerceContext<Q, C, L>>,
}

impl<Q, C, L> CreateLineItemsStep<Q, C, L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            create: CreateRecordsStep::new("create-line-items"),
        }
    }
}

impl<Q, C, L> Default for CreateLineItemsStep<Q, C, L> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Q, C, L> SagaStep for CreateLineItemsStep<Q, C, L>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    type Input = QuoteFlow;
    type Output = QuoteFlow;
    type Compensation = Vec<RecordId>;
    type Context = CommerceContext<Q, C, L>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        self.create.name()
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        let cart_id = cart_of(&input)?;
        let items = input
            .items
            .iter()
            .cloned()
            .map(|item| item.with_field("cart_id", cart_id.as_str()))
            .collect();
        let response = self.create.execute(ctx, items).await?;
        Ok(response.map_output(|created| {
            input.created_items = created;
            input
        }))
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        ids: Self::Compensation,
    ) -> Result<(), Self::Error> {
        self.create.compensate(ctx, ids).await
    }

    fn compensation_description(&self) -> String {
        self.create.compensation_description()
    }
}

/// Adds the newly created line items to the cart's `item_count`.
pub struct UpdateItemCountStep<Q, C, L> {
    update: UpdateRecordsStep<Carts, CommerceContext<Q, C, L>>,
}

impl<Q, C, L> UpdateItemCountStep<Q, C, L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            update: UpdateRecordsStep::new("update-item-count"),
        }
    }
}

impl<Q, C, L> Default for UpdateItemCountStep<Q, C, L> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Q, C, L> SagaStep for UpdateItemCountStep<Q, C, L>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    type Input = QuoteFlow;
    type Output = QuoteFlow;
    type Compensation = BeforeImage;
    type Context = CommerceContext<Q, C, L>;
    type Error = OperationError;

    fn name(&self) -> &'static str {
        self.update.name()
    }

    async fn execute(
        &self,
        ctx: &Self::Context,
        mut input: Self::Input,
    ) -> Result<StepResponse<Self::Output, Self::Compensation>, Self::Error> {
        if input.created_items.is_empty() {
            return Ok(StepResponse::without_compensation(input));
        }

        let cart_id = cart_of(&input)?;
        let cart = ctx
            .carts()
            .list(
                std::slice::from_ref(&cart_id),
                &Selection::new().with_field("item_count"),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OperationError::CartNotFound(cart_id.clone()))?;

        let current = cart.get("item_count").and_then(Value::as_u64).unwrap_or(0);
        let added = u64::try_from(input.created_items.len()).unwrap_or(u64::MAX);
        let count = current
            .checked_add(added)
            .ok_or_else(|| OperationError::ItemCountOverflow {
                id: cart_id.clone(),
                current,
                added,
            })?;
        let update = UpdateRequest::new(cart_id).set("item_count", count);

        let response = self.update.execute(ctx, vec![update]).await?;
        Ok(response.map_output(|updated| {
            input.cart = updated.into_iter().next();
            input
        }))
    }

    async fn compensate(
        &self,
        ctx: &Self::Context,
        image: Self::Compensation,
    ) -> Result<(), Self::Error> {
        self.update.compensate(ctx, image).await
    }

    fn compensation_description(&self) -> String {
        "restore previous cart item count".to_string()
    }
}
