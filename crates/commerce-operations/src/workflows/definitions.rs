use commerce_core::{Carts, LineItems, Quotes, Record, UpdateRequest};
use commerce_saga::{Saga, SagaBuilder, SagaConfig};

use super::data::{QuoteFlow, Rejector, status};
use super::steps::{
    CreateLineItemsStep, LoadQuoteStep, SetCartLockStep, SetQuoteStatusStep, UpdateItemCountStep,
};
use crate::context::CommerceContext;
use crate::steps::UpdateRecordsStep;
use crate::traits::{DataAccessPort, HasPort};
use crate::{OperationError, Result};

/// A quote workflow over the given ports.
pub type QuoteSaga<Q, C, L> = Saga<QuoteFlow, QuoteFlow, CommerceContext<Q, C, L>, OperationError>;

/// Bulk-update quotes, restoring their previous values on failure.
///
/// # Errors
///
/// Returns an error if `config` rejects the workflow.
pub fn update_quotes<Ctx>(
    config: SagaConfig,
) -> Result<Saga<Vec<UpdateRequest>, Vec<Record>, Ctx, OperationError>>
where
    Ctx: HasPort<Quotes> + 'static,
{
    Ok(SagaBuilder::new()
        .then(UpdateRecordsStep::<Quotes, Ctx>::new("update-quotes"))
        .with_config(config)
        .build()?)
}

/// Reject a quote on behalf of `rejected_by` and release its cart.
///
/// # Errors
///
/// Returns an error if `config` rejects the workflow.
pub fn reject_quote<Q, C, L>(rejected_by: Rejector, config: SagaConfig) -> Result<QuoteSaga<Q, C, L>>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    Ok(SagaBuilder::new()
        .then(LoadQuoteStep::new(vec![rejected_by.awaiting()]))
        .then(SetQuoteStatusStep::new(rejected_by.rejected_status()))
        .then(SetCartLockStep::release())
        .with_config(config)
        .build()?)
}

/// Send a merchant-reviewed quote to the customer and lock its cart.
///
/// # Errors
///
/// Returns an error if `config` rejects the workflow.
pub fn send_quote<Q, C, L>(config: SagaConfig) -> Result<QuoteSaga<Q, C, L>>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    Ok(SagaBuilder::new()
        .then(LoadQuoteStep::new(vec![status::PENDING_MERCHANT]))
        .then(SetQuoteStatusStep::new(status::PENDING_CUSTOMER))
        .then(SetCartLockStep::lock())
        .with_config(config)
        .build()?)
}

/// Add line items to a quote's cart and bump the cart's item count.
///
/// # Errors
///
/// Returns an error if `config` rejects the workflow.
pub fn add_line_items<Q, C, L>(config: SagaConfig) -> Result<QuoteSaga<Q, C, L>>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    Ok(SagaBuilder::new()
        .then(LoadQuoteStep::new(vec![status::PENDING_MERCHANT]))
        .then(CreateLineItemsStep::new())
        .then(UpdateItemCountStep::new())
        .with_config(config)
        .build()?)
}

/// Add line items, then send the quote.
///
/// The item additions run as one nested step, so a failure while sending
/// removes the added items and restores the item count as a unit.
///
/// # Errors
///
/// Returns an error if `config` rejects the workflow.
pub fn send_quote_with_items<Q, C, L>(config: SagaConfig) -> Result<QuoteSaga<Q, C, L>>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    let items = add_line_items(config.clone())?.into_step("add-line-items");
    Ok(SagaBuilder::new()
        .then(items)
        .then(SetQuoteStatusStep::new(status::PENDING_CUSTOMER))
        .then(SetCartLockStep::lock())
        .with_config(config)
        .build()?)
}
