//! Quote workflows and the runner that executes them by name.

mod data;
mod definitions;
mod steps;

use std::fmt;

use clap::ValueEnum;
use commerce_core::{Carts, LineItems, Quotes, UpdateRequest};
use commerce_saga::{ExecutionOptions, Saga, SagaAuditLog};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

pub use data::{QuoteFlow, QuoteRequest, Rejector, status};
pub use definitions::{
    QuoteSaga, add_line_items, reject_quote, send_quote, send_quote_with_items, update_quotes,
};
pub use steps::{
    CreateLineItemsStep, LoadQuoteStep, SetCartLockStep, SetQuoteStatusStep, UpdateItemCountStep,
};

use crate::context::CommerceContext;
use crate::settings::WorkflowSettings;
use crate::traits::DataAccessPort;
use crate::{OperationError, Result};

/// Workflows that can be run by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum WorkflowKind {
    /// Bulk-update quotes. Input: a list of update requests.
    UpdateQuotes,
    /// Reject a quote and release its cart. Input: a quote request.
    RejectQuote,
    /// Send a quote to the customer and lock its cart.
    SendQuote,
    /// Add line items to a quote's cart.
    AddLineItems,
    /// Add line items, then send the quote.
    SendQuoteWithItems,
}

impl WorkflowKind {
    /// Name used on the command line and in the settings file.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UpdateQuotes => "update-quotes",
            Self::RejectQuote => "reject-quote",
            Self::SendQuote => "send-quote",
            Self::AddLineItems => "add-line-items",
            Self::SendQuoteWithItems => "send-quote-with-items",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one workflow execution.
#[derive(Debug)]
pub struct WorkflowRun {
    /// The workflow's serialized output, or why it failed.
    pub result: Result<Value>,
    pub audit_log: SagaAuditLog,
}

impl WorkflowRun {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Parses `input`, builds the workflow with its effective settings and
/// executes it against `ctx`.
///
/// # Errors
///
/// Returns an error if the input does not match the workflow or the
/// settings reject it. Execution failures are reported in
/// [`WorkflowRun::result`] alongside the audit log.
pub async fn run_workflow<Q, C, L>(
    kind: WorkflowKind,
    ctx: &CommerceContext<Q, C, L>,
    input: Value,
    settings: &WorkflowSettings,
    options: ExecutionOptions,
) -> Result<WorkflowRun>
where
    Q: DataAccessPort<Quotes> + 'static,
    C: DataAccessPort<Carts> + 'static,
    L: DataAccessPort<LineItems> + 'static,
{
    let config = settings.for_workflow(kind.name());
    info!(workflow = %kind, "starting workflow");

    let run = match kind {
        WorkflowKind::UpdateQuotes => {
            let updates: Vec<UpdateRequest> = parse_input(kind, input)?;
            let saga = update_quotes(config)?;
            execute(kind, &saga, ctx, updates, options).await
        }
        WorkflowKind::RejectQuote => {
            let request: QuoteRequest = parse_input(kind, input)?;
            let saga = reject_quote(request.rejected_by, config)?;
            execute(kind, &saga, ctx, request.into(), options).await
        }
        WorkflowKind::SendQuote => {
            let request: QuoteRequest = parse_input(kind, input)?;
            let saga = send_quote(config)?;
            execute(kind, &saga, ctx, request.into(), options).await
        }
        WorkflowKind::AddLineItems => {
            let request: QuoteRequest = parse_input(kind, input)?;
            let saga = add_line_items(config)?;
            execute(kind, &saga, ctx, request.into(), options).await
        }
        WorkflowKind::SendQuoteWithItems => {
            let request: QuoteRequest = parse_input(kind, input)?;
            let saga = send_quote_with_items(config)?;
            execute(kind, &saga, ctx, request.into(), options).await
        }
    };

    match &run.result {
        Ok(_) => info!(workflow = %kind, "workflow completed"),
        Err(e) => warn!(
            workflow = %kind,
            dirty = e.is_dirty(),
            error = %e,
            "workflow failed"
        ),
    }
    Ok(run)
}

fn parse_input<T: DeserializeOwned>(kind: WorkflowKind, input: Value) -> Result<T> {
    serde_json::from_value(input).map_err(|source| OperationError::InvalidInput {
        workflow: kind.name(),
        source,
    })
}

async fn execute<I, O, Ctx>(
    kind: WorkflowKind,
    saga: &Saga<I, O, Ctx, OperationError>,
    ctx: &Ctx,
    input: I,
    options: ExecutionOptions,
) -> WorkflowRun
where
    I: Send + 'static,
    O: Serialize + Send + 'static,
{
    let (result, audit_log) = saga.execute_with_audit(ctx, input, options).await;
    let result = result
        .map_err(OperationError::from)
        .and_then(|output| {
            serde_json::to_value(output).map_err(|source| OperationError::OutputSerialize {
                workflow: kind.name(),
                source,
            })
        });
    WorkflowRun { result, audit_log }
}
