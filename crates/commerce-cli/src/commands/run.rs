use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use commerce_operations::providers::{InMemoryContext, Seed};
use commerce_operations::settings::{SETTINGS_FILE, WorkflowSettings};
use commerce_operations::workflows::{WorkflowKind, run_workflow};
use commerce_saga::ExecutionOptions;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Outcome;
use crate::error::{CliError, Result};
use crate::output::{PlainTextReport, RunReport};

#[derive(Args)]
pub(crate) struct RunArgs {
    /// Workflow to run
    #[arg(value_enum)]
    workflow: WorkflowKind,

    /// JSON file with the initial quotes, carts and line items
    #[arg(long)]
    seed: PathBuf,

    /// JSON file with the workflow input
    #[arg(long)]
    input: PathBuf,

    /// Settings file (default: ./commerce.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Abort and roll back once the run takes longer than this
    #[arg(long = "timeout-ms", value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print the store contents after the run
    #[arg(long)]
    dump: bool,
}

pub(super) async fn run(args: RunArgs) -> Result<Outcome> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));
    let mut settings = WorkflowSettings::load(&config_path)?;
    if let Some(timeout_ms) = args.timeout_ms {
        settings = settings.with_timeout(Duration::from_millis(timeout_ms));
    }

    let seed = Seed::from_json(&read(&args.seed)?)?;
    let input: Value = serde_json::from_str(&read(&args.input)?).map_err(|source| {
        CliError::Json {
            path: args.input.clone(),
            source,
        }
    })?;

    let ctx = InMemoryContext::from_seed(seed);
    let token = CancellationToken::new();
    let _interrupt = tokio::spawn(cancel_on_interrupt(token.clone()));

    let run = run_workflow(
        args.workflow,
        &ctx,
        input,
        &settings,
        ExecutionOptions::new().with_cancellation(token),
    )
    .await?;

    let report = PlainTextReport;
    let outcome = match &run.result {
        Ok(output) => {
            print!("{}", report.format_success(args.workflow, &run.audit_log));
            println!("{}", render(output)?);
            Outcome::Succeeded
        }
        Err(e) => {
            print!("{}", report.format_failure(args.workflow, &run.audit_log, e));
            crate::print_error(e);
            if e.is_dirty() {
                Outcome::FailedDirty
            } else {
                Outcome::FailedClean
            }
        }
    };

    if args.dump {
        let state = serde_json::to_value(ctx.snapshot().await).map_err(CliError::Render)?;
        println!("{}", render(&state)?);
    }
    Ok(outcome)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn render(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(CliError::Render)
}

async fn cancel_on_interrupt(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        debug!("interrupt received, cancelling run");
        token.cancel();
    }
}
