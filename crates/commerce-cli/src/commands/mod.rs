mod list;
mod run;

use std::process::ExitCode;

use clap::Subcommand;

use crate::error::Result;

pub(crate) use run::RunArgs;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a workflow against a seeded in-memory store
    Run(RunArgs),
    /// List the workflows that can be run
    List,
}

impl Commands {
    pub(crate) async fn execute(self) -> Result<Outcome> {
        match self {
            Self::Run(args) => run::run(args).await,
            Self::List => {
                print!("{}", list::render());
                Ok(Outcome::Succeeded)
            }
        }
    }
}

/// How a command ended, as seen by the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Succeeded,
    /// Every completed step was undone; the run can be retried.
    FailedClean,
    /// Some effects could not be undone and need manual reconciliation.
    FailedDirty,
    /// Bad arguments, settings or input; nothing was executed.
    Unusable,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => ExitCode::SUCCESS,
            Outcome::FailedClean => ExitCode::from(1),
            Outcome::FailedDirty => ExitCode::from(2),
            Outcome::Unusable => ExitCode::from(3),
        }
    }
}
