use tracing::{debug, warn};

use crate::audit::SagaAuditLog;
use crate::error::CompensationError;
use crate::record::CompensationStack;

/// Result of replaying a compensation stack.
#[derive(Debug)]
pub enum UnwindOutcome<E> {
    /// Every record was compensated.
    Clean,
    /// These compensations failed; their steps' effects are still in place.
    Dirty(Vec<CompensationError<E>>),
}

impl<E> UnwindOutcome<E> {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

impl<Ctx, Err> CompensationStack<Ctx, Err> {
    /// Compensate every recorded step, last-completed first.
    ///
    /// A failing compensation does not stop the pass; earlier records are
    /// still compensated and the failure is returned in the outcome.
    pub async fn unwind(self, ctx: &Ctx) -> UnwindOutcome<Err> {
        unwind(ctx, self, None).await
    }
}

pub(crate) async fn unwind<Ctx, Err>(
    ctx: &Ctx,
    stack: CompensationStack<Ctx, Err>,
    mut audit_log: Option<&mut SagaAuditLog>,
) -> UnwindOutcome<Err> {
    let mut compensation_errors = Vec::new();

    for record in stack.records.into_iter().rev() {
        let Some(compensator) = record.compensator else {
            // Skipped and read-only steps keep their forward status.
            debug!(step = record.step, "nothing to undo");
            continue;
        };

        debug!(step = record.step, description = %record.description, "compensating step");
        match compensator.compensate(ctx).await {
            Ok(()) => {
                if let Some(log) = audit_log.as_deref_mut() {
                    log.step_compensated(record.step);
                }
            }
            Err(errors) => {
                let unrecoverable: Vec<&str> = errors.iter().map(|e| e.step.as_str()).collect();
                warn!(
                    step = record.step,
                    description = %record.description,
                    ?unrecoverable,
                    "compensation failed, continuing unwind"
                );
                if let Some(log) = audit_log.as_deref_mut() {
                    log.compensation_failed(record.step);
                }
                compensation_errors.extend(errors);
            }
        }
    }

    if compensation_errors.is_empty() {
        UnwindOutcome::Clean
    } else {
        UnwindOutcome::Dirty(compensation_errors)
    }
}
