use commerce_operations::OperationError;
use commerce_operations::workflows::WorkflowKind;
use commerce_saga::SagaAuditLog;

use super::RunReport;

pub(crate) struct PlainTextReport;

impl PlainTextReport {
    fn format_steps(output: &mut String, workflow: WorkflowKind, audit_log: &SagaAuditLog) {
        output.push_str(&format!("Workflow: {workflow}\n"));
        for line in audit_log.summary().lines() {
            output.push_str(&format!("  {line}\n"));
        }
    }
}

impl RunReport for PlainTextReport {
    fn format_success(&self, workflow: WorkflowKind, audit_log: &SagaAuditLog) -> String {
        let mut output = String::new();
        Self::format_steps(&mut output, workflow, audit_log);
        output
    }

    fn format_failure(
        &self,
        workflow: WorkflowKind,
        audit_log: &SagaAuditLog,
        error: &OperationError,
    ) -> String {
        let mut output = String::new();
        Self::format_steps(&mut output, workflow, audit_log);

        let unrecoverable = error.unrecoverable_steps();
        if unrecoverable.is_empty() {
            output.push_str("\nAll completed steps were rolled back; the run can be retried.\n");
        } else {
            output.push_str("\nManual reconciliation required for:\n");
            for step in unrecoverable {
                output.push_str(&format!("  {step}\n"));
            }
        }
        output
    }
}
