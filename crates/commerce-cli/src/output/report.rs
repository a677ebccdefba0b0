use commerce_operations::OperationError;
use commerce_operations::workflows::WorkflowKind;
use commerce_saga::SagaAuditLog;

pub(crate) trait RunReport {
    fn format_success(&self, workflow: WorkflowKind, audit_log: &SagaAuditLog) -> String;
    fn format_failure(
        &self,
        workflow: WorkflowKind,
        audit_log: &SagaAuditLog,
        error: &OperationError,
    ) -> String;
}
