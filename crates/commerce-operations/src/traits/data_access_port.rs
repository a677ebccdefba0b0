use async_trait::async_trait;
use commerce_core::{NewRecord, Record, RecordId, Resource, Selection, UpdateRequest};
use tracing::warn;

use crate::{OperationError, Result};

/// Reads and writes records of one resource kind.
///
/// Ports are shared by every concurrent workflow execution, so
/// implementations must tolerate concurrent calls. Each call is atomic
/// for its whole batch: a failed call leaves the store as it was.
#[async_trait]
pub trait DataAccessPort<R: Resource>: Send + Sync {
    /// Lists the records with the given ids, restricted to `selection`.
    /// Ids with no record are left out of the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn list(&self, ids: &[RecordId], selection: &Selection) -> Result<Vec<Record>>;

    /// Applies partial updates by id and returns the full updated records.
    ///
    /// # Errors
    ///
    /// Returns an error if any targeted record is missing or the store
    /// cannot be written.
    async fn update(&self, updates: Vec<UpdateRequest>) -> Result<Vec<Record>>;

    /// Creates records, assigning ids where none are given.
    ///
    /// # Errors
    ///
    /// Returns an error if an id is already taken or the store cannot be
    /// written.
    async fn create(&self, records: Vec<NewRecord>) -> Result<Vec<Record>>;

    /// Deletes the records with the given ids. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn delete(&self, ids: &[RecordId]) -> Result<()>;

    /// Updates records and also returns their state before the update,
    /// restricted to `selection`.
    ///
    /// If the update fails, the before-image is written back so a port
    /// that applied part of the batch leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns the update error, or `RestoreFailed` if the before-image
    /// could not be written back.
    async fn update_capturing_previous(
        &self,
        updates: Vec<UpdateRequest>,
        selection: &Selection,
    ) -> Result<(Vec<Record>, Vec<Record>)> {
        let ids: Vec<RecordId> = updates.iter().map(|u| u.id.clone()).collect();
        let before = self.list(&ids, selection).await?;

        match self.update(updates).await {
            Ok(updated) => Ok((updated, before)),
            Err(update) => {
                let restore: Vec<UpdateRequest> = before
                    .iter()
                    .map(|record| record.to_update_request(selection))
                    .collect();
                if restore.is_empty() {
                    return Err(update);
                }
                match self.update(restore).await {
                    Ok(_) => Err(update),
                    Err(restore) => {
                        warn!(
                            resource = R::NAME,
                            error = %restore,
                            "could not restore batch after failed update"
                        );
                        Err(OperationError::RestoreFailed {
                            resource: R::NAME,
                            update: Box::new(update),
                            restore: Box::new(restore),
                        })
                    }
                }
            }
        }
    }
}

/// Gives steps typed access to the port for resource `R`.
pub trait HasPort<R: Resource>: Send + Sync {
    type Port: DataAccessPort<R>;

    fn port(&self) -> &Self::Port;
}
