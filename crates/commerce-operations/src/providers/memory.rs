use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use commerce_core::{
    Carts, DataAccessError, LineItems, NewRecord, Quotes, Record, RecordId, Resource, Selection,
    UpdateRequest,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::context::CommerceContext;
use crate::traits::DataAccessPort;
use crate::{OperationError, Result};

/// Process-local store for one resource kind.
///
/// Every write takes the table lock for its whole batch and validates the
/// batch before changing anything, so a failed call writes nothing.
pub struct InMemoryStore<R> {
    records: RwLock<IndexMap<RecordId, Record>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> InMemoryStore<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
            _resource: PhantomData,
        }
    }

    /// Every record, in insertion order.
    pub async fn all(&self) -> Vec<Record> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: &RecordId) -> Option<Record> {
        self.records.read().await.get(id).cloned()
    }
}

impl<R: Resource> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn next_free_id<R: Resource>(
    records: &IndexMap<RecordId, Record>,
    taken: &HashSet<RecordId>,
) -> RecordId {
    let mut n = records.len() + 1;
    loop {
        let id = RecordId::new(format!("{}_{n}", R::ID_PREFIX));
        if !records.contains_key(&id) && !taken.contains(&id) {
            return id;
        }
        n += 1;
    }
}

#[async_trait]
impl<R: Resource> DataAccessPort<R> for InMemoryStore<R> {
    async fn list(&self, ids: &[RecordId], selection: &Selection) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id))
            .map(|record| record.select(selection))
            .collect())
    }

    async fn update(&self, updates: Vec<UpdateRequest>) -> Result<Vec<Record>> {
        let mut records = self.records.write().await;

        let missing: Vec<RecordId> = updates
            .iter()
            .filter(|update| !records.contains_key(&update.id))
            .map(|update| update.id.clone())
            .collect();
        if !missing.is_empty() {
            return Err(DataAccessError::NotFound {
                resource: R::NAME,
                ids: missing,
            }
            .into());
        }

        let mut updated = Vec::with_capacity(updates.len());
        for update in &updates {
            if let Some(record) = records.get_mut(&update.id) {
                record.apply(update);
                updated.push(record.clone());
            }
        }
        debug!(resource = R::NAME, count = updated.len(), "updated records");
        Ok(updated)
    }

    async fn create(&self, new_records: Vec<NewRecord>) -> Result<Vec<Record>> {
        let mut records = self.records.write().await;

        let mut taken = HashSet::new();
        for id in new_records.iter().filter_map(|r| r.id.as_ref()) {
            if records.contains_key(id) || !taken.insert(id.clone()) {
                return Err(DataAccessError::AlreadyExists {
                    resource: R::NAME,
                    id: id.clone(),
                }
                .into());
            }
        }

        let mut created = Vec::with_capacity(new_records.len());
        for new_record in new_records {
            let id = match new_record.id.clone() {
                Some(id) => id,
                None => {
                    let id = next_free_id::<R>(&records, &taken);
                    taken.insert(id.clone());
                    id
                }
            };
            let record = new_record.into_record(id.clone());
            records.insert(id, record.clone());
            created.push(record);
        }
        debug!(resource = R::NAME, count = created.len(), "created records");
        Ok(created)
    }

    async fn delete(&self, ids: &[RecordId]) -> Result<()> {
        let mut records = self.records.write().await;
        let removed = ids
            .iter()
            .filter(|id| records.shift_remove(*id).is_some())
            .count();
        debug!(resource = R::NAME, count = removed, "deleted records");
        Ok(())
    }
}

/// Initial and dumped contents of the in-memory stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub quotes: Vec<Record>,
    pub carts: Vec<Record>,
    pub line_items: Vec<Record>,
}

impl Seed {
    /// Parses a seed document such as
    /// `{"quotes": [{"id": "quote_1", "status": "pending_merchant"}]}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid seed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| OperationError::DataAccess(e.into()))
    }
}

/// A context whose ports are all in-memory stores.
pub type InMemoryContext =
    CommerceContext<InMemoryStore<Quotes>, InMemoryStore<Carts>, InMemoryStore<LineItems>>;

impl InMemoryContext {
    #[must_use]
    pub fn from_seed(seed: Seed) -> Self {
        Self::new(
            Arc::new(InMemoryStore::with_records(seed.quotes)),
            Arc::new(InMemoryStore::with_records(seed.carts)),
            Arc::new(InMemoryStore::with_records(seed.line_items)),
        )
    }

    /// Current contents of every store.
    pub async fn snapshot(&self) -> Seed {
        Seed {
            quotes: self.quotes().all().await,
            carts: self.carts().all().await,
            line_items: self.line_items().all().await,
        }
    }
}
