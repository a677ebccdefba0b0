use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use commerce_core::{
    Carts, DataAccessError, LineItems, NewRecord, Quotes, Record, RecordId, Resource, Selection,
    UpdateRequest,
};

use crate::Result;
use crate::context::CommerceContext;
use crate::providers::InMemoryStore;
use crate::traits::DataAccessPort;

#[derive(Debug, Clone, Copy)]
struct FailingUpdate {
    call: usize,
    applied: usize,
}

/// In-memory store that fails on demand and counts its writes.
pub struct FlakyStore<R> {
    inner: InMemoryStore<R>,
    failing_updates: Vec<FailingUpdate>,
    fail_deletes: bool,
    update_calls: AtomicUsize,
    writes: AtomicUsize,
}

impl<R: Resource> FlakyStore<R> {
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            inner: InMemoryStore::with_records(records),
            failing_updates: Vec::new(),
            fail_deletes: false,
            update_calls: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make the given 1-based update call apply its first `applied`
    /// requests and then fail.
    #[must_use]
    pub fn failing_update(mut self, call: usize, applied: usize) -> Self {
        self.failing_updates.push(FailingUpdate { call, applied });
        self
    }

    #[must_use]
    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn all(&self) -> Vec<Record> {
        self.inner.all().await
    }

    pub async fn get(&self, id: &str) -> Option<Record> {
        self.inner.get(&RecordId::from(id)).await
    }

    fn unavailable() -> crate::OperationError {
        DataAccessError::Unavailable {
            resource: R::NAME,
            reason: "injected failure".to_string(),
        }
        .into()
    }
}

#[async_trait]
impl<R: Resource> DataAccessPort<R> for FlakyStore<R> {
    async fn list(&self, ids: &[RecordId], selection: &Selection) -> Result<Vec<Record>> {
        self.inner.list(ids, selection).await
    }

    async fn update(&self, updates: Vec<UpdateRequest>) -> Result<Vec<Record>> {
        let call = self.update_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(failing) = self.failing_updates.iter().find(|f| f.call == call) {
            let applied: Vec<UpdateRequest> = updates.into_iter().take(failing.applied).collect();
            if !applied.is_empty() {
                self.writes.fetch_add(1, Ordering::SeqCst);
                self.inner.update(applied).await?;
            }
            return Err(Self::unavailable());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(updates).await
    }

    async fn create(&self, records: Vec<NewRecord>) -> Result<Vec<Record>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(records).await
    }

    async fn delete(&self, ids: &[RecordId]) -> Result<()> {
        if self.fail_deletes {
            return Err(Self::unavailable());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(ids).await
    }
}

pub type FlakyContext = CommerceContext<FlakyStore<Quotes>, FlakyStore<Carts>, FlakyStore<LineItems>>;

/// A quote awaiting the merchant, its draft cart and no line items.
pub fn quote_with_cart() -> (Vec<Record>, Vec<Record>) {
    let quotes = vec![
        Record::new("quote_1")
            .with_field("status", "pending_merchant")
            .with_field("cart_id", "cart_1"),
    ];
    let carts = vec![
        Record::new("cart_1")
            .with_field("item_count", 0)
            .with_field("metadata", serde_json::json!({ "locked": false, "channel": "b2b" })),
    ];
    (quotes, carts)
}

pub fn flaky_context(
    quotes: FlakyStore<Quotes>,
    carts: FlakyStore<Carts>,
    line_items: FlakyStore<LineItems>,
) -> FlakyContext {
    CommerceContext::new(Arc::new(quotes), Arc::new(carts), Arc::new(line_items))
}
