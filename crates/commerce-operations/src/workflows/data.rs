use commerce_core::{NewRecord, Record, RecordId};
use serde::{Deserialize, Serialize};

/// Quote lifecycle statuses.
pub mod status {
    pub const PENDING_MERCHANT: &str = "pending_merchant";
    pub const PENDING_CUSTOMER: &str = "pending_customer";
    pub const CUSTOMER_REJECTED: &str = "customer_rejected";
    pub const MERCHANT_REJECTED: &str = "merchant_rejected";
}

/// Who turned a quote down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rejector {
    #[default]
    Customer,
    Merchant,
}

impl Rejector {
    /// Status the quote must be in for this party to reject it.
    #[must_use]
    pub fn awaiting(self) -> &'static str {
        match self {
            Self::Customer => status::PENDING_CUSTOMER,
            Self::Merchant => status::PENDING_MERCHANT,
        }
    }

    #[must_use]
    pub fn rejected_status(self) -> &'static str {
        match self {
            Self::Customer => status::CUSTOMER_REJECTED,
            Self::Merchant => status::MERCHANT_REJECTED,
        }
    }
}

/// Caller input for the quote workflows.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub quote_id: RecordId,
    #[serde(default)]
    pub items: Vec<NewRecord>,
    #[serde(default)]
    pub rejected_by: Rejector,
}

/// State passed from step to step through a quote workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteFlow {
    pub quote_id: RecordId,
    /// Line items to add to the quote's cart.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<NewRecord>,
    pub cart_id: Option<RecordId>,
    /// The quote as last written by the workflow.
    pub quote: Option<Record>,
    /// The cart as last written by the workflow.
    pub cart: Option<Record>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_items: Vec<Record>,
}

impl QuoteFlow {
    pub fn new(quote_id: impl Into<RecordId>) -> Self {
        Self {
            quote_id: quote_id.into(),
            items: Vec::new(),
            cart_id: None,
            quote: None,
            cart: None,
            created_items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: Vec<NewRecord>) -> Self {
        self.items = items;
        self
    }
}

impl From<QuoteRequest> for QuoteFlow {
    fn from(request: QuoteRequest) -> Self {
        Self::new(request.quote_id).with_items(request.items)
    }
}
