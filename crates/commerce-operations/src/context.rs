use std::sync::Arc;

use commerce_core::{Carts, LineItems, Quotes};

use crate::traits::{DataAccessPort, HasPort};

/// Ports a commerce workflow execution works through.
///
/// Ports are resolved once when the context is built and shared by every
/// execution that uses it.
pub struct CommerceContext<Q, C, L> {
    quotes: Arc<Q>,
    carts: Arc<C>,
    line_items: Arc<L>,
}

impl<Q, C, L> Clone for CommerceContext<Q, C, L> {
    fn clone(&self) -> Self {
        Self {
            quotes: Arc::clone(&self.quotes),
            carts: Arc::clone(&self.carts),
            line_items: Arc::clone(&self.line_items),
        }
    }
}

impl<Q, C, L> CommerceContext<Q, C, L>
where
    Q: DataAccessPort<Quotes>,
    C: DataAccessPort<Carts>,
    L: DataAccessPort<LineItems>,
{
    pub fn new(quotes: Arc<Q>, carts: Arc<C>, line_items: Arc<L>) -> Self {
        Self {
            quotes,
            carts,
            line_items,
        }
    }

    #[must_use]
    pub fn quotes(&self) -> &Q {
        &self.quotes
    }

    #[must_use]
    pub fn carts(&self) -> &C {
        &self.carts
    }

    #[must_use]
    pub fn line_items(&self) -> &L {
        &self.line_items
    }
}

impl<Q, C, L> HasPort<Quotes> for CommerceContext<Q, C, L>
where
    Q: DataAccessPort<Quotes>,
    C: DataAccessPort<Carts>,
    L: DataAccessPort<LineItems>,
{
    type Port = Q;

    fn port(&self) -> &Q {
        self.quotes()
    }
}

impl<Q, C, L> HasPort<Carts> for CommerceContext<Q, C, L>
where
    Q: DataAccessPort<Quotes>,
    C: DataAccessPort<Carts>,
    L: DataAccessPort<LineItems>,
{
    type Port = C;

    fn port(&self) -> &C {
        self.carts()
    }
}

impl<Q, C, L> HasPort<LineItems> for CommerceContext<Q, C, L>
where
    Q: DataAccessPort<Quotes>,
    C: DataAccessPort<Carts>,
    L: DataAccessPort<LineItems>,
{
    type Port = L;

    fn port(&self) -> &L {
        self.line_items()
    }
}
