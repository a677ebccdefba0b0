/// A named kind of stored record.
///
/// Implemented by zero-sized markers so data access ports and steps are
/// typed by the resource they work on.
pub trait Resource: Send + Sync + 'static {
    /// Resource name used in logs and errors.
    const NAME: &'static str;
    /// Prefix for ids assigned on create.
    const ID_PREFIX: &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Quotes;

impl Resource for Quotes {
    const NAME: &'static str = "quotes";
    const ID_PREFIX: &'static str = "quote";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Carts;

impl Resource for Carts {
    const NAME: &'static str = "carts";
    const ID_PREFIX: &'static str = "cart";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineItems;

impl Resource for LineItems {
    const NAME: &'static str = "line_items";
    const ID_PREFIX: &'static str = "item";
}
