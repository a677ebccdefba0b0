pub mod error;
pub mod record;
pub mod resource;
pub mod selection;

pub use error::*;
pub use record::{NewRecord, Record, RecordId, UpdateRequest};
pub use resource::{Carts, LineItems, Quotes, Resource};
pub use selection::Selection;
