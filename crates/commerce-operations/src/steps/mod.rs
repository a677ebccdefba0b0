//! Reusable compensating steps over data access ports.

mod create_records;
mod update_records;

pub use create_records::CreateRecordsStep;
pub use update_records::{BeforeImage, UpdateRecordsStep};
