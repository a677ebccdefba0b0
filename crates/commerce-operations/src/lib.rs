pub mod context;
mod error;
pub mod providers;
pub mod settings;
pub mod steps;
pub mod traits;
pub mod workflows;

#[cfg(test)]
pub mod mocks;

pub use context::CommerceContext;
pub use error::{CompensationFailure, OperationError, Result};
