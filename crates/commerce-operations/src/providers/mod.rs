mod memory;

pub use memory::{InMemoryContext, InMemoryStore, Seed};
