use indexmap::IndexSet;
use serde_json::Value;

use crate::record::UpdateRequest;

/// Which fields and relations of a record to read.
///
/// An empty selection means the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    fields: IndexSet<String>,
    relations: IndexSet<String>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into());
        self
    }

    #[must_use]
    pub fn with_relation(mut self, name: impl Into<String>) -> Self {
        self.relations.insert(name.into());
        self
    }

    /// Derive the selection an update batch touches.
    ///
    /// Scalar values become fields; objects and arrays of objects become
    /// relations. A key is selected if any update in the batch names it;
    /// unset keys are selected as fields.
    #[must_use]
    pub fn from_updates(updates: &[UpdateRequest]) -> Self {
        let mut selection = Self::default();
        for update in updates {
            for (name, value) in &update.changes {
                if selection.contains(name) {
                    continue;
                }
                if is_relation(value) {
                    selection.relations.insert(name.clone());
                } else {
                    selection.fields.insert(name.clone());
                }
            }
            for name in &update.unset {
                if !selection.contains(name) {
                    selection.fields.insert(name.clone());
                }
            }
        }
        selection
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.relations.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains(name) || self.relations.contains(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.relations.iter().map(String::as_str)
    }

    /// Fields first, then relations.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields().chain(self.relations())
    }
}

fn is_relation(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
        _ => false,
    }
}
