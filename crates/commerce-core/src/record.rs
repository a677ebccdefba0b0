use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::selection::Selection;

/// Identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A stored entity: an id plus named JSON values.
///
/// Scalar values are plain fields. Object values and arrays of objects are
/// relations and are read and written as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// A copy holding only the selected fields and relations.
    ///
    /// An empty selection keeps everything.
    #[must_use]
    pub fn select(&self, selection: &Selection) -> Self {
        if selection.is_empty() {
            return self.clone();
        }
        let fields = selection
            .keys()
            .filter_map(|key| {
                self.fields
                    .get(key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect();
        Self {
            id: self.id.clone(),
            fields,
        }
    }

    /// Apply an update in place: set every changed key, then remove every
    /// unset key. A `null` change is stored as `null`.
    pub fn apply(&mut self, update: &UpdateRequest) {
        for (name, value) in &update.changes {
            self.fields.insert(name.clone(), value.clone());
        }
        for name in &update.unset {
            self.fields.shift_remove(name);
        }
    }

    /// Build the update that puts the selected fields and relations back
    /// to the values held by this record.
    ///
    /// A selected key the record does not hold is unset, so the restore
    /// also removes values the forward update introduced.
    #[must_use]
    pub fn to_update_request(&self, selection: &Selection) -> UpdateRequest {
        if selection.is_empty() {
            return UpdateRequest {
                id: self.id.clone(),
                changes: self.fields.clone(),
                unset: IndexSet::new(),
            };
        }
        let mut restore = UpdateRequest::new(self.id.clone());
        for key in selection.keys() {
            match self.fields.get(key) {
                Some(value) => restore = restore.set(key, value.clone()),
                None => restore = restore.unset(key),
            }
        }
        restore
    }
}

/// Partial update of one record: only the named keys change.
///
/// In JSON the changes sit next to `id`; keys to remove are listed under
/// `$unset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub id: RecordId,
    #[serde(rename = "$unset", default, skip_serializing_if = "IndexSet::is_empty")]
    pub unset: IndexSet<String>,
    #[serde(flatten)]
    pub changes: IndexMap<String, Value>,
}

impl UpdateRequest {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            unset: IndexSet::new(),
            changes: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.unset.shift_remove(&name);
        self.changes.insert(name, value.into());
        self
    }

    /// Remove the field instead of setting it.
    #[must_use]
    pub fn unset(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.changes.shift_remove(&name);
        self.unset.insert(name);
        self
    }

    /// Every key this update touches, changed or unset.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes
            .keys()
            .chain(self.unset.iter())
            .map(String::as_str)
    }
}

/// A record to create. The store assigns an id when none is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

impl NewRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn quote() -> Record {
        Record::new("quote_1")
            .with_field("status", "pending_merchant")
            .with_field("cart_id", "cart_1")
            .with_field("metadata", json!({ "source": "storefront" }))
    }

    #[test]
    fn record_json_flattens_fields_next_to_id() -> anyhow::Result<()> {
        let record: Record = serde_json::from_value(json!({
            "id": "quote_1",
            "status": "pending_merchant",
            "cart_id": "cart_1"
        }))?;

        assert_eq!(record.id, RecordId::from("quote_1"));
        assert_eq!(record.get_str("status"), Some("pending_merchant"));
        assert!(!record.fields.contains_key("id"));
        Ok(())
    }

    #[test]
    fn select_keeps_only_selected_keys() {
        let update = UpdateRequest::new("quote_1").set("status", "accepted");
        let selection = Selection::from_updates(&[update]);

        let selected = quote().select(&selection);

        assert_eq!(selected.fields.len(), 1);
        assert_eq!(selected.get_str("status"), Some("pending_merchant"));
    }

    #[test]
    fn empty_selection_selects_everything() {
        assert_eq!(quote().select(&Selection::default()), quote());
    }

    #[test]
    fn apply_sets_and_removes_fields() {
        let mut record = quote();

        record.apply(
            &UpdateRequest::new("quote_1")
                .set("status", "accepted")
                .set("note", Value::Null)
                .unset("cart_id"),
        );

        assert_eq!(record.get_str("status"), Some("accepted"));
        assert_eq!(record.get("note"), Some(&Value::Null));
        assert!(record.get("cart_id").is_none());
        assert!(record.get("metadata").is_some());
    }

    #[test]
    fn update_request_from_before_image_restores_selected_keys() {
        let before = quote();
        let forward = UpdateRequest::new("quote_1")
            .set("status", "accepted")
            .set("metadata", json!({ "source": "admin" }))
            .set("note", "added later");
        let selection = Selection::from_updates(std::slice::from_ref(&forward));
        let image = before.select(&selection);

        let mut record = before.clone();
        record.apply(&forward);
        record.apply(&image.to_update_request(&selection));

        assert_eq!(record, before);
    }

    #[test]
    fn restore_keeps_fields_that_held_null() {
        let before = Record::new("quote_1")
            .with_field("status", "draft")
            .with_field("note", Value::Null);
        let forward = UpdateRequest::new("quote_1").set("note", "x");
        let selection = Selection::from_updates(std::slice::from_ref(&forward));
        let image = before.select(&selection);

        let mut record = before.clone();
        record.apply(&forward);
        record.apply(&image.to_update_request(&selection));

        assert_eq!(record, before);
        assert_eq!(record.get("note"), Some(&Value::Null));
    }

    #[test]
    fn restore_puts_back_fields_the_update_removed() {
        let before = quote();
        let forward = UpdateRequest::new("quote_1").unset("cart_id");
        let selection = Selection::from_updates(std::slice::from_ref(&forward));
        let image = before.select(&selection);

        let mut record = before.clone();
        record.apply(&forward);
        assert!(record.get("cart_id").is_none());
        record.apply(&image.to_update_request(&selection));

        assert_eq!(record, before);
    }

    #[test]
    fn unset_keys_travel_under_their_own_json_key() -> anyhow::Result<()> {
        let update: UpdateRequest = serde_json::from_value(json!({
            "id": "quote_1",
            "note": null,
            "$unset": ["discount"]
        }))?;

        assert_eq!(update.changes.get("note"), Some(&Value::Null));
        assert!(update.unset.contains("discount"));
        assert!(!update.changes.contains_key("$unset"));
        assert_eq!(update.keys().collect::<Vec<_>>(), ["note", "discount"]);
        Ok(())
    }

    #[test]
    fn new_record_id_is_optional_in_json() -> anyhow::Result<()> {
        let item: NewRecord = serde_json::from_value(json!({ "title": "Desk", "quantity": 2 }))?;

        assert!(item.id.is_none());
        assert_eq!(item.fields["quantity"], json!(2));
        Ok(())
    }
}
