use thiserror::Error;

use crate::record::RecordId;

#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("{resource}: no record with id {}", join_ids(ids))]
    NotFound {
        resource: &'static str,
        ids: Vec<RecordId>,
    },

    #[error("{resource}: record '{id}' already exists")]
    AlreadyExists { resource: &'static str, id: RecordId },

    #[error("{resource}: store unavailable: {reason}")]
    Unavailable {
        resource: &'static str,
        reason: String,
    },

    #[error("invalid record data")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DataAccessError>;

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(|id| format!("'{id}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
