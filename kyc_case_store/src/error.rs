use thiserror::Error;

/// Case store error taxonomy (spec.md §7). `Conflict` and `Transient` are
/// recoverable by the amendment engine's bounded retry; the rest propagate
/// unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("case {name:?} version {prev_version} was superseded by a concurrent write")]
    Conflict { name: String, prev_version: u64 },
    #[error("case store transient failure: {0}")]
    Transient(String),
    #[error("{kind} {key:?} not found")]
    NotFound { kind: &'static str, key: String },
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::Transient(_))
    }
}
