use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmendmentError {
    #[error("unknown amendment step {0:?}")]
    UnknownStep(String),

    #[error("case {0:?} has no version to amend")]
    NoSuchCase(String),

    #[error("amendment refused: {0}")]
    Refused(String),

    #[error("validation failed with {failed} finding(s); see audit record {record_id}")]
    ValidationFailed {
        record_id: uuid::Uuid,
        failed: u32,
    },

    #[error(transparent)]
    Ontology(#[from] kyc_ontology_store::OntologyError),

    #[error(transparent)]
    Store(#[from] kyc_case_store::StoreError),

    #[error(transparent)]
    Dsl(#[from] kyc_dsl_core::DslError),

    #[error("amendment cancelled")]
    Cancelled,
}

impl AmendmentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AmendmentError::Store(e) if e.is_retryable())
    }
}
