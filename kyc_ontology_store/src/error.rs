use thiserror::Error;

#[derive(Debug, Error)]
pub enum OntologyError {
    #[error("{kind} {code:?} not found in ontology")]
    NotFound { kind: &'static str, code: String },
    #[error("{kind} {code:?} already exists in ontology")]
    DuplicateCode { kind: &'static str, code: String },
    #[error("ontology store transient failure: {0}")]
    Transient(String),
    #[error("{0} is not implemented by this ontology store backend")]
    Unsupported(&'static str),
    #[error("operation cancelled")]
    Cancelled,
}
