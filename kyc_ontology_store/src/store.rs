//! Ontology store trait (C1, spec.md §4.7): the read surface the validator
//! and amendment engine consult. Reads are expected to be stable within a
//! single validation/amendment transaction; implementations are permitted
//! to cache code sets internally per connection.

use async_trait::async_trait;

use crate::error::OntologyError;
use crate::model::{Attribute, AttributeDerivationRecord, Document, Regulation};

#[async_trait]
pub trait OntologyStore: Send + Sync {
    async fn all_document_codes(&self) -> Result<Vec<String>, OntologyError>;
    async fn all_attribute_codes(&self) -> Result<Vec<String>, OntologyError>;
    async fn all_regulation_codes(&self) -> Result<Vec<String>, OntologyError>;

    async fn get_attribute(&self, code: &str) -> Result<Attribute, OntologyError>;
    async fn get_document(&self, code: &str) -> Result<Document, OntologyError>;
    async fn get_regulation(&self, code: &str) -> Result<Regulation, OntologyError>;

    async fn document_exists(&self, code: &str) -> Result<bool, OntologyError>;
    async fn regulation_exists(&self, code: &str) -> Result<bool, OntologyError>;
    async fn document_linked_to_regulation(&self, code: &str) -> Result<bool, OntologyError>;

    async fn get_attribute_derivations(
        &self,
        derived_code: &str,
    ) -> Result<Vec<AttributeDerivationRecord>, OntologyError>;

    async fn list_public_attributes(&self) -> Result<Vec<Attribute>, OntologyError>;
    async fn list_private_attributes(&self) -> Result<Vec<Attribute>, OntologyError>;
    async fn list_documents(&self) -> Result<Vec<Document>, OntologyError>;
    async fn list_regulations(&self) -> Result<Vec<Regulation>, OntologyError>;

    /// Documents linked to `regulation_code` (spec.md §6.3 ontology facade).
    async fn documents_by_regulation(
        &self,
        regulation_code: &str,
    ) -> Result<Vec<Document>, OntologyError>;

    /// Optional capability (spec.md §4.7, §6): nearest-neighbor search over
    /// an embedding space. Not implemented by the in-memory or Postgres
    /// backends here; a vector-search-capable backend would override it.
    async fn search_by_vector(
        &self,
        _query_vec: &[f32],
        _k: usize,
    ) -> Result<Vec<(String, f32)>, OntologyError> {
        Err(OntologyError::Unsupported("search_by_vector"))
    }
}
