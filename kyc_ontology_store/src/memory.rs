//! In-memory ontology store: the default backend for tests and for any
//! deployment that seeds its ontology from a static registry rather than a
//! database (spec.md §9 design notes: the reference policy/obligation
//! registry is treated as static).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::OntologyError;
use crate::model::{
    canonical_code, Attribute, AttributeClass, AttributeDerivationRecord, AttributeDocumentLink,
    Document, DocumentRegulationLink, Regulation, SourceTier,
};
use crate::store::OntologyStore;

#[derive(Default)]
struct Tables {
    regulations: HashMap<String, Regulation>,
    documents: HashMap<String, Document>,
    attributes: HashMap<String, Attribute>,
    attribute_document_links: Vec<AttributeDocumentLink>,
    document_regulation_links: Vec<DocumentRegulationLink>,
    derivations: Vec<AttributeDerivationRecord>,
}

pub struct InMemoryOntologyStore {
    tables: RwLock<Tables>,
}

impl Default for InMemoryOntologyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOntologyStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    pub fn add_regulation(&self, regulation: Regulation) {
        let mut t = self.tables.write().unwrap();
        t.regulations.insert(canonical_code(&regulation.code), regulation);
    }

    pub fn add_document(&self, document: Document) {
        let mut t = self.tables.write().unwrap();
        t.documents.insert(canonical_code(&document.code), document);
    }

    pub fn add_attribute(&self, attribute: Attribute) {
        let mut t = self.tables.write().unwrap();
        t.attributes.insert(canonical_code(&attribute.code), attribute);
    }

    pub fn link_document_to_regulation(&self, document: &str, regulation: &str) {
        let mut t = self.tables.write().unwrap();
        t.document_regulation_links.push(DocumentRegulationLink {
            document: canonical_code(document),
            regulation: canonical_code(regulation),
        });
    }

    pub fn link_attribute_to_document(&self, attribute: &str, document: &str, tier: SourceTier) {
        let mut t = self.tables.write().unwrap();
        t.attribute_document_links.push(AttributeDocumentLink {
            attribute: canonical_code(attribute),
            document: canonical_code(document),
            tier,
            relevance: 1.0,
            last_updated: Utc::now(),
        });
    }

    pub fn add_derivation(&self, derived: &str, source: &str, rule: &str) {
        let mut t = self.tables.write().unwrap();
        t.derivations.push(AttributeDerivationRecord {
            derived: canonical_code(derived),
            source: canonical_code(source),
            rule: rule.to_string(),
            jurisdiction: None,
            regulation: None,
        });
    }

    /// A small, self-consistent baseline ontology covering the scenario
    /// tests in spec.md §8.2: `PASSPORT`/`UTILITY_BILL` documents each
    /// linked to a regulation, `TAX_RESIDENCY_COUNTRY`/`UBO_NAME` public
    /// attributes, and one derived-private attribute sourced from a public
    /// one. `W8BENZ` is deliberately absent (S2 expects it unknown).
    pub fn seeded_for_tests() -> Self {
        let store = Self::new();
        store.add_regulation(Regulation {
            code: "UK-MLR".to_string(),
            name: "UK Money Laundering Regulations".to_string(),
            jurisdictions: vec!["UK".to_string()],
        });
        store.add_regulation(Regulation {
            code: "US-PATRIOT".to_string(),
            name: "USA PATRIOT Act".to_string(),
            jurisdictions: vec!["US".to_string()],
        });
        store.add_document(Document {
            code: "PASSPORT".to_string(),
            name: "Passport".to_string(),
            doc_type: "identity".to_string(),
            jurisdiction: "UK".to_string(),
            valid_from: None,
            valid_to: None,
        });
        store.add_document(Document {
            code: "UTILITY_BILL".to_string(),
            name: "Utility bill".to_string(),
            doc_type: "proof-of-address".to_string(),
            jurisdiction: "UK".to_string(),
            valid_from: None,
            valid_to: None,
        });
        store.link_document_to_regulation("PASSPORT", "UK-MLR");
        store.link_document_to_regulation("UTILITY_BILL", "UK-MLR");

        store.add_attribute(Attribute {
            code: "TAX_RESIDENCY_COUNTRY".to_string(),
            name: "Tax residency country".to_string(),
            domain: "tax".to_string(),
            data_type: "string".to_string(),
            class: AttributeClass::Public,
            enumeration: None,
        });
        store.add_attribute(Attribute {
            code: "UBO_NAME".to_string(),
            name: "Ultimate beneficial owner name".to_string(),
            domain: "identity".to_string(),
            data_type: "string".to_string(),
            class: AttributeClass::Public,
            enumeration: None,
        });
        store.add_attribute(Attribute {
            code: "IS_HIGH_RISK".to_string(),
            name: "High-risk determination".to_string(),
            domain: "risk".to_string(),
            data_type: "boolean".to_string(),
            class: AttributeClass::Private,
            enumeration: None,
        });
        store.link_attribute_to_document("UBO_NAME", "PASSPORT", SourceTier::Primary);
        store.add_derivation(
            "IS_HIGH_RISK",
            "TAX_RESIDENCY_COUNTRY",
            r#"(in TAX_RESIDENCY_COUNTRY ["IR" "KP" "SY"])"#,
        );

        store
    }
}

#[async_trait]
impl OntologyStore for InMemoryOntologyStore {
    async fn all_document_codes(&self) -> Result<Vec<String>, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.documents.keys().cloned().collect())
    }

    async fn all_attribute_codes(&self) -> Result<Vec<String>, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.attributes.keys().cloned().collect())
    }

    async fn all_regulation_codes(&self) -> Result<Vec<String>, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.regulations.keys().cloned().collect())
    }

    async fn get_attribute(&self, code: &str) -> Result<Attribute, OntologyError> {
        let t = self.tables.read().unwrap();
        t.attributes
            .get(&canonical_code(code))
            .cloned()
            .ok_or_else(|| OntologyError::NotFound {
                kind: "attribute",
                code: code.to_string(),
            })
    }

    async fn get_document(&self, code: &str) -> Result<Document, OntologyError> {
        let t = self.tables.read().unwrap();
        t.documents
            .get(&canonical_code(code))
            .cloned()
            .ok_or_else(|| OntologyError::NotFound {
                kind: "document",
                code: code.to_string(),
            })
    }

    async fn get_regulation(&self, code: &str) -> Result<Regulation, OntologyError> {
        let t = self.tables.read().unwrap();
        t.regulations
            .get(&canonical_code(code))
            .cloned()
            .ok_or_else(|| OntologyError::NotFound {
                kind: "regulation",
                code: code.to_string(),
            })
    }

    async fn document_exists(&self, code: &str) -> Result<bool, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.documents.contains_key(&canonical_code(code)))
    }

    async fn regulation_exists(&self, code: &str) -> Result<bool, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.regulations.contains_key(&canonical_code(code)))
    }

    async fn document_linked_to_regulation(&self, code: &str) -> Result<bool, OntologyError> {
        let t = self.tables.read().unwrap();
        let code = canonical_code(code);
        Ok(t.document_regulation_links.iter().any(|l| l.document == code))
    }

    async fn get_attribute_derivations(
        &self,
        derived_code: &str,
    ) -> Result<Vec<AttributeDerivationRecord>, OntologyError> {
        let t = self.tables.read().unwrap();
        let code = canonical_code(derived_code);
        Ok(t.derivations
            .iter()
            .filter(|d| d.derived == code)
            .cloned()
            .collect())
    }

    async fn list_public_attributes(&self) -> Result<Vec<Attribute>, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.attributes
            .values()
            .filter(|a| a.class == AttributeClass::Public)
            .cloned()
            .collect())
    }

    async fn list_private_attributes(&self) -> Result<Vec<Attribute>, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.attributes
            .values()
            .filter(|a| a.class == AttributeClass::Private)
            .cloned()
            .collect())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.documents.values().cloned().collect())
    }

    async fn list_regulations(&self) -> Result<Vec<Regulation>, OntologyError> {
        let t = self.tables.read().unwrap();
        Ok(t.regulations.values().cloned().collect())
    }

    async fn documents_by_regulation(
        &self,
        regulation_code: &str,
    ) -> Result<Vec<Document>, OntologyError> {
        let t = self.tables.read().unwrap();
        let code = canonical_code(regulation_code);
        let document_codes: std::collections::HashSet<_> = t
            .document_regulation_links
            .iter()
            .filter(|l| l.regulation == code)
            .map(|l| l.document.clone())
            .collect();
        Ok(t.documents
            .values()
            .filter(|d| document_codes.contains(&d.code))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_store_knows_passport_but_not_w8benz() {
        let store = InMemoryOntologyStore::seeded_for_tests();
        assert!(store.document_exists("PASSPORT").await.unwrap());
        assert!(store.document_exists("passport").await.unwrap());
        assert!(!store.document_exists("W8BENZ").await.unwrap());
    }

    #[tokio::test]
    async fn passport_is_linked_to_a_regulation() {
        let store = InMemoryOntologyStore::seeded_for_tests();
        assert!(store.document_linked_to_regulation("PASSPORT").await.unwrap());
    }

    #[tokio::test]
    async fn lists_public_and_private_attributes_disjointly() {
        let store = InMemoryOntologyStore::seeded_for_tests();
        let public = store.list_public_attributes().await.unwrap();
        let private = store.list_private_attributes().await.unwrap();
        assert!(public.iter().any(|a| a.code == "TAX_RESIDENCY_COUNTRY"));
        assert!(private.iter().any(|a| a.code == "IS_HIGH_RISK"));
        assert!(!public.iter().any(|a| a.code == "IS_HIGH_RISK"));
    }

    #[tokio::test]
    async fn get_attribute_derivations_returns_lineage() {
        let store = InMemoryOntologyStore::seeded_for_tests();
        let derivations = store.get_attribute_derivations("IS_HIGH_RISK").await.unwrap();
        assert_eq!(derivations.len(), 1);
        assert_eq!(derivations[0].source, "TAX_RESIDENCY_COUNTRY");
    }

    #[tokio::test]
    async fn search_by_vector_is_unsupported_by_default() {
        let store = InMemoryOntologyStore::seeded_for_tests();
        let err = store.search_by_vector(&[0.1, 0.2], 3).await.unwrap_err();
        assert!(matches!(err, OntologyError::Unsupported(_)));
    }
}
