//! Shared server state: the ontology and case store backing every facade.
//! Built once at startup and cloned (cheaply, via `Arc`) into each service.

use std::sync::Arc;

use kyc_case_store::{CaseStore, InMemoryCaseStore};
use kyc_ontology_store::{InMemoryOntologyStore, OntologyStore};

pub const GRAMMAR_VERSION: &str = "1.0";
pub const ONTOLOGY_VERSION: &str = "1.0";

#[derive(Clone)]
pub struct AppState {
    pub ontology: Arc<dyn OntologyStore>,
    pub cases: Arc<dyn CaseStore>,
}

impl AppState {
    pub fn seeded() -> Self {
        Self {
            ontology: Arc::new(InMemoryOntologyStore::seeded_for_tests()),
            cases: Arc::new(InMemoryCaseStore::new()),
        }
    }
}
