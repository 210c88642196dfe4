//! Ontology data model (spec.md §3.4): regulations, documents, attributes,
//! their links, and derivation lineage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    pub code: String,
    pub name: String,
    pub jurisdictions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub code: String,
    pub name: String,
    pub doc_type: String,
    pub jurisdiction: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

/// Privacy class of an attribute (spec.md §3.4): `Private` attributes may
/// only be derived targets, never derivation sources (§4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeClass {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub code: String,
    pub name: String,
    pub domain: String,
    pub data_type: String,
    pub class: AttributeClass,
    pub enumeration: Option<Vec<String>>,
}

/// Source tier of an attribute's evidentiary backing: 1 (primary), 2
/// (secondary), 3 (tertiary), matching the data-dictionary's tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTier {
    Primary = 1,
    Secondary = 2,
    Tertiary = 3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDocumentLink {
    pub attribute: String,
    pub document: String,
    pub tier: SourceTier,
    pub relevance: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRegulationLink {
    pub document: String,
    pub regulation: String,
}

/// An ontology-catalogued derivation rule binding one derived attribute to
/// one source attribute (spec.md §3.4). A case's `derived-attributes`
/// clause (spec.md §3.3) may fan a derived attribute out over several of
/// these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDerivationRecord {
    pub derived: String,
    pub source: String,
    pub rule: String,
    pub jurisdiction: Option<String>,
    pub regulation: Option<String>,
}

/// Upper-cases a code for canonical, case-insensitive storage/lookup
/// (spec.md §4.2.3: "canonical storage form is upper-case").
pub fn canonical_code(code: &str) -> String {
    code.to_ascii_uppercase()
}
