//! Three-layer validator (C6, spec.md §4.2): structural, semantic, and
//! ontology-reference passes over a bound [`kyc_dsl_core::model::Case`],
//! producing the audit trail the case store persists alongside a version.

pub mod ontology_ref;
pub mod record;
pub mod semantic;
pub mod structural;
pub mod validator;

pub use record::{Finding, FindingCollector};
pub use validator::{validate, ValidationContext};
