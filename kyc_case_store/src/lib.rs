//! Case store (C2, spec.md §4.6): append-only, versioned, content-addressed
//! persistence for case snapshots and their validation audit trail.

pub mod error;
pub mod hash;
pub mod memory;
pub mod model;
pub mod store;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::StoreError;
pub use hash::content_hash;
pub use memory::InMemoryCaseStore;
pub use model::{
    Amendment, CaseFilter, CaseStatus, CaseSummary, CaseVersion, FindingStatus, Severity,
    ValidationFinding, ValidationRecord, ValidationStatus, ValidationTotals,
};
pub use store::{AppendVersionRequest, CaseStore, PendingAmendment};

#[cfg(feature = "postgres")]
pub use postgres::PostgresCaseStore;
