//! Case store trait (C2, spec.md §4.6): append-only, versioned,
//! content-addressed persistence for cases and their audit trail.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{
    Amendment, CaseFilter, CaseStatus, CaseSummary, CaseVersion, ValidationFinding,
    ValidationRecord,
};

/// Inputs to [`CaseStore::append_version`]: everything that must commit as
/// one atomic unit (spec.md §4.6 "atomic across version row, amendment
/// row (if present), validation record, and findings"), plus the case's
/// resulting `status` column, kept in lockstep with the appended
/// snapshot's `kyc-token` (spec.md §3.5).
pub struct AppendVersionRequest {
    pub name: String,
    pub dsl_snapshot: String,
    pub hash: String,
    pub actor: String,
    pub status: CaseStatus,
    pub amendment: Option<PendingAmendment>,
    pub validation_record: ValidationRecord,
    pub findings: Vec<ValidationFinding>,
}

pub struct PendingAmendment {
    pub from_version: u64,
    pub step: String,
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn get_latest(&self, name: &str) -> Result<CaseVersion, StoreError>;
    async fn get_version(&self, name: &str, version: u64) -> Result<CaseVersion, StoreError>;
    async fn list_versions(&self, name: &str) -> Result<Vec<CaseVersion>, StoreError>;
    async fn list_cases(&self, filter: Option<CaseFilter>) -> Result<Vec<CaseSummary>, StoreError>;
    async fn list_amendments(&self, name: &str) -> Result<Vec<Amendment>, StoreError>;

    /// Atomically appends a new version (and, if present, its amendment
    /// row), plus its validation record and findings. Rejected with
    /// `StoreError::Conflict` if `amendment.from_version` is no longer the
    /// latest version.
    async fn append_version(&self, request: AppendVersionRequest) -> Result<CaseVersion, StoreError>;

    /// Stand-alone validation recording, used by the `validate` CLI path
    /// when no new version is being written (spec.md §4.6).
    async fn record_validation(
        &self,
        record: ValidationRecord,
        findings: Vec<ValidationFinding>,
    ) -> Result<(), StoreError>;
}
