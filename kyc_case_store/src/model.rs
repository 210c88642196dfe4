//! Case store data model (spec.md §3.5, §6.2): case identity, versions,
//! amendment log, and validation audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Pending,
    Approved,
    Declined,
    Review,
}

/// One row of `case`: the case's current identity, independent of any
/// particular version snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub name: String,
    pub status: CaseStatus,
    pub last_updated: DateTime<Utc>,
}

/// One row of `case_version`: an immutable, append-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseVersion {
    pub name: String,
    pub version: u64,
    pub hash: String,
    pub dsl_snapshot: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// One row of `case_amendment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amendment {
    pub id: uuid::Uuid,
    pub name: String,
    pub from_version: u64,
    pub to_version: u64,
    pub step: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationTotals {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

/// One row of `validation_record` (spec.md §3.5, §4.2.4). `metadata` is a
/// free JSON map for informational data (parse timings, source size);
/// never read back by validation logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub id: uuid::Uuid,
    pub case_name: String,
    pub version: u64,
    pub validation_time: DateTime<Utc>,
    pub grammar_version: String,
    pub ontology_version: String,
    pub actor: String,
    pub status: ValidationStatus,
    pub totals: ValidationTotals,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
}

/// One row of `validation_finding` (spec.md §3.5, §4.2.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub id: uuid::Uuid,
    pub validation_record: uuid::Uuid,
    pub check_type: String,
    pub check_name: String,
    pub status: FindingStatus,
    pub message: String,
    pub entity_ref: Option<String>,
    pub severity: Severity,
}

/// Optional filter for `list_cases` (spec.md §4.6).
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub name_prefix: Option<String>,
}
