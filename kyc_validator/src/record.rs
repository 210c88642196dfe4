//! Accumulates findings across the three validation passes (spec.md
//! §4.2.4) into one [`ValidationRecord`] and its [`ValidationFinding`] rows.

use chrono::Utc;
use kyc_case_store::{
    FindingStatus, Severity, ValidationFinding, ValidationRecord, ValidationStatus,
    ValidationTotals,
};

/// One raw check outcome, before it is stamped with a validation-record id.
#[derive(Debug, Clone)]
pub struct Finding {
    pub check_type: &'static str,
    pub check_name: &'static str,
    pub status: FindingStatus,
    pub message: String,
    pub entity_ref: Option<String>,
    pub severity: Severity,
}

impl Finding {
    pub fn pass(check_type: &'static str, check_name: &'static str) -> Self {
        Finding {
            check_type,
            check_name,
            status: FindingStatus::Pass,
            message: "ok".to_string(),
            entity_ref: None,
            severity: Severity::Info,
        }
    }

    pub fn fail(
        check_type: &'static str,
        check_name: &'static str,
        message: impl Into<String>,
        entity_ref: Option<String>,
    ) -> Self {
        Finding {
            check_type,
            check_name,
            status: FindingStatus::Fail,
            message: message.into(),
            entity_ref,
            severity: Severity::Error,
        }
    }

    pub fn warn(
        check_type: &'static str,
        check_name: &'static str,
        message: impl Into<String>,
        entity_ref: Option<String>,
    ) -> Self {
        Finding {
            check_type,
            check_name,
            status: FindingStatus::Warn,
            message: message.into(),
            entity_ref,
            severity: Severity::Warning,
        }
    }
}

/// Builds the record + findings for one validation invocation (spec.md
/// §4.2.4). `pass_fails_overall` short-circuits the record's overall
/// PASS/FAIL the moment a pass contributes any FAIL finding, but callers
/// keep running later passes to collect their own findings.
pub struct FindingCollector {
    case_name: String,
    version: u64,
    actor: String,
    grammar_version: String,
    ontology_version: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    findings: Vec<Finding>,
    saw_fail: bool,
}

impl FindingCollector {
    pub fn new(
        case_name: impl Into<String>,
        version: u64,
        actor: impl Into<String>,
        grammar_version: impl Into<String>,
        ontology_version: impl Into<String>,
    ) -> Self {
        Self {
            case_name: case_name.into(),
            version,
            actor: actor.into(),
            grammar_version: grammar_version.into(),
            ontology_version: ontology_version.into(),
            metadata: serde_json::Map::new(),
            findings: Vec::new(),
            saw_fail: false,
        }
    }

    pub fn set_metadata(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn extend(&mut self, pass_findings: Vec<Finding>) {
        if pass_findings.iter().any(|f| f.status == FindingStatus::Fail) {
            self.saw_fail = true;
        }
        self.findings.extend(pass_findings);
    }

    pub fn has_failed(&self) -> bool {
        self.saw_fail
    }

    /// Finalize into a (record, findings) pair ready for the case store.
    pub fn finish(self) -> (ValidationRecord, Vec<ValidationFinding>) {
        let record_id = uuid::Uuid::new_v4();
        let total = self.findings.len() as u32;
        let failed = self
            .findings
            .iter()
            .filter(|f| f.status == FindingStatus::Fail)
            .count() as u32;
        let passed = total - failed;

        let error_message = if self.saw_fail {
            Some(
                self.findings
                    .iter()
                    .filter(|f| f.status == FindingStatus::Fail)
                    .map(|f| f.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        } else {
            None
        };

        let record = ValidationRecord {
            id: record_id,
            case_name: self.case_name,
            version: self.version,
            validation_time: Utc::now(),
            grammar_version: self.grammar_version,
            ontology_version: self.ontology_version,
            actor: self.actor,
            status: if self.saw_fail {
                ValidationStatus::Fail
            } else {
                ValidationStatus::Pass
            },
            totals: ValidationTotals {
                total,
                passed,
                failed,
            },
            error_message,
            metadata: serde_json::Value::Object(self.metadata),
        };

        let findings = self
            .findings
            .into_iter()
            .map(|f| ValidationFinding {
                id: uuid::Uuid::new_v4(),
                validation_record: record_id,
                check_type: f.check_type.to_string(),
                check_name: f.check_name.to_string(),
                status: f.status,
                message: f.message,
                entity_ref: f.entity_ref,
                severity: f.severity,
            })
            .collect();

        (record, findings)
    }
}
