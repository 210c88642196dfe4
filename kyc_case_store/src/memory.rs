//! In-memory case store. Used by unit/integration tests and by any
//! deployment willing to trade durability for a dependency-free store.
//! Enforces the same append-only, monotonic-version, atomic-commit
//! guarantees spec.md §4.6 requires of the Postgres backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::model::{
    Amendment, CaseFilter, CaseStatus, CaseSummary, CaseVersion, ValidationFinding,
    ValidationRecord,
};
use crate::store::{AppendVersionRequest, CaseStore};

#[derive(Default)]
struct CaseState {
    status: CaseStatus,
    versions: Vec<CaseVersion>,
    amendments: Vec<Amendment>,
}

#[derive(Default)]
struct Tables {
    cases: HashMap<String, CaseState>,
    validation_records: Vec<(ValidationRecord, Vec<ValidationFinding>)>,
}

pub struct InMemoryCaseStore {
    tables: RwLock<Tables>,
}

impl Default for InMemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn get_latest(&self, name: &str) -> Result<CaseVersion, StoreError> {
        let t = self.tables.read().unwrap();
        t.cases
            .get(name)
            .and_then(|c| c.versions.last())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "case",
                key: name.to_string(),
            })
    }

    async fn get_version(&self, name: &str, version: u64) -> Result<CaseVersion, StoreError> {
        let t = self.tables.read().unwrap();
        t.cases
            .get(name)
            .and_then(|c| c.versions.iter().find(|v| v.version == version))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "case_version",
                key: format!("{}@{}", name, version),
            })
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<CaseVersion>, StoreError> {
        let t = self.tables.read().unwrap();
        Ok(t.cases
            .get(name)
            .map(|c| c.versions.clone())
            .unwrap_or_default())
    }

    async fn list_cases(&self, filter: Option<CaseFilter>) -> Result<Vec<CaseSummary>, StoreError> {
        let t = self.tables.read().unwrap();
        let filter = filter.unwrap_or_default();
        Ok(t.cases
            .iter()
            .filter_map(|(name, state)| {
                let last_updated = state.versions.last()?.created_at;
                Some(CaseSummary {
                    name: name.clone(),
                    status: state.status,
                    last_updated,
                })
            })
            .filter(|summary| filter.status.map_or(true, |s| s == summary.status))
            .filter(|summary| {
                filter
                    .name_prefix
                    .as_ref()
                    .map_or(true, |prefix| summary.name.starts_with(prefix.as_str()))
            })
            .collect())
    }

    async fn list_amendments(&self, name: &str) -> Result<Vec<Amendment>, StoreError> {
        let t = self.tables.read().unwrap();
        Ok(t.cases
            .get(name)
            .map(|c| c.amendments.clone())
            .unwrap_or_default())
    }

    async fn append_version(
        &self,
        request: AppendVersionRequest,
    ) -> Result<CaseVersion, StoreError> {
        let mut t = self.tables.write().unwrap();
        let state = t.cases.entry(request.name.clone()).or_default();

        let latest_version = state.versions.last().map(|v| v.version).unwrap_or(0);
        if let Some(amendment) = &request.amendment {
            if amendment.from_version != latest_version {
                return Err(StoreError::Conflict {
                    name: request.name.clone(),
                    prev_version: amendment.from_version,
                });
            }
        }
        let new_version = latest_version + 1;
        let created_at = Utc::now();

        let version = CaseVersion {
            name: request.name.clone(),
            version: new_version,
            hash: request.hash,
            dsl_snapshot: request.dsl_snapshot,
            actor: request.actor,
            created_at,
        };
        state.versions.push(version.clone());
        state.status = request.status;

        if let Some(amendment) = request.amendment {
            state.amendments.push(Amendment {
                id: uuid::Uuid::new_v4(),
                name: request.name.clone(),
                from_version: amendment.from_version,
                to_version: new_version,
                step: amendment.step,
                created_at,
            });
        }

        t.validation_records
            .push((request.validation_record, request.findings));

        Ok(version)
    }

    async fn record_validation(
        &self,
        record: ValidationRecord,
        findings: Vec<ValidationFinding>,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.write().unwrap();
        t.validation_records.push((record, findings));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FindingStatus, Severity, ValidationStatus, ValidationTotals};
    use crate::store::PendingAmendment;

    fn pass_record(name: &str, version: u64) -> ValidationRecord {
        ValidationRecord {
            id: uuid::Uuid::new_v4(),
            case_name: name.to_string(),
            version,
            validation_time: Utc::now(),
            grammar_version: "1".to_string(),
            ontology_version: "1".to_string(),
            actor: "System".to_string(),
            status: ValidationStatus::Pass,
            totals: ValidationTotals {
                total: 1,
                passed: 1,
                failed: 0,
            },
            error_message: None,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn versions_start_at_one_and_are_monotonic() {
        let store = InMemoryCaseStore::new();
        let v1 = store
            .append_version(AppendVersionRequest {
                name: "ACME-TEST".to_string(),
                dsl_snapshot: "(kyc-case ACME-TEST)".to_string(),
                hash: "abc123".to_string(),
                actor: "System".to_string(),
                status: CaseStatus::Pending,
                amendment: None,
                validation_record: pass_record("ACME-TEST", 1),
                findings: vec![],
            })
            .await
            .unwrap();
        assert_eq!(v1.version, 1);

        let v2 = store
            .append_version(AppendVersionRequest {
                name: "ACME-TEST".to_string(),
                dsl_snapshot: "(kyc-case ACME-TEST)".to_string(),
                hash: "def456".to_string(),
                actor: "System".to_string(),
                status: CaseStatus::Pending,
                amendment: Some(PendingAmendment {
                    from_version: 1,
                    step: "policy-discovery".to_string(),
                }),
                validation_record: pass_record("ACME-TEST", 2),
                findings: vec![],
            })
            .await
            .unwrap();
        assert_eq!(v2.version, 2);
    }

    #[tokio::test]
    async fn stale_from_version_is_a_conflict() {
        let store = InMemoryCaseStore::new();
        store
            .append_version(AppendVersionRequest {
                name: "X".to_string(),
                dsl_snapshot: "(kyc-case X)".to_string(),
                hash: "h1".to_string(),
                actor: "System".to_string(),
                status: CaseStatus::Pending,
                amendment: None,
                validation_record: pass_record("X", 1),
                findings: vec![],
            })
            .await
            .unwrap();

        let err = store
            .append_version(AppendVersionRequest {
                name: "X".to_string(),
                dsl_snapshot: "(kyc-case X)".to_string(),
                hash: "h2".to_string(),
                actor: "System".to_string(),
                status: CaseStatus::Pending,
                amendment: Some(PendingAmendment {
                    from_version: 0,
                    step: "policy-discovery".to_string(),
                }),
                validation_record: pass_record("X", 2),
                findings: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn rejected_amendment_leaves_no_new_version() {
        let store = InMemoryCaseStore::new();
        store
            .append_version(AppendVersionRequest {
                name: "X".to_string(),
                dsl_snapshot: "(kyc-case X)".to_string(),
                hash: "h1".to_string(),
                actor: "System".to_string(),
                status: CaseStatus::Pending,
                amendment: None,
                validation_record: pass_record("X", 1),
                findings: vec![
                    (ValidationFinding {
                        id: uuid::Uuid::new_v4(),
                        validation_record: uuid::Uuid::new_v4(),
                        check_type: "structural".to_string(),
                        check_name: "placeholder".to_string(),
                        status: FindingStatus::Pass,
                        message: "ok".to_string(),
                        entity_ref: None,
                        severity: Severity::Info,
                    }),
                ],
            })
            .await
            .unwrap();

        record_validation_failure(&store, "X").await;
        assert_eq!(store.list_versions("X").await.unwrap().len(), 1);
    }

    async fn record_validation_failure(store: &InMemoryCaseStore, name: &str) {
        let record = ValidationRecord {
            status: ValidationStatus::Fail,
            error_message: Some("ownership sum off".to_string()),
            ..pass_record(name, 2)
        };
        store.record_validation(record, vec![]).await.unwrap();
    }
}
