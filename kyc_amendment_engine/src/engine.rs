//! Amendment engine (C9, spec.md §4.5): load -> bind -> mutate -> validate
//! -> serialize -> append, with bounded retry on store conflicts and an
//! idempotence short-circuit when a mutation changes nothing observable.

use std::time::Duration;

use kyc_case_store::{AppendVersionRequest, CaseStore, CaseVersion, PendingAmendment, StoreError};
use kyc_dsl_core::model::Case;
use kyc_dsl_core::serializer;
use kyc_ontology_store::OntologyStore;
use kyc_validator::{validate, ValidationContext};

use crate::cancel::CancelToken;
use crate::error::AmendmentError;
use crate::mutations;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(50);

pub struct AmendmentEngine<'a> {
    pub case_store: &'a dyn CaseStore,
    pub ontology: &'a dyn OntologyStore,
    pub grammar_version: &'a str,
    pub ontology_version: &'a str,
}

impl<'a> AmendmentEngine<'a> {
    /// Applies `step` to the latest version of `case_name`, persisting the
    /// result as a new version (spec.md §4.5 steps 1-10). Retries
    /// automatically on `StoreError::Conflict` up to `MAX_ATTEMPTS` times
    /// with exponential backoff; every other error propagates unchanged.
    pub async fn apply_amendment(
        &self,
        case_name: &str,
        step: &str,
        actor: &str,
        cancel: &CancelToken,
    ) -> Result<CaseVersion, AmendmentError> {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(AmendmentError::Cancelled);
            }
            match self.try_apply_once(case_name, step, actor).await {
                Ok(version) => return Ok(version),
                Err(AmendmentError::Store(e)) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    attempt += 1;
                    tokio::select! {
                        _ = tokio::time::sleep(BASE_BACKOFF * 2u32.pow(attempt - 1)) => {}
                        _ = cancel.cancelled() => return Err(AmendmentError::Cancelled),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_apply_once(
        &self,
        case_name: &str,
        step: &str,
        actor: &str,
    ) -> Result<CaseVersion, AmendmentError> {
        let latest = self
            .case_store
            .get_latest(case_name)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => AmendmentError::NoSuchCase(case_name.to_string()),
                other => AmendmentError::Store(other),
            })?;

        if !mutations::ALL_STEPS.contains(&step) {
            return Err(AmendmentError::UnknownStep(step.to_string()));
        }

        let case = kyc_dsl_core::parse_and_bind(&latest.dsl_snapshot)?;

        let mutated = mutations::apply(step, &case, self.ontology).await?;

        let (record, findings) = validate(
            &mutated,
            latest.version + 1,
            self.ontology,
            ValidationContext {
                actor,
                grammar_version: self.grammar_version,
                ontology_version: self.ontology_version,
            },
        )
        .await;

        if record.status == kyc_case_store::ValidationStatus::Fail {
            let record_id = record.id;
            let failed = record.totals.failed;
            self.case_store.record_validation(record, findings).await?;
            return Err(AmendmentError::ValidationFailed { record_id, failed });
        }

        let snapshot = serializer::serialize(&mutated);
        let hash = kyc_case_store::content_hash(&snapshot);

        if hash == latest.hash {
            return Ok(latest);
        }

        let request = AppendVersionRequest {
            name: case_name.to_string(),
            dsl_snapshot: snapshot,
            hash,
            actor: actor.to_string(),
            status: store_status(&mutated),
            amendment: Some(PendingAmendment {
                from_version: latest.version,
                step: step.to_string(),
            }),
            validation_record: record,
            findings,
        };

        self.case_store
            .append_version(request)
            .await
            .map_err(AmendmentError::Store)
    }
}

/// Maps the model's `kyc-token` (spec.md §3.1) to the case store's
/// persisted `status` column (spec.md §3.5), so approve/decline/review
/// mutations (§4.5.1) are visible to `list_cases`/`list_all_cases` (§4.6).
fn store_status(case: &Case) -> kyc_case_store::CaseStatus {
    match kyc_dsl_core::model::CaseStatus::parse(&case.kyc_token) {
        Some(kyc_dsl_core::model::CaseStatus::Pending) | None => kyc_case_store::CaseStatus::Pending,
        Some(kyc_dsl_core::model::CaseStatus::Approved) => kyc_case_store::CaseStatus::Approved,
        Some(kyc_dsl_core::model::CaseStatus::Declined) => kyc_case_store::CaseStatus::Declined,
        Some(kyc_dsl_core::model::CaseStatus::Review) => kyc_case_store::CaseStatus::Review,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_case_store::InMemoryCaseStore;
    use kyc_dsl_core::serializer;
    use kyc_ontology_store::InMemoryOntologyStore;

    async fn seed_case(store: &InMemoryCaseStore, ontology: &InMemoryOntologyStore, name: &str) {
        let src = format!(
            r#"(kyc-case {name}
              (nature-purpose (nature "N") (purpose "P"))
              (client-business-unit CBU)
              (kyc-token "pending"))"#
        );
        let case = kyc_dsl_core::parse_and_bind(&src).unwrap();
        let snapshot = serializer::serialize(&case);
        let hash = kyc_case_store::content_hash(&snapshot);
        let (record, findings) = validate(
            &case,
            1,
            ontology,
            ValidationContext {
                actor: "System",
                grammar_version: "1.0",
                ontology_version: "1.0",
            },
        )
        .await;
        store
            .append_version(AppendVersionRequest {
                name: name.to_string(),
                dsl_snapshot: snapshot,
                hash,
                actor: "System".to_string(),
                status: kyc_case_store::CaseStatus::Pending,
                amendment: None,
                validation_record: record,
                findings,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn policy_discovery_appends_a_new_version() {
        let store = InMemoryCaseStore::new();
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        seed_case(&store, &ontology, "X").await;

        let engine = AmendmentEngine {
            case_store: &store,
            ontology: &ontology,
            grammar_version: "1.0",
            ontology_version: "1.0",
        };
        let version = engine
            .apply_amendment("X", mutations::POLICY_DISCOVERY, "System", &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(version.version, 2);
    }

    #[tokio::test]
    async fn repeating_the_same_step_is_idempotent() {
        let store = InMemoryCaseStore::new();
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        seed_case(&store, &ontology, "X").await;

        let engine = AmendmentEngine {
            case_store: &store,
            ontology: &ontology,
            grammar_version: "1.0",
            ontology_version: "1.0",
        };
        let first = engine
            .apply_amendment("X", mutations::POLICY_DISCOVERY, "System", &CancelToken::new())
            .await
            .unwrap();
        let second = engine
            .apply_amendment("X", mutations::POLICY_DISCOVERY, "System", &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(first.version, second.version);
    }

    #[tokio::test]
    async fn unknown_step_is_rejected() {
        let store = InMemoryCaseStore::new();
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        seed_case(&store, &ontology, "X").await;

        let engine = AmendmentEngine {
            case_store: &store,
            ontology: &ontology,
            grammar_version: "1.0",
            ontology_version: "1.0",
        };
        let result = engine
            .apply_amendment("X", "not-a-real-step", "System", &CancelToken::new())
            .await;
        assert!(matches!(result, Err(AmendmentError::UnknownStep(_))));
    }
}
