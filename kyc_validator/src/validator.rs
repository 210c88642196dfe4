//! Orchestrates the three validation passes (spec.md §4.2) into one
//! [`kyc_case_store::ValidationRecord`] + finding set, ready to hand to
//! [`kyc_case_store::CaseStore::append_version`] or `record_validation`.

use kyc_case_store::{ValidationFinding, ValidationRecord};
use kyc_dsl_core::model::Case;
use kyc_ontology_store::OntologyStore;

use crate::record::FindingCollector;
use crate::{ontology_ref, semantic, structural};

pub struct ValidationContext<'a> {
    pub actor: &'a str,
    pub grammar_version: &'a str,
    pub ontology_version: &'a str,
}

/// Runs the structural, semantic, and ontology-reference passes in order,
/// always to completion: a failure in an earlier pass does not stop a
/// later one from contributing its own findings (spec.md §4.2).
pub async fn validate(
    case: &Case,
    version: u64,
    ontology: &dyn OntologyStore,
    ctx: ValidationContext<'_>,
) -> (ValidationRecord, Vec<ValidationFinding>) {
    let mut collector = FindingCollector::new(
        case.name.clone(),
        version,
        ctx.actor,
        ctx.grammar_version,
        ctx.ontology_version,
    );

    collector.extend(structural::check(case));
    collector.extend(semantic::check(case));
    collector.extend(ontology_ref::check(case, ontology).await);

    collector.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_case_store::ValidationStatus;
    use kyc_dsl_core::{binder, parser};
    use kyc_ontology_store::InMemoryOntologyStore;

    fn case(src: &str) -> Case {
        let forms = parser::parse(src).unwrap();
        binder::bind(&forms).unwrap()
    }

    #[tokio::test]
    async fn minimal_case_totals_three_passed_three() {
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        let c = case(
            r#"(kyc-case ACME-TEST
              (nature-purpose (nature "Test") (purpose "Unit test"))
              (client-business-unit TEST-UNIT)
              (kyc-token "pending"))"#,
        );
        let (record, findings) = validate(
            &c,
            1,
            &ontology,
            ValidationContext {
                actor: "System",
                grammar_version: "1.0",
                ontology_version: "1.0",
            },
        )
        .await;
        assert_eq!(record.status, ValidationStatus::Pass);
        assert_eq!(record.totals.total, 3);
        assert_eq!(record.totals.passed, 3);
        assert_eq!(record.totals.failed, 0);
        assert_eq!(findings.len(), 3);
    }

    #[tokio::test]
    async fn passes_a_clean_case() {
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        let c = case(
            r#"(kyc-case ACME-TEST
              (nature-purpose (nature "Test") (purpose "Unit test"))
              (client-business-unit TEST-UNIT)
              (ownership-structure (owner A 50%) (owner B 50%) (controller A "director"))
              (kyc-token "pending"))"#,
        );
        let (record, findings) = validate(
            &c,
            1,
            &ontology,
            ValidationContext {
                actor: "tester",
                grammar_version: "1.0",
                ontology_version: "1.0",
            },
        )
        .await;
        assert_eq!(record.status, ValidationStatus::Pass);
        assert!(findings.iter().all(|f| f.status == kyc_case_store::FindingStatus::Pass));
    }

    #[tokio::test]
    async fn fails_and_still_collects_findings_from_every_pass() {
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        let c = case(
            r#"(kyc-case ACME-TEST
              (nature-purpose (nature "Test") (purpose "Unit test"))
              (ownership-structure (owner A 40%) (owner B 40%))
              (data-dictionary (attribute UBO_NAME (primary-source (document W8BENZ))))
              (kyc-token "pending"))"#,
        );
        let (record, findings) = validate(
            &c,
            1,
            &ontology,
            ValidationContext {
                actor: "tester",
                grammar_version: "1.0",
                ontology_version: "1.0",
            },
        )
        .await;
        assert_eq!(record.status, ValidationStatus::Fail);
        assert!(findings
            .iter()
            .any(|f| f.check_type == "structural" && f.check_name == "client_business_unit_present"));
        assert!(findings.iter().any(|f| f.check_type == "ownership_sum"));
        assert!(findings.iter().any(|f| f.check_type == "ontology_document"));
    }
}
