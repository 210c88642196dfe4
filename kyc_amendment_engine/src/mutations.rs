//! Named mutations (spec.md §4.5.1, closed set): pure functions of
//! `(model, ontology)`. None of these touch the store; [`crate::engine`]
//! is the only place a mutation's result is persisted.

use kyc_dsl_core::model::{
    AttributeSource, Case, CaseStatus, DataDictionaryEntry, DocumentRequirementBlock,
    FunctionAction, FunctionInvocation, RequiredDocument,
};
use kyc_ontology_store::OntologyStore;

use crate::error::AmendmentError;
use crate::registry::{self, GLOBAL_JURISDICTION};

pub const POLICY_DISCOVERY: &str = "policy-discovery";
pub const DOCUMENT_SOLICITATION: &str = "document-solicitation";
pub const DOCUMENT_DISCOVERY: &str = "document-discovery";
pub const OWNERSHIP_DISCOVERY: &str = "ownership-discovery";
pub const RISK_ASSESSMENT: &str = "risk-assessment";
pub const REGULATOR_NOTIFY: &str = "regulator-notify";
pub const APPROVE: &str = "approve";
pub const DECLINE: &str = "decline";
pub const REVIEW: &str = "review";

pub const ALL_STEPS: &[&str] = &[
    POLICY_DISCOVERY,
    DOCUMENT_SOLICITATION,
    DOCUMENT_DISCOVERY,
    OWNERSHIP_DISCOVERY,
    RISK_ASSESSMENT,
    REGULATOR_NOTIFY,
    APPROVE,
    DECLINE,
    REVIEW,
];

/// Applies `step` to a clone of `case`, returning the mutated model.
/// `case` itself is left untouched; the caller decides whether to persist
/// the result.
pub async fn apply(
    step: &str,
    case: &Case,
    ontology: &dyn OntologyStore,
) -> Result<Case, AmendmentError> {
    let mut next = case.clone();
    match step {
        POLICY_DISCOVERY => policy_discovery(&mut next),
        DOCUMENT_SOLICITATION => document_solicitation(&mut next),
        DOCUMENT_DISCOVERY => document_discovery(&mut next, ontology).await,
        OWNERSHIP_DISCOVERY => ownership_discovery(&mut next),
        RISK_ASSESSMENT => risk_assessment(&mut next),
        REGULATOR_NOTIFY => regulator_notify(&mut next),
        APPROVE => approve(&mut next)?,
        DECLINE => next.kyc_token = CaseStatus::Declined.as_str().to_string(),
        REVIEW => next.kyc_token = CaseStatus::Review.as_str().to_string(),
        other => return Err(AmendmentError::UnknownStep(other.to_string())),
    }
    Ok(next)
}

fn case_jurisdictions(case: &Case) -> Vec<String> {
    let mut jurisdictions: Vec<String> = case
        .document_requirements
        .iter()
        .map(|b| b.jurisdiction.clone())
        .collect();
    jurisdictions.sort();
    jurisdictions.dedup();
    if jurisdictions.is_empty() {
        jurisdictions.push(GLOBAL_JURISDICTION.to_string());
    }
    jurisdictions
}

fn append_function_once(case: &mut Case, action: FunctionAction) {
    if !case.has_function(action) {
        case.functions.push(FunctionInvocation::pending(action));
    }
}

fn append_code_once(codes: &mut Vec<String>, code: &str) {
    if !codes.iter().any(|c| c == code) {
        codes.push(code.to_string());
    }
}

fn policy_discovery(case: &mut Case) {
    append_function_once(case, FunctionAction::DiscoverPolicies);
    for jurisdiction in case_jurisdictions(case) {
        for policy in registry::policies_for_jurisdiction(&jurisdiction) {
            append_code_once(&mut case.policies, policy);
        }
    }
}

fn document_solicitation(case: &mut Case) {
    append_function_once(case, FunctionAction::SolicitDocuments);
    let policies = case.policies.clone();
    for policy in &policies {
        for obligation in registry::obligations_for_policy(policy) {
            append_code_once(&mut case.obligations, obligation);
        }
    }
}

async fn document_discovery(case: &mut Case, ontology: &dyn OntologyStore) {
    for jurisdiction in case_jurisdictions(case) {
        let requirements = registry::documents_for_jurisdiction(&jurisdiction);
        let mut documents = Vec::new();
        for req in requirements {
            if ontology.document_exists(req.document).await.unwrap_or(false) {
                if ontology.get_attribute(req.attribute).await.is_ok()
                    && !case.data_dictionary.iter().any(|e| e.attribute == req.attribute)
                {
                    case.data_dictionary.push(DataDictionaryEntry {
                        attribute: req.attribute.to_string(),
                        primary: AttributeSource::Document(req.document.to_string()),
                        secondary: None,
                        tertiary: None,
                    });
                }
                documents.push(RequiredDocument {
                    code: req.document.to_string(),
                    label: req.label.to_string(),
                });
            }
        }
        if documents.is_empty() {
            continue;
        }
        match case
            .document_requirements
            .iter_mut()
            .find(|b| b.jurisdiction == jurisdiction)
        {
            Some(block) => {
                for doc in documents {
                    if !block.documents.iter().any(|d| d.code == doc.code) {
                        block.documents.push(doc);
                    }
                }
            }
            None => case.document_requirements.push(DocumentRequirementBlock {
                jurisdiction,
                documents,
            }),
        }
    }
}

fn ownership_discovery(case: &mut Case) {
    append_function_once(case, FunctionAction::BuildOwnershipTree);
    append_function_once(case, FunctionAction::VerifyOwnership);
}

fn risk_assessment(case: &mut Case) {
    append_function_once(case, FunctionAction::AssessRisk);
}

fn regulator_notify(case: &mut Case) {
    append_function_once(case, FunctionAction::RegulatorNotify);
}

fn approve(case: &mut Case) -> Result<(), AmendmentError> {
    use kyc_dsl_core::model::FunctionStatus;
    if case.functions.iter().any(|f| f.status == FunctionStatus::Pending) {
        return Err(AmendmentError::Refused(
            "cannot approve a case with pending functions".to_string(),
        ));
    }
    case.kyc_token = CaseStatus::Approved.as_str().to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_dsl_core::{binder, parser};
    use kyc_ontology_store::InMemoryOntologyStore;

    fn case(src: &str) -> Case {
        let forms = parser::parse(src).unwrap();
        binder::bind(&forms).unwrap()
    }

    #[tokio::test]
    async fn policy_discovery_appends_function_and_global_policy() {
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        let c = case(
            r#"(kyc-case X
              (nature-purpose (nature "N") (purpose "P"))
              (client-business-unit CBU)
              (kyc-token "pending"))"#,
        );
        let next = apply(POLICY_DISCOVERY, &c, &ontology).await.unwrap();
        assert!(next.has_function(FunctionAction::DiscoverPolicies));
        assert!(!next.policies.is_empty());
    }

    #[tokio::test]
    async fn policy_discovery_is_idempotent_under_repeated_application() {
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        let c = case(
            r#"(kyc-case X
              (nature-purpose (nature "N") (purpose "P"))
              (client-business-unit CBU)
              (kyc-token "pending"))"#,
        );
        let once = apply(POLICY_DISCOVERY, &c, &ontology).await.unwrap();
        let twice = apply(POLICY_DISCOVERY, &once, &ontology).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn approve_refuses_when_a_function_is_pending() {
        let ontology = InMemoryOntologyStore::seeded_for_tests();
        let c = case(
            r#"(kyc-case X
              (nature-purpose (nature "N") (purpose "P"))
              (client-business-unit CBU)
              (function DISCOVER-POLICIES)
              (kyc-token "pending"))"#,
        );
        let result = apply(APPROVE, &c, &ontology).await;
        assert!(matches!(result, Err(AmendmentError::Refused(_))));
    }
}
