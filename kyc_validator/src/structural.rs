//! Structural pass (spec.md §4.2.1): required clauses present and
//! non-empty, enums legal, identifiers identifier-shaped. Most of this is
//! already enforced at bind time (kyc_dsl_core::binder is strict); this
//! pass re-checks at the typed-model boundary so a model assembled any
//! other way (e.g. by the amendment engine) is still covered.

use kyc_dsl_core::model::{is_identifier_shaped, Case, CaseStatus, OwnershipNode};

use crate::record::Finding;

pub fn check(case: &Case) -> Vec<Finding> {
    let mut findings = Vec::new();

    check_ownership_nonempty(case, &mut findings);

    if case.nature.trim().is_empty() || case.purpose.trim().is_empty() {
        findings.push(Finding::fail(
            "structural",
            "nature_purpose_present",
            "nature-purpose clause must set both nature and purpose",
            None,
        ));
    } else {
        findings.push(Finding::pass("structural", "nature_purpose_present"));
    }

    if case.client_business_unit.trim().is_empty() {
        findings.push(Finding::fail(
            "structural",
            "client_business_unit_present",
            "client-business-unit clause is required",
            None,
        ));
    } else if !is_identifier_shaped(&case.client_business_unit) {
        findings.push(Finding::fail(
            "structural",
            "client_business_unit_present",
            format!(
                "client-business-unit {:?} is not identifier-shaped",
                case.client_business_unit
            ),
            Some(case.client_business_unit.clone()),
        ));
    } else {
        findings.push(Finding::pass("structural", "client_business_unit_present"));
    }

    if case.kyc_token.trim().is_empty() {
        findings.push(Finding::fail(
            "structural",
            "kyc_token_valid",
            "kyc-token clause is required",
            None,
        ));
    } else if CaseStatus::parse(&case.kyc_token).is_none() {
        findings.push(Finding::fail(
            "structural",
            "kyc_token_valid",
            format!("kyc-token {:?} is not a legal case status", case.kyc_token),
            Some(case.kyc_token.clone()),
        ));
    } else {
        findings.push(Finding::pass("structural", "kyc_token_valid"));
    }

    findings
}

/// spec.md §3.2: a declared ownership block must contain at least one node
/// total (owner OR controller) — a block of only `Entity` nodes, or an
/// empty declared block, is a structural failure, not a semantic one.
fn check_ownership_nonempty(case: &Case, findings: &mut Vec<Finding>) {
    if case.ownership.is_empty() {
        return;
    }
    let has_stake_or_control = case.ownership.iter().any(|n| {
        matches!(
            n,
            OwnershipNode::Owner { .. }
                | OwnershipNode::BeneficialOwner { .. }
                | OwnershipNode::Controller { .. }
        )
    });
    if has_stake_or_control {
        findings.push(Finding::pass("structural", "ownership_nonempty"));
    } else {
        findings.push(Finding::fail(
            "structural",
            "ownership_nonempty",
            "ownership-structure must declare at least one owner, beneficial-owner, or controller node",
            None,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_dsl_core::{binder, parser};

    fn case(src: &str) -> Case {
        let forms = parser::parse(src).unwrap();
        binder::bind(&forms).unwrap()
    }

    #[test]
    fn passes_on_a_complete_minimal_case() {
        let c = case(
            r#"(kyc-case ACME-TEST
              (nature-purpose (nature "Test") (purpose "Unit test"))
              (client-business-unit TEST-UNIT)
              (kyc-token "pending"))"#,
        );
        let findings = check(&c);
        assert!(findings
            .iter()
            .all(|f| f.status == kyc_case_store::FindingStatus::Pass));
    }

    #[test]
    fn flags_ownership_block_with_only_an_entity_node() {
        let c = case(
            r#"(kyc-case ACME-TEST
              (nature-purpose (nature "Test") (purpose "Unit test"))
              (client-business-unit TEST-UNIT)
              (ownership-structure (entity ACME-TEST))
              (kyc-token "pending"))"#,
        );
        let findings = check(&c);
        assert!(findings
            .iter()
            .any(|f| f.check_name == "ownership_nonempty"
                && f.status == kyc_case_store::FindingStatus::Fail));
    }

    #[test]
    fn flags_missing_client_business_unit() {
        let c = case(
            r#"(kyc-case ACME-TEST
              (nature-purpose (nature "Test") (purpose "Unit test"))
              (kyc-token "pending"))"#,
        );
        let findings = check(&c);
        assert!(findings
            .iter()
            .any(|f| f.check_name == "client_business_unit_present"
                && f.status == kyc_case_store::FindingStatus::Fail));
    }
}
