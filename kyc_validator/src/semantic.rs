//! Semantic pass (spec.md §4.2.2): function/policy/obligation codes,
//! ownership sum, duplicate entity codes, controller presence.

use std::collections::HashSet;

use kyc_dsl_core::model::{is_identifier_shaped, Case, OwnershipNode};

use crate::record::Finding;

const OWNERSHIP_TOLERANCE: f64 = 0.5;

/// Every sub-check here is conditioned on the relevant clause actually
/// being declared; a case that declares no ownership/policies/obligations
/// contributes no semantic findings at all (spec.md §8.2 S1 expects a
/// minimal case's validation record to total exactly the structural pass's
/// findings).
pub fn check(case: &Case) -> Vec<Finding> {
    let mut findings = Vec::new();

    check_codes(case, &mut findings);
    check_ownership_sum(case, &mut findings);
    check_ownership_duplicates(case, &mut findings);
    check_controllers_present(case, &mut findings);

    findings
}

fn check_codes(case: &Case, findings: &mut Vec<Finding>) {
    if case.policies.is_empty() && case.obligations.is_empty() {
        return;
    }
    let mut bad_codes = Vec::new();
    for policy in &case.policies {
        if !is_identifier_shaped(policy) {
            bad_codes.push(policy.clone());
        }
    }
    for obligation in &case.obligations {
        if !is_identifier_shaped(obligation) {
            bad_codes.push(obligation.clone());
        }
    }
    if bad_codes.is_empty() {
        findings.push(Finding::pass("semantic", "policy_obligation_codes"));
    } else {
        findings.push(Finding::fail(
            "semantic",
            "policy_obligation_codes",
            format!("malformed policy/obligation code(s): {}", bad_codes.join(", ")),
            Some(bad_codes.join(",")),
        ));
    }
}

fn check_ownership_sum(case: &Case, findings: &mut Vec<Finding>) {
    if case.owners().count() == 0 {
        return;
    }
    let sum = case.ownership_sum();
    if (sum - 100.0).abs() <= OWNERSHIP_TOLERANCE {
        findings.push(Finding::pass("ownership_sum", "ownership_sum"));
    } else {
        findings.push(Finding::fail(
            "ownership_sum",
            "ownership_sum",
            format!("legal ownership sums to {} (expected 100 +/- {})", sum, OWNERSHIP_TOLERANCE),
            None,
        ));
    }
}

fn check_ownership_duplicates(case: &Case, findings: &mut Vec<Finding>) {
    if case.ownership.is_empty() {
        return;
    }
    let mut owners_seen = HashSet::new();
    let mut bo_seen = HashSet::new();
    let mut controllers_seen = HashSet::new();
    let mut entities_seen = HashSet::new();
    let mut duplicates = Vec::new();

    for node in &case.ownership {
        let (set, entity) = match node {
            OwnershipNode::Owner { entity, .. } => (&mut owners_seen, entity),
            OwnershipNode::BeneficialOwner { entity, .. } => (&mut bo_seen, entity),
            OwnershipNode::Controller { entity, .. } => (&mut controllers_seen, entity),
            OwnershipNode::Entity { entity } => (&mut entities_seen, entity),
        };
        if !set.insert(entity.clone()) {
            duplicates.push(entity.clone());
        }
    }

    if duplicates.is_empty() {
        findings.push(Finding::pass("semantic", "ownership_no_duplicates"));
    } else {
        findings.push(Finding::fail(
            "semantic",
            "ownership_no_duplicates",
            format!("duplicate entity code(s) within an ownership variant: {}", duplicates.join(", ")),
            Some(duplicates.join(",")),
        ));
    }
}

fn check_controllers_present(case: &Case, findings: &mut Vec<Finding>) {
    let owner_count = case.owners().count();
    if owner_count < 2 {
        return;
    }
    let controller_count = case.controllers().count();
    if controller_count == 0 {
        findings.push(Finding::fail(
            "semantic",
            "controllers_present",
            format!("{} owners declared but no controller is present", owner_count),
            None,
        ));
    } else {
        findings.push(Finding::pass("semantic", "controllers_present"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_case_store::FindingStatus;
    use kyc_dsl_core::{binder, parser};

    fn case(src: &str) -> Case {
        let forms = parser::parse(src).unwrap();
        binder::bind(&forms).unwrap()
    }

    #[test]
    fn flags_ownership_sum_off_by_more_than_half_point() {
        let c = case(
            r#"(kyc-case X
              (ownership-structure (owner A 40%) (owner B 40%))
              (kyc-token "pending"))"#,
        );
        let findings = check(&c);
        let f = findings.iter().find(|f| f.check_name == "ownership_sum").unwrap();
        assert_eq!(f.status, FindingStatus::Fail);
        assert!(f.message.contains("80"));
    }

    #[test]
    fn requires_a_controller_when_multiple_owners() {
        let c = case(
            r#"(kyc-case X
              (ownership-structure (owner A 50%) (owner B 50%))
              (kyc-token "pending"))"#,
        );
        let findings = check(&c);
        let f = findings
            .iter()
            .find(|f| f.check_name == "controllers_present")
            .unwrap();
        assert_eq!(f.status, FindingStatus::Fail);
    }

    #[test]
    fn passes_with_balanced_ownership_and_a_controller() {
        let c = case(
            r#"(kyc-case X
              (ownership-structure (owner A 50%) (owner B 50%) (controller A "director"))
              (kyc-token "pending"))"#,
        );
        let findings = check(&c);
        assert!(findings.iter().all(|f| f.status == FindingStatus::Pass));
    }
}
