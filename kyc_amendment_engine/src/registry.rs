//! Static, offline-seeded registry of which policies/obligations/documents
//! apply per jurisdiction (spec.md §9 open question: the ontology does not
//! model policy/obligation applicability, so `policy-discovery` and
//! `document-solicitation` consult this registry instead. See DESIGN.md).

/// A case's jurisdictions are whatever `document-requirements` blocks it
/// already declares; a case with none yet falls back to `GLOBAL`.
pub const GLOBAL_JURISDICTION: &str = "GLOBAL";

pub fn policies_for_jurisdiction(jurisdiction: &str) -> &'static [&'static str] {
    match jurisdiction {
        "UK" => &["UK_CDD_POLICY", "UK_SANCTIONS_POLICY"],
        "EU" => &["EU_AML_POLICY"],
        "HK" => &["HK_CDD_POLICY"],
        _ => &["BASE_CDD_POLICY"],
    }
}

pub fn obligations_for_policy(policy: &str) -> &'static [&'static str] {
    match policy {
        "UK_CDD_POLICY" => &["EVIDENCE_IDENTITY", "EVIDENCE_ADDRESS"],
        "UK_SANCTIONS_POLICY" => &["SCREEN_SANCTIONS_LIST"],
        "EU_AML_POLICY" => &["EVIDENCE_IDENTITY", "SCREEN_PEP_LIST"],
        "HK_CDD_POLICY" => &["EVIDENCE_IDENTITY"],
        "BASE_CDD_POLICY" => &["EVIDENCE_IDENTITY"],
        _ => &[],
    }
}

pub struct DocumentRequirement {
    pub attribute: &'static str,
    pub document: &'static str,
    pub label: &'static str,
}

pub fn documents_for_jurisdiction(jurisdiction: &str) -> &'static [DocumentRequirement] {
    const UK: &[DocumentRequirement] = &[
        DocumentRequirement {
            attribute: "UBO_NAME",
            document: "PASSPORT",
            label: "Passport",
        },
        DocumentRequirement {
            attribute: "TAX_RESIDENCY_COUNTRY",
            document: "UTILITY_BILL",
            label: "Utility bill",
        },
    ];
    const DEFAULT: &[DocumentRequirement] = &[DocumentRequirement {
        attribute: "UBO_NAME",
        document: "PASSPORT",
        label: "Passport",
    }];
    match jurisdiction {
        "UK" => UK,
        _ => DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_policy_resolves_to_at_least_one_obligation() {
        for policy in policies_for_jurisdiction("UK") {
            assert!(!obligations_for_policy(policy).is_empty());
        }
    }
}
