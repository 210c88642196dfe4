//! Serializer (C5): typed [`Case`] model -> canonical DSL text.
//!
//! Round-trip stable (spec.md §4.1.3): serializing twice in a row produces
//! byte-identical output. Clause order is fixed: identity, nature-purpose,
//! client-business-unit, policies, functions, ownership, data-dictionary,
//! document-requirements, derived-attributes, obligations, kyc-token.

use crate::ast::{escape_string, format_number};
use crate::model::*;

const INDENT: &str = "  ";

pub fn serialize(case: &Case) -> String {
    let mut out = String::new();
    out.push_str(&format!("(kyc-case {}\n", case.name));

    if !case.nature.is_empty() || !case.purpose.is_empty() {
        out.push_str(&line(1, "(nature-purpose"));
        out.push('\n');
        if !case.nature.is_empty() {
            out.push_str(&line(2, &format!("(nature \"{}\")", escape_string(&case.nature))));
            out.push('\n');
        }
        if !case.purpose.is_empty() {
            out.push_str(&line(2, &format!("(purpose \"{}\")", escape_string(&case.purpose))));
            out.push('\n');
        }
        out.push_str(&line(1, ")"));
        out.push('\n');
    }

    if !case.client_business_unit.is_empty() {
        out.push_str(&line(
            1,
            &format!("(client-business-unit {})", case.client_business_unit),
        ));
        out.push('\n');
    }

    for policy in &case.policies {
        out.push_str(&line(1, &format!("(policy {})", policy)));
        out.push('\n');
    }

    for f in &case.functions {
        out.push_str(&line(1, &format!("(function {})", f.action.as_str())));
        out.push('\n');
    }

    if !case.ownership.is_empty() {
        out.push_str(&line(1, "(ownership-structure"));
        out.push('\n');
        for node in &case.ownership {
            out.push_str(&line(2, &serialize_ownership_node(node)));
            out.push('\n');
        }
        out.push_str(&line(1, ")"));
        out.push('\n');
    }

    if !case.data_dictionary.is_empty() {
        out.push_str(&line(1, "(data-dictionary"));
        out.push('\n');
        for entry in &case.data_dictionary {
            out.push_str(&serialize_attribute_def(entry));
        }
        out.push_str(&line(1, ")"));
        out.push('\n');
    }

    for block in &case.document_requirements {
        out.push_str(&serialize_document_requirements(block));
    }

    if !case.derived_attributes.is_empty() {
        out.push_str(&line(1, "(derived-attributes"));
        out.push('\n');
        for d in &case.derived_attributes {
            out.push_str(&serialize_derivation(d));
        }
        out.push_str(&line(1, ")"));
        out.push('\n');
    }

    for obligation in &case.obligations {
        out.push_str(&line(1, &format!("(obligation {})", obligation)));
        out.push('\n');
    }

    if !case.kyc_token.is_empty() {
        out.push_str(&line(
            1,
            &format!("(kyc-token \"{}\")", escape_string(&case.kyc_token)),
        ));
        out.push('\n');
    }

    out.push(')');
    out
}

fn line(depth: usize, text: &str) -> String {
    format!("{}{}", INDENT.repeat(depth), text)
}

fn serialize_ownership_node(node: &OwnershipNode) -> String {
    match node {
        OwnershipNode::Owner { entity, percentage } => {
            format!("(owner {} {}%)", entity, format_number(*percentage))
        }
        OwnershipNode::BeneficialOwner { entity, percentage } => {
            format!("(beneficial-owner {} {}%)", entity, format_number(*percentage))
        }
        OwnershipNode::Controller { entity, role } => {
            format!("(controller {} \"{}\")", entity, escape_string(role))
        }
        OwnershipNode::Entity { entity } => format!("(entity {})", entity),
    }
}

fn serialize_source(tag: &str, source: &AttributeSource) -> String {
    match source {
        AttributeSource::Document(code) => format!("({} (document {}))", tag, code),
        AttributeSource::OpsValidation => format!("({} \"Ops Validation\")", tag),
    }
}

fn serialize_attribute_def(entry: &DataDictionaryEntry) -> String {
    let mut out = String::new();
    out.push_str(&line(2, &format!("(attribute {}", entry.attribute)));
    out.push('\n');
    out.push_str(&line(3, &serialize_source("primary-source", &entry.primary)));
    out.push('\n');
    if let Some(secondary) = &entry.secondary {
        out.push_str(&line(3, &serialize_source("secondary-source", secondary)));
        out.push('\n');
    }
    if let Some(tertiary) = &entry.tertiary {
        out.push_str(&line(3, &serialize_source("tertiary-source", tertiary)));
        out.push('\n');
    }
    out.push_str(&line(2, ")"));
    out.push('\n');
    out
}

fn serialize_document_requirements(block: &DocumentRequirementBlock) -> String {
    let mut out = String::new();
    out.push_str(&line(1, "(document-requirements"));
    out.push('\n');
    out.push_str(&line(2, &format!("(jurisdiction {})", block.jurisdiction)));
    out.push('\n');
    out.push_str(&line(2, "(required"));
    out.push('\n');
    for doc in &block.documents {
        out.push_str(&line(
            3,
            &format!("(document {} \"{}\")", doc.code, escape_string(&doc.label)),
        ));
        out.push('\n');
    }
    out.push_str(&line(2, ")"));
    out.push('\n');
    out.push_str(&line(1, ")"));
    out.push('\n');
    out
}

fn serialize_derivation(d: &Derivation) -> String {
    let mut out = String::new();
    out.push_str(&line(2, &format!("(attribute {}", d.derived)));
    out.push('\n');
    out.push_str(&line(3, &format!("(sources ({}))", d.sources.join(" "))));
    out.push('\n');
    out.push_str(&line(3, &format!("(rule \"{}\")", escape_string(&d.rule))));
    out.push('\n');
    if let Some(j) = &d.jurisdiction {
        out.push_str(&line(3, &format!("(jurisdiction {})", j)));
        out.push('\n');
    }
    if let Some(r) = &d.regulation {
        out.push_str(&line(3, &format!("(regulation {})", r)));
        out.push('\n');
    }
    out.push_str(&line(2, ")"));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder;
    use crate::parser;

    fn roundtrip(src: &str) -> (Case, Case) {
        let forms = parser::parse(src).unwrap();
        let case = binder::bind(&forms).unwrap();
        let text = serialize(&case);
        let forms2 = parser::parse(&text).unwrap();
        let case2 = binder::bind(&forms2).unwrap();
        (case, case2)
    }

    #[test]
    fn round_trip_is_identity_on_typed_model() {
        let src = r#"(kyc-case ACME-TEST
          (nature-purpose (nature "Test") (purpose "Unit test"))
          (client-business-unit TEST-UNIT)
          (policy POLICY-A)
          (function DISCOVER-POLICIES)
          (ownership-structure
            (owner ACME 60%)
            (owner BOB 40%)
            (controller ACME "director"))
          (data-dictionary
            (attribute UBO_NAME
              (primary-source (document PASSPORT))
              (secondary-source "Ops Validation")))
          (document-requirements
            (jurisdiction UK)
            (required (document PASSPORT "Passport copy")))
          (derived-attributes
            (attribute IS_HIGH_RISK
              (sources (TAX_RESIDENCY_COUNTRY))
              (rule "(if (in TAX_RESIDENCY_COUNTRY [\"IR\"]) true false)")
              (jurisdiction UK)))
          (obligation OBLIGATION-A)
          (kyc-token "pending"))"#;
        let (case, case2) = roundtrip(src);
        assert_eq!(case, case2);
    }

    #[test]
    fn second_serialization_is_byte_identical() {
        let src = r#"(kyc-case X (kyc-token "pending"))"#;
        let forms = parser::parse(src).unwrap();
        let case = binder::bind(&forms).unwrap();
        let first = serialize(&case);
        let forms2 = parser::parse(&first).unwrap();
        let case2 = binder::bind(&forms2).unwrap();
        let second = serialize(&case2);
        assert_eq!(first, second);
    }

    #[test]
    fn percentage_prints_without_unneeded_trailing_zeros() {
        let src = r#"(kyc-case X
          (ownership-structure (owner A 100%))
          (kyc-token "pending"))"#;
        let forms = parser::parse(src).unwrap();
        let case = binder::bind(&forms).unwrap();
        let text = serialize(&case);
        assert!(text.contains("(owner A 100%)"));
    }
}
