//! Binder (C4): untyped [`Expr`] AST -> typed [`Case`] model.
//!
//! Strict: wrong arity, wrong atom shape, or a duplicate singular clause all
//! fail with a [`BindError`] naming the clause and its position. Performs no
//! ontology lookups — that is the validator's job (spec.md §4.1.2).

use crate::ast::{Atom, Expr};
use crate::error::BindError;
use crate::model::*;

pub fn bind(forms: &[Expr]) -> Result<Case, BindError> {
    let case_expr = forms.first().ok_or(BindError::MissingCase)?;
    bind_case(case_expr)
}

/// Bind every top-level form (used when a DSL file legally carries more
/// than one `(kyc-case ...)`).
pub fn bind_all(forms: &[Expr]) -> Result<Vec<Case>, BindError> {
    forms.iter().map(bind_case).collect()
}

struct Seen {
    nature_purpose: bool,
    cbu: bool,
    ownership: bool,
    data_dictionary: bool,
    derived_attributes: bool,
    kyc_token: bool,
}

impl Default for Seen {
    fn default() -> Self {
        Seen {
            nature_purpose: false,
            cbu: false,
            ownership: false,
            data_dictionary: false,
            derived_attributes: false,
            kyc_token: false,
        }
    }
}

fn bind_case(expr: &Expr) -> Result<Case, BindError> {
    let (head, args) = expr.as_call().ok_or(BindError::MissingCase)?;
    if head != "kyc-case" {
        return Err(BindError::MissingCase);
    }
    let name = match args.first() {
        Some(Expr::Atom(Atom::Ident(s))) => s.clone(),
        Some(other) => {
            return Err(BindError::InvalidClause {
                clause: "kyc-case".to_string(),
                index: other.position().offset,
                message: "case name must be a bare identifier".to_string(),
            })
        }
        None => {
            return Err(BindError::InvalidClause {
                clause: "kyc-case".to_string(),
                index: 0,
                message: "kyc-case requires a name".to_string(),
            })
        }
    };
    if !is_case_name_shaped(&name) {
        return Err(BindError::InvalidCaseName { name });
    }

    let mut case = Case {
        name,
        nature: String::new(),
        purpose: String::new(),
        client_business_unit: String::new(),
        policies: Vec::new(),
        functions: Vec::new(),
        ownership: Vec::new(),
        data_dictionary: Vec::new(),
        document_requirements: Vec::new(),
        derived_attributes: Vec::new(),
        obligations: Vec::new(),
        kyc_token: String::new(),
    };
    let mut seen = Seen::default();

    for clause in &args[1..] {
        let (clause_head, clause_args) = clause.as_call().ok_or_else(|| BindError::InvalidClause {
            clause: "<case body>".to_string(),
            index: clause.position().offset,
            message: "case-body elements must be parenthesized clauses".to_string(),
        })?;

        match clause_head {
            "nature-purpose" => {
                require_unseen(&mut seen.nature_purpose, "nature-purpose", clause)?;
                bind_nature_purpose(clause_args, &mut case)?;
            }
            "client-business-unit" => {
                require_unseen(&mut seen.cbu, "client-business-unit", clause)?;
                case.client_business_unit = expect_ident(clause_args, 0, "client-business-unit")?;
            }
            "policy" => {
                case.policies.push(expect_ident(clause_args, 0, "policy")?);
            }
            "function" => {
                let action_name = expect_ident(clause_args, 0, "function")?;
                let action = FunctionAction::parse(&action_name).ok_or_else(|| {
                    BindError::InvalidClause {
                        clause: "function".to_string(),
                        index: clause.position().offset,
                        message: format!("unknown function action {:?}", action_name),
                    }
                })?;
                case.functions.push(FunctionInvocation::pending(action));
            }
            "obligation" => {
                case.obligations
                    .push(expect_ident(clause_args, 0, "obligation")?);
            }
            "ownership-structure" => {
                require_unseen(&mut seen.ownership, "ownership-structure", clause)?;
                case.ownership = bind_ownership(clause_args)?;
            }
            "data-dictionary" => {
                require_unseen(&mut seen.data_dictionary, "data-dictionary", clause)?;
                case.data_dictionary = bind_data_dictionary(clause_args)?;
            }
            "document-requirements" => {
                case.document_requirements
                    .push(bind_document_requirements(clause_args)?);
            }
            "derived-attributes" => {
                require_unseen(&mut seen.derived_attributes, "derived-attributes", clause)?;
                case.derived_attributes = bind_derived_attributes(clause_args)?;
            }
            "kyc-token" => {
                require_unseen(&mut seen.kyc_token, "kyc-token", clause)?;
                case.kyc_token = expect_string(clause_args, 0, "kyc-token")?;
            }
            other => {
                return Err(BindError::UnknownClause {
                    head: other.to_string(),
                    index: clause.position().offset,
                })
            }
        }
    }

    Ok(case)
}

fn require_unseen(flag: &mut bool, clause: &str, expr: &Expr) -> Result<(), BindError> {
    if *flag {
        return Err(BindError::DuplicateClause {
            clause: clause.to_string(),
            first_index: 0,
            index: expr.position().offset,
        });
    }
    *flag = true;
    Ok(())
}

fn expect_ident(args: &[Expr], idx: usize, clause: &str) -> Result<String, BindError> {
    match args.get(idx) {
        Some(Expr::Atom(Atom::Ident(s))) => {
            if !is_identifier_shaped(s) {
                return Err(BindError::InvalidIdentifier {
                    clause: clause.to_string(),
                    value: s.clone(),
                });
            }
            Ok(s.clone())
        }
        Some(other) => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: other.position().offset,
            message: format!("expected an identifier at argument {}", idx),
        }),
        None => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: 0,
            message: format!("missing required argument {}", idx),
        }),
    }
}

fn expect_string(args: &[Expr], idx: usize, clause: &str) -> Result<String, BindError> {
    match args.get(idx) {
        Some(Expr::Atom(Atom::Str(s))) => Ok(s.clone()),
        Some(other) => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: other.position().offset,
            message: format!("expected a string at argument {}", idx),
        }),
        None => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: 0,
            message: format!("missing required argument {}", idx),
        }),
    }
}

fn expect_percentage(args: &[Expr], idx: usize, clause: &str) -> Result<f64, BindError> {
    match args.get(idx) {
        Some(Expr::Atom(Atom::Percent(n))) => {
            if *n < 0.0 || *n > 100.0 {
                return Err(BindError::InvalidPercentage {
                    clause: clause.to_string(),
                    value: format!("{}%", n),
                });
            }
            Ok(*n)
        }
        Some(other) => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: other.position().offset,
            message: format!("expected a percentage literal at argument {}", idx),
        }),
        None => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: 0,
            message: format!("missing required argument {}", idx),
        }),
    }
}

fn bind_nature_purpose(args: &[Expr], case: &mut Case) -> Result<(), BindError> {
    for sub in args {
        let (head, sub_args) = sub.as_call().ok_or_else(|| BindError::InvalidClause {
            clause: "nature-purpose".to_string(),
            index: sub.position().offset,
            message: "expected (nature ...) or (purpose ...)".to_string(),
        })?;
        match head {
            "nature" => case.nature = expect_string(sub_args, 0, "nature")?,
            "purpose" => case.purpose = expect_string(sub_args, 0, "purpose")?,
            other => {
                return Err(BindError::UnknownClause {
                    head: other.to_string(),
                    index: sub.position().offset,
                })
            }
        }
    }
    Ok(())
}

fn bind_ownership(args: &[Expr]) -> Result<Vec<OwnershipNode>, BindError> {
    let mut nodes = Vec::with_capacity(args.len());
    for node in args {
        let (head, node_args) = node.as_call().ok_or_else(|| BindError::InvalidClause {
            clause: "ownership-structure".to_string(),
            index: node.position().offset,
            message: "expected an owner/beneficial-owner/controller/entity form".to_string(),
        })?;
        let parsed = match head {
            "owner" => OwnershipNode::Owner {
                entity: expect_ident(node_args, 0, "owner")?,
                percentage: expect_percentage(node_args, 1, "owner")?,
            },
            "beneficial-owner" => OwnershipNode::BeneficialOwner {
                entity: expect_ident(node_args, 0, "beneficial-owner")?,
                percentage: expect_percentage(node_args, 1, "beneficial-owner")?,
            },
            "controller" => OwnershipNode::Controller {
                entity: expect_ident(node_args, 0, "controller")?,
                role: expect_string(node_args, 1, "controller")?,
            },
            "entity" => OwnershipNode::Entity {
                entity: expect_ident(node_args, 0, "entity")?,
            },
            other => {
                return Err(BindError::UnknownClause {
                    head: other.to_string(),
                    index: node.position().offset,
                })
            }
        };
        nodes.push(parsed);
    }
    Ok(nodes)
}

fn bind_data_dictionary(args: &[Expr]) -> Result<Vec<DataDictionaryEntry>, BindError> {
    args.iter().map(bind_attribute_def).collect()
}

fn bind_attribute_def(expr: &Expr) -> Result<DataDictionaryEntry, BindError> {
    let (head, args) = expr.as_call().ok_or_else(|| BindError::InvalidClause {
        clause: "data-dictionary".to_string(),
        index: expr.position().offset,
        message: "expected an (attribute ...) form".to_string(),
    })?;
    if head != "attribute" {
        return Err(BindError::UnknownClause {
            head: head.to_string(),
            index: expr.position().offset,
        });
    }
    let attribute = expect_ident(args, 0, "attribute")?;
    let mut primary = None;
    let mut secondary = None;
    let mut tertiary = None;
    for source in &args[1..] {
        let (source_head, source_args) =
            source.as_call().ok_or_else(|| BindError::InvalidClause {
                clause: "attribute".to_string(),
                index: source.position().offset,
                message: "expected a *-source form".to_string(),
            })?;
        let value = bind_source_value(source_args, source_head)?;
        match source_head {
            "primary-source" => primary = Some(value),
            "secondary-source" => secondary = Some(value),
            "tertiary-source" => tertiary = Some(value),
            other => {
                return Err(BindError::UnknownClause {
                    head: other.to_string(),
                    index: source.position().offset,
                })
            }
        }
    }
    let primary = primary.ok_or_else(|| BindError::InvalidClause {
        clause: "attribute".to_string(),
        index: expr.position().offset,
        message: format!("attribute {:?} requires a primary-source", attribute),
    })?;
    Ok(DataDictionaryEntry {
        attribute,
        primary,
        secondary,
        tertiary,
    })
}

fn bind_source_value(args: &[Expr], clause: &str) -> Result<AttributeSource, BindError> {
    match args.first() {
        Some(Expr::List(_, _)) => {
            let (head, inner) = args[0].as_call().ok_or_else(|| BindError::InvalidClause {
                clause: clause.to_string(),
                index: args[0].position().offset,
                message: "expected (document IDENT)".to_string(),
            })?;
            if head != "document" {
                return Err(BindError::UnknownClause {
                    head: head.to_string(),
                    index: args[0].position().offset,
                });
            }
            Ok(AttributeSource::Document(expect_ident(inner, 0, "document")?))
        }
        Some(Expr::Atom(Atom::Str(s))) => {
            if s != "Ops Validation" {
                return Err(BindError::InvalidClause {
                    clause: clause.to_string(),
                    index: 0,
                    message: format!(
                        "string source must be the literal \"Ops Validation\", got {:?}",
                        s
                    ),
                });
            }
            Ok(AttributeSource::OpsValidation)
        }
        Some(other) => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: other.position().offset,
            message: "expected (document IDENT) or \"Ops Validation\"".to_string(),
        }),
        None => Err(BindError::InvalidClause {
            clause: clause.to_string(),
            index: 0,
            message: "missing source value".to_string(),
        }),
    }
}

fn bind_document_requirements(args: &[Expr]) -> Result<DocumentRequirementBlock, BindError> {
    let mut jurisdiction = None;
    let mut documents = Vec::new();
    for sub in args {
        let (head, sub_args) = sub.as_call().ok_or_else(|| BindError::InvalidClause {
            clause: "document-requirements".to_string(),
            index: sub.position().offset,
            message: "expected (jurisdiction ...) or (required ...)".to_string(),
        })?;
        match head {
            "jurisdiction" => jurisdiction = Some(expect_ident(sub_args, 0, "jurisdiction")?),
            "required" => {
                for doc in sub_args {
                    let (doc_head, doc_args) =
                        doc.as_call().ok_or_else(|| BindError::InvalidClause {
                            clause: "required".to_string(),
                            index: doc.position().offset,
                            message: "expected (document IDENT STRING)".to_string(),
                        })?;
                    if doc_head != "document" {
                        return Err(BindError::UnknownClause {
                            head: doc_head.to_string(),
                            index: doc.position().offset,
                        });
                    }
                    documents.push(RequiredDocument {
                        code: expect_ident(doc_args, 0, "document")?,
                        label: expect_string(doc_args, 1, "document")?,
                    });
                }
            }
            other => {
                return Err(BindError::UnknownClause {
                    head: other.to_string(),
                    index: sub.position().offset,
                })
            }
        }
    }
    let jurisdiction = jurisdiction.ok_or_else(|| BindError::InvalidClause {
        clause: "document-requirements".to_string(),
        index: 0,
        message: "missing (jurisdiction IDENT)".to_string(),
    })?;
    Ok(DocumentRequirementBlock {
        jurisdiction,
        documents,
    })
}

fn bind_derived_attributes(args: &[Expr]) -> Result<Vec<Derivation>, BindError> {
    args.iter().map(bind_derivation).collect()
}

fn bind_derivation(expr: &Expr) -> Result<Derivation, BindError> {
    let (head, args) = expr.as_call().ok_or_else(|| BindError::InvalidClause {
        clause: "derived-attributes".to_string(),
        index: expr.position().offset,
        message: "expected an (attribute ...) derivation form".to_string(),
    })?;
    if head != "attribute" {
        return Err(BindError::UnknownClause {
            head: head.to_string(),
            index: expr.position().offset,
        });
    }
    let derived = expect_ident(args, 0, "attribute")?;
    let mut sources = None;
    let mut rule = None;
    let mut jurisdiction = None;
    let mut regulation = None;
    for sub in &args[1..] {
        let (sub_head, sub_args) = sub.as_call().ok_or_else(|| BindError::InvalidClause {
            clause: "attribute".to_string(),
            index: sub.position().offset,
            message: "expected (sources ...), (rule ...), (jurisdiction ...) or (regulation ...)"
                .to_string(),
        })?;
        match sub_head {
            "sources" => {
                let inner = sub_args.first().ok_or_else(|| BindError::InvalidClause {
                    clause: "sources".to_string(),
                    index: sub.position().offset,
                    message: "expected (sources (IDENT ...))".to_string(),
                })?;
                let items = match inner {
                    Expr::List(items, _) => items,
                    _ => {
                        return Err(BindError::InvalidClause {
                            clause: "sources".to_string(),
                            index: inner.position().offset,
                            message: "expected a parenthesized list of identifiers".to_string(),
                        })
                    }
                };
                let mut codes = Vec::with_capacity(items.len());
                for (i, _) in items.iter().enumerate() {
                    codes.push(expect_ident(items, i, "sources")?);
                }
                if codes.is_empty() {
                    return Err(BindError::InvalidClause {
                        clause: "sources".to_string(),
                        index: sub.position().offset,
                        message: "sources must list at least one attribute".to_string(),
                    });
                }
                sources = Some(codes);
            }
            "rule" => rule = Some(expect_string(sub_args, 0, "rule")?),
            "jurisdiction" => jurisdiction = Some(expect_ident(sub_args, 0, "jurisdiction")?),
            "regulation" => regulation = Some(expect_ident(sub_args, 0, "regulation")?),
            other => {
                return Err(BindError::UnknownClause {
                    head: other.to_string(),
                    index: sub.position().offset,
                })
            }
        }
    }
    let sources = sources.ok_or_else(|| BindError::InvalidClause {
        clause: "attribute".to_string(),
        index: expr.position().offset,
        message: format!("derivation {:?} requires (sources ...)", derived),
    })?;
    let rule = rule.ok_or_else(|| BindError::InvalidClause {
        clause: "attribute".to_string(),
        index: expr.position().offset,
        message: format!("derivation {:?} requires (rule \"...\")", derived),
    })?;
    if rule.trim().is_empty() {
        return Err(BindError::InvalidClause {
            clause: "rule".to_string(),
            index: expr.position().offset,
            message: "rule expression must not be empty".to_string(),
        });
    }
    Ok(Derivation {
        derived,
        sources,
        rule,
        jurisdiction,
        regulation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn bind_src(src: &str) -> Case {
        let forms = parser::parse(src).unwrap();
        bind(&forms).unwrap()
    }

    #[test]
    fn binds_minimal_case() {
        let case = bind_src(
            r#"(kyc-case ACME-TEST
              (nature-purpose (nature "Test") (purpose "Unit test"))
              (client-business-unit TEST-UNIT)
              (kyc-token "pending"))"#,
        );
        assert_eq!(case.name, "ACME-TEST");
        assert_eq!(case.nature, "Test");
        assert_eq!(case.kyc_token, "pending");
    }

    #[test]
    fn rejects_bad_case_name() {
        let forms = parser::parse(r#"(kyc-case acme-test (kyc-token "pending"))"#).unwrap();
        let err = bind(&forms).unwrap_err();
        assert!(matches!(err, BindError::InvalidCaseName { .. }));
    }

    #[test]
    fn rejects_duplicate_singular_clause() {
        let forms = parser::parse(
            r#"(kyc-case X
                 (client-business-unit A)
                 (client-business-unit B)
                 (kyc-token "pending"))"#,
        )
        .unwrap();
        let err = bind(&forms).unwrap_err();
        assert!(matches!(err, BindError::DuplicateClause { .. }));
    }

    #[test]
    fn rejects_unknown_function_action() {
        let forms = parser::parse(
            r#"(kyc-case X (function NOT-A-REAL-ACTION) (kyc-token "pending"))"#,
        )
        .unwrap();
        let err = bind(&forms).unwrap_err();
        assert!(matches!(err, BindError::InvalidClause { .. }));
    }

    #[test]
    fn binds_ownership_and_data_dictionary() {
        let case = bind_src(
            r#"(kyc-case X
              (ownership-structure
                (owner ACME 60%)
                (owner BOB 40%)
                (controller ACME "director"))
              (data-dictionary
                (attribute UBO_NAME (primary-source (document PASSPORT))))
              (kyc-token "pending"))"#,
        );
        assert_eq!(case.ownership.len(), 3);
        assert_eq!(case.ownership_sum(), 100.0);
        assert_eq!(case.data_dictionary.len(), 1);
        assert_eq!(
            case.data_dictionary[0].primary,
            AttributeSource::Document("PASSPORT".to_string())
        );
    }

    #[test]
    fn ops_validation_literal_must_match_exactly() {
        let forms = parser::parse(
            r#"(kyc-case X
              (data-dictionary
                (attribute UBO_NAME (primary-source "Wrong Literal")))
              (kyc-token "pending"))"#,
        )
        .unwrap();
        let err = bind(&forms).unwrap_err();
        assert!(matches!(err, BindError::InvalidClause { .. }));
    }
}
