//! Rule evaluator (C10): evaluates a derived-attribute rule expression
//! (spec.md §4.3) over a fact map.
//!
//! Eager, left-to-right, over a closed operator set. The only
//! non-deterministic operator is `now`; callers inject a [`Clock`] so tests
//! are reproducible. `registry-active?` is an abstract external oracle,
//! injected the same way.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::ast::{Atom, Expr};
use crate::error::RuleError;
use crate::parser;

/// A runtime value produced or consumed by rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Str(String),
    List(Vec<String>),
    Date(NaiveDate),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Date(_) => "date",
        }
    }

    fn as_number(&self, operator: &str) -> Result<f64, RuleError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(RuleError::TypeMismatch {
                operator: operator.to_string(),
                message: format!("expected number, got {}", other.type_name()),
            }),
        }
    }

    fn as_bool(&self, operator: &str) -> Result<bool, RuleError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuleError::TypeMismatch {
                operator: operator.to_string(),
                message: format!("expected boolean, got {}", other.type_name()),
            }),
        }
    }

    fn as_list(&self, operator: &str) -> Result<&[String], RuleError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(RuleError::TypeMismatch {
                operator: operator.to_string(),
                message: format!("expected list, got {}", other.type_name()),
            }),
        }
    }
}

/// Fact map: derived/source attribute codes to their current value.
pub type FactMap = HashMap<String, Value>;

/// Injection point for `now` (spec.md §4.3 Determinism).
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

/// A clock fixed to one date, for deterministic tests.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Injection point for the external `registry-active?` oracle. Production
/// callers wire this to the out-of-scope registry service; it is never
/// implemented inside the core.
pub trait RegistryOracle {
    fn is_active(&self, entity: &str, jurisdiction: &str) -> Result<bool, RuleError>;
}

/// An oracle stub returning a fixed answer, for tests.
pub struct StubOracle(pub bool);

impl RegistryOracle for StubOracle {
    fn is_active(&self, _entity: &str, _jurisdiction: &str) -> Result<bool, RuleError> {
        Ok(self.0)
    }
}

/// Parse and evaluate a rule expression's source text against a fact map.
pub fn eval_str(
    rule_text: &str,
    facts: &FactMap,
    clock: &dyn Clock,
    oracle: &dyn RegistryOracle,
) -> Result<Value, RuleError> {
    let expr = parser::parse_one(rule_text)
        .map_err(|e| RuleError::Malformed(format!("{}", e)))?;
    eval(&expr, facts, clock, oracle)
}

pub fn eval(
    expr: &Expr,
    facts: &FactMap,
    clock: &dyn Clock,
    oracle: &dyn RegistryOracle,
) -> Result<Value, RuleError> {
    match expr {
        Expr::Atom(Atom::Ident(name)) if name == "true" => Ok(Value::Bool(true)),
        Expr::Atom(Atom::Ident(name)) if name == "false" => Ok(Value::Bool(false)),
        Expr::Atom(Atom::Ident(name)) => facts
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::UnboundAttribute(name.clone())),
        Expr::Atom(Atom::Str(s)) => Ok(Value::Str(s.clone())),
        Expr::Atom(Atom::Number(n)) => Ok(Value::Number(*n)),
        Expr::Atom(Atom::Percent(n)) => Ok(Value::Number(*n)),
        Expr::List(items, _) if items.is_empty() => {
            Err(RuleError::Malformed("empty expression".to_string()))
        }
        Expr::List(items, _) if items.iter().all(|i| matches!(i, Expr::Atom(Atom::Str(_)))) => {
            let strings = items
                .iter()
                .map(|i| match i {
                    Expr::Atom(Atom::Str(s)) => s.clone(),
                    _ => unreachable!(),
                })
                .collect();
            Ok(Value::List(strings))
        }
        Expr::BracketList(items, _) => {
            let strings = items
                .iter()
                .map(|i| match i {
                    Expr::Atom(Atom::Str(s)) => Ok(s.clone()),
                    other => Err(RuleError::Malformed(format!(
                        "bracket-list literal items must be strings, found {:?}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(strings))
        }
        Expr::List(_, _) => {
            let (head, rest) = expr
                .as_call()
                .ok_or_else(|| RuleError::Malformed("expected an operator call".to_string()))?;
            eval_call(head, rest, facts, clock, oracle)
        }
    }
}

fn eval_call(
    head: &str,
    rest: &[Expr],
    facts: &FactMap,
    clock: &dyn Clock,
    oracle: &dyn RegistryOracle,
) -> Result<Value, RuleError> {
    match head {
        "if" => {
            arity(head, rest.len(), 3)?;
            let cond = eval(&rest[0], facts, clock, oracle)?.as_bool("if")?;
            if cond {
                eval(&rest[1], facts, clock, oracle)
            } else {
                eval(&rest[2], facts, clock, oracle)
            }
        }
        "and" => {
            for e in rest {
                if !eval(e, facts, clock, oracle)?.as_bool("and")? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        "or" => {
            for e in rest {
                if eval(e, facts, clock, oracle)?.as_bool("or")? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "not" => {
            arity(head, rest.len(), 1)?;
            let v = eval(&rest[0], facts, clock, oracle)?.as_bool("not")?;
            Ok(Value::Bool(!v))
        }
        "=" | "!=" | "<" | "<=" | ">" | ">=" => eval_comparison(head, rest, facts, clock, oracle),
        "in" => {
            arity(head, rest.len(), 2)?;
            let needle = eval(&rest[0], facts, clock, oracle)?;
            let haystack = eval(&rest[1], facts, clock, oracle)?.as_list("in")?.to_vec();
            let needle = match needle {
                Value::Str(s) => s,
                other => {
                    return Err(RuleError::TypeMismatch {
                        operator: "in".to_string(),
                        message: format!("expected string, got {}", other.type_name()),
                    })
                }
            };
            Ok(Value::Bool(haystack.iter().any(|s| s == &needle)))
        }
        "+" | "-" | "*" | "/" | "max" | "min" => eval_arithmetic(head, rest, facts, clock, oracle),
        "sum" => {
            let mut total = 0.0;
            for e in rest {
                total += eval(e, facts, clock, oracle)?.as_number("sum")?;
            }
            Ok(Value::Number(total))
        }
        "now" => {
            arity(head, rest.len(), 0)?;
            Ok(Value::Date(clock.today()))
        }
        "year" => {
            arity(head, rest.len(), 1)?;
            match eval(&rest[0], facts, clock, oracle)? {
                Value::Date(d) => Ok(Value::Number(d.year() as f64)),
                other => Err(RuleError::TypeMismatch {
                    operator: "year".to_string(),
                    message: format!("expected date, got {}", other.type_name()),
                }),
            }
        }
        "case" => eval_case(rest, facts, clock, oracle),
        "registry-active?" => {
            arity(head, rest.len(), 2)?;
            let entity = eval_string_like(&rest[0], facts, clock, oracle, "registry-active?")?;
            let jurisdiction = eval_string_like(&rest[1], facts, clock, oracle, "registry-active?")?;
            Ok(Value::Bool(oracle.is_active(&entity, &jurisdiction)?))
        }
        other => Err(RuleError::UnknownOperator(other.to_string())),
    }
}

fn eval_string_like(
    expr: &Expr,
    facts: &FactMap,
    clock: &dyn Clock,
    oracle: &dyn RegistryOracle,
    operator: &str,
) -> Result<String, RuleError> {
    match eval(expr, facts, clock, oracle)? {
        Value::Str(s) => Ok(s),
        other => Err(RuleError::TypeMismatch {
            operator: operator.to_string(),
            message: format!("expected string, got {}", other.type_name()),
        }),
    }
}

fn eval_comparison(
    op: &str,
    rest: &[Expr],
    facts: &FactMap,
    clock: &dyn Clock,
    oracle: &dyn RegistryOracle,
) -> Result<Value, RuleError> {
    arity(op, rest.len(), 2)?;
    let lhs = eval(&rest[0], facts, clock, oracle)?;
    let rhs = eval(&rest[1], facts, clock, oracle)?;
    let result = match op {
        "=" => values_equal(&lhs, &rhs),
        "!=" => !values_equal(&lhs, &rhs),
        "<" | "<=" | ">" | ">=" => {
            let a = lhs.as_number(op)?;
            let b = rhs.as_number(op)?;
            match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                ">=" => a >= b,
                _ => unreachable!(),
            }
        }
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        _ => false,
    }
}

fn eval_arithmetic(
    op: &str,
    rest: &[Expr],
    facts: &FactMap,
    clock: &dyn Clock,
    oracle: &dyn RegistryOracle,
) -> Result<Value, RuleError> {
    arity(op, rest.len(), 2)?;
    let a = eval(&rest[0], facts, clock, oracle)?.as_number(op)?;
    let b = eval(&rest[1], facts, clock, oracle)?.as_number(op)?;
    let result = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => {
            if b == 0.0 {
                return Err(RuleError::DivisionByZero);
            }
            a / b
        }
        "max" => a.max(b),
        "min" => a.min(b),
        _ => unreachable!(),
    };
    Ok(Value::Number(result))
}

/// `(case <expr> (<list> <value>)… (else <value>))`: left-to-right
/// first-match against the probe's membership in each list; `else` is
/// mandatory.
fn eval_case(
    rest: &[Expr],
    facts: &FactMap,
    clock: &dyn Clock,
    oracle: &dyn RegistryOracle,
) -> Result<Value, RuleError> {
    if rest.is_empty() {
        return Err(RuleError::Malformed(
            "`case` requires a probe expression".to_string(),
        ));
    }
    let probe = eval(&rest[0], facts, clock, oracle)?;
    for branch in &rest[1..] {
        let items = match branch {
            Expr::List(items, _) if items.len() == 2 => items,
            _ => {
                return Err(RuleError::Malformed(
                    "`case` branch must be a 2-element (<selector> <value>) list".to_string(),
                ))
            }
        };
        let (selector, value) = (&items[0], &items[1]);
        if matches!(selector, Expr::Atom(Atom::Ident(name)) if name == "else") {
            return eval(value, facts, clock, oracle);
        }
        let candidates = eval(selector, facts, clock, oracle)?.as_list("case")?.to_vec();
        let p = match &probe {
            Value::Str(p) => p,
            other => {
                return Err(RuleError::TypeMismatch {
                    operator: "case".to_string(),
                    message: format!("expected string probe, got {}", other.type_name()),
                })
            }
        };
        if candidates.iter().any(|c| c == p) {
            return eval(value, facts, clock, oracle);
        }
    }
    Err(RuleError::MissingElseClause)
}

fn arity(operator: &str, got: usize, expected: usize) -> Result<(), RuleError> {
    if got != expected {
        return Err(RuleError::ArityMismatch {
            operator: operator.to_string(),
            expected: expected.to_string(),
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(pairs: &[(&str, Value)]) -> FactMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2026, 7, 26).unwrap())
    }

    #[test]
    fn evaluates_boolean_and_comparison() {
        let facts = facts(&[("RISK_SCORE", Value::Number(75.0))]);
        let v = eval_str(
            "(if (> RISK_SCORE 50) \"high\" \"low\")",
            &facts,
            &clock(),
            &StubOracle(false),
        )
        .unwrap();
        assert_eq!(v, Value::Str("high".to_string()));
    }

    #[test]
    fn evaluates_in_membership_with_bracket_list_literal() {
        let facts = facts(&[("TAX_RESIDENCY_COUNTRY", Value::Str("IR".to_string()))]);
        let v = eval_str(
            "(in TAX_RESIDENCY_COUNTRY [\"IR\" \"KP\"])",
            &facts,
            &clock(),
            &StubOracle(false),
        )
        .unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    /// spec.md §8.2 S6, reproduced verbatim.
    #[test]
    fn s6_rule_evaluator_scenario() {
        let rule = r#"(if (in TAX_RESIDENCY_COUNTRY ["IR" "KP" "SY"]) true false)"#;

        let sanctioned = facts(&[("TAX_RESIDENCY_COUNTRY", Value::Str("IR".to_string()))]);
        let v = eval_str(rule, &sanctioned, &clock(), &StubOracle(false)).unwrap();
        assert_eq!(v, Value::Bool(true));

        let unsanctioned = facts(&[("TAX_RESIDENCY_COUNTRY", Value::Str("US".to_string()))]);
        let v = eval_str(rule, &unsanctioned, &clock(), &StubOracle(false)).unwrap();
        assert_eq!(v, Value::Bool(false));
    }

    #[test]
    fn evaluates_case_with_else() {
        let facts = facts(&[("JURISDICTION", Value::Str("UK".to_string()))]);
        let v = eval_str(
            "(case JURISDICTION ((\"UK\" \"IE\") \"EU\") (else \"OTHER\"))",
            &facts,
            &clock(),
            &StubOracle(false),
        )
        .unwrap();
        assert_eq!(v, Value::Str("EU".to_string()));
    }

    #[test]
    fn rejects_case_without_else() {
        let facts = facts(&[("JURISDICTION", Value::Str("US".to_string()))]);
        let err = eval_str(
            "(case JURISDICTION ((\"UK\") \"EU\"))",
            &facts,
            &clock(),
            &StubOracle(false),
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::MissingElseClause));
    }

    #[test]
    fn now_uses_injected_clock() {
        let v = eval_str("(year (now))", &FactMap::new(), &clock(), &StubOracle(false)).unwrap();
        assert_eq!(v, Value::Number(2026.0));
    }

    #[test]
    fn rejects_unbound_attribute() {
        let err = eval_str("(> MISSING 1)", &FactMap::new(), &clock(), &StubOracle(false))
            .unwrap_err();
        assert!(matches!(err, RuleError::UnboundAttribute(_)));
    }

    #[test]
    fn rejects_division_by_zero() {
        let err = eval_str("(/ 1 0)", &FactMap::new(), &clock(), &StubOracle(false)).unwrap_err();
        assert!(matches!(err, RuleError::DivisionByZero));
    }

    #[test]
    fn delegates_to_registry_oracle() {
        let v = eval_str(
            "(registry-active? \"ACME\" \"UK\")",
            &FactMap::new(),
            &clock(),
            &StubOracle(true),
        )
        .unwrap();
        assert_eq!(v, Value::Bool(true));
    }
}
