use crate::error::Position;
use serde::{Deserialize, Serialize};

/// A leaf token of the surface grammar (spec.md §6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    /// A bare identifier: `[A-Za-z_][A-Za-z0-9_-]*`.
    Ident(String),
    /// A double-quoted, backslash-escaped string.
    Str(String),
    /// An integer or decimal literal.
    Number(f64),
    /// A `<number>%` literal; the stored value excludes the `%` sign.
    Percent(f64),
}

impl Atom {
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Atom::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str_lit(&self) -> Option<&str> {
        match self {
            Atom::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render the atom back to surface-grammar text (used by both the
    /// compiler's `expr_to_string` fallback and diagnostics).
    pub fn to_text(&self) -> String {
        match self {
            Atom::Ident(s) => s.clone(),
            Atom::Str(s) => format!("\"{}\"", escape_string(s)),
            Atom::Number(n) => format_number(*n),
            Atom::Percent(n) => format!("{}%", format_number(*n)),
        }
    }
}

pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Format a number the way the serializer needs it: no trailing zeros
/// beyond what's required, no trailing decimal point.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.6}", n);
        let s = s.trim_end_matches('0');
        let s = s.trim_end_matches('.');
        s.to_string()
    }
}

/// An untyped S-expression node: either a single atom, a parenthesized
/// list whose first element is conventionally the clause head, or a
/// bracket-delimited list literal (spec.md §4.3, `["IR" "KP" "SY"]`), the
/// surface form for `in`'s membership-list operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Atom(Atom),
    List(Vec<Expr>, #[serde(skip)] Position),
    BracketList(Vec<Expr>, #[serde(skip)] Position),
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Atom(_) => Position::default(),
            Expr::List(_, pos) | Expr::BracketList(_, pos) => *pos,
        }
    }

    /// If this is a `List` whose first element is `Atom::Ident`, return
    /// (head, rest-of-the-list).
    pub fn as_call(&self) -> Option<(&str, &[Expr])> {
        match self {
            Expr::List(items, _) => match items.first() {
                Some(Expr::Atom(Atom::Ident(head))) => Some((head.as_str(), &items[1..])),
                _ => None,
            },
            Expr::Atom(_) | Expr::BracketList(_, _) => None,
        }
    }
}
