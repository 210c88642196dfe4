//! Surface grammar parser (C3): DSL text -> untyped [`Expr`] AST.
//!
//! Grammar sketch (spec.md §6.1): a document is one or more parenthesized
//! `(kyc-case NAME ...)` forms; atoms are bare identifiers, integer/decimal
//! numbers, `<number>%` percentages, or double-quoted strings; `;` starts a
//! line comment.

use crate::ast::{Atom, Expr};
use crate::error::{ParseError, Position};
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, take_while},
    character::complete::{char, digit1, multispace1, none_of, one_of},
    combinator::{map, opt, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, tuple},
    IResult,
};

/// Parse a full document: one or more top-level `(kyc-case ...)` forms.
pub fn parse(src: &str) -> Result<Vec<Expr>, ParseError> {
    let forms = parse_document(src)?;
    if forms.is_empty() {
        return Err(ParseError::EmptyDocument);
    }
    Ok(forms)
}

/// Parse a single expression (used by the rule evaluator, which re-uses
/// this same S-expression surface for rule bodies).
pub fn parse_one(src: &str) -> Result<Expr, ParseError> {
    let original = src;
    match expr(original, src) {
        Ok((rest, e)) => {
            let (rest_trimmed, _) = skip_ws_comments(rest).unwrap_or((rest, ()));
            if !rest_trimmed.is_empty() {
                return Err(ParseError::TrailingInput {
                    position: offset_to_position(original, rest_trimmed),
                    remainder: rest_trimmed.chars().take(40).collect(),
                });
            }
            Ok(e)
        }
        Err(e) => Err(nom_err_to_parse_error(original, e)),
    }
}

fn parse_document(src: &str) -> Result<Vec<Expr>, ParseError> {
    let original = src;
    let (rest, _) = skip_ws_comments(src).unwrap_or((src, ()));
    match many1(|i| expr(original, i))(rest) {
        Ok((rest2, forms)) => {
            let (rest3, _) = skip_ws_comments(rest2).unwrap_or((rest2, ()));
            if !rest3.is_empty() {
                return Err(ParseError::TrailingInput {
                    position: offset_to_position(original, rest3),
                    remainder: rest3.chars().take(40).collect(),
                });
            }
            Ok(forms)
        }
        Err(e) => Err(nom_err_to_parse_error(original, e)),
    }
}

fn nom_err_to_parse_error(original: &str, e: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match e {
        nom::Err::Incomplete(_) => ParseError::UnexpectedEof {
            context: "expression".to_string(),
            position: offset_to_position(original, ""),
        },
        nom::Err::Error(inner) | nom::Err::Failure(inner) => ParseError::UnexpectedToken {
            context: "expression".to_string(),
            found: inner.input.chars().take(20).collect(),
            position: offset_to_position(original, inner.input),
        },
    }
}

fn offset_to_position(original: &str, rest: &str) -> Position {
    let offset = original.len() - rest.len();
    let consumed = &original[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = match consumed.rfind('\n') {
        Some(idx) => offset - idx,
        None => offset + 1,
    };
    Position {
        offset,
        line,
        column,
    }
}

/// Whitespace and `;` line comments, zero or more times.
fn skip_ws_comments(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char(';'), take_while(|c: char| c != '\n'))),
        ))),
    )(input)
}

fn ident_atom(input: &str) -> IResult<&str, Atom> {
    map(
        recognize(pair(
            one_of("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_"),
            take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
        )),
        |s: &str| Atom::Ident(s.to_string()),
    )(input)
}

fn number_text(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)
}

fn number_or_percent_atom(input: &str) -> IResult<&str, Atom> {
    map(pair(number_text, opt(char('%'))), |(text, pct)| {
        let n: f64 = text.parse().unwrap_or(0.0);
        if pct.is_some() {
            Atom::Percent(n)
        } else {
            Atom::Number(n)
        }
    })(input)
}

fn quoted_string_atom(input: &str) -> IResult<&str, Atom> {
    map(
        delimited(
            char('"'),
            map(
                opt(escaped_transform(
                    none_of("\\\""),
                    '\\',
                    alt((
                        value('\\', char('\\')),
                        value('"', char('"')),
                        value('\n', char('n')),
                        value('\t', char('t')),
                    )),
                )),
                |s: Option<String>| s.unwrap_or_default(),
            ),
            char('"'),
        ),
        Atom::Str,
    )(input)
}

fn atom(input: &str) -> IResult<&str, Atom> {
    alt((quoted_string_atom, number_or_percent_atom, ident_atom))(input)
}

/// Parse a single expression, tracking the byte offset relative to
/// `original` so positions survive recursive descent.
fn expr<'a>(original: &str, input: &'a str) -> IResult<&'a str, Expr> {
    let (input, _) = skip_ws_comments(input)?;
    alt((
        map(
            |i| delimited_list(original, i, '(', ')'),
            |(items, pos)| Expr::List(items, pos),
        ),
        map(
            |i| delimited_list(original, i, '[', ']'),
            |(items, pos)| Expr::BracketList(items, pos),
        ),
        map(atom, Expr::Atom),
    ))(input)
}

/// Parses a `open ... close` delimited sequence of expressions; used for
/// both parenthesized lists (clauses, calls) and bracket-list literals
/// (spec.md §4.3 `in` membership lists, e.g. `["IR" "KP" "SY"]`).
fn delimited_list<'a>(
    original: &str,
    input: &'a str,
    open: char,
    close: char,
) -> IResult<&'a str, (Vec<Expr>, Position)> {
    let start_pos = offset_to_position(original, input);
    let (input, _) = char(open)(input)?;
    let (input, _) = skip_ws_comments(input)?;
    let (input, items) = many0(|i| {
        let (i, e) = expr(original, i)?;
        let (i, _) = skip_ws_comments(i)?;
        Ok((i, e))
    })(input)?;
    let (input, _) = char(close)(input)?;
    Ok((input, (items, start_pos)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Atom, Expr};

    #[test]
    fn parses_minimal_case() {
        let src = r#"(kyc-case ACME-TEST
          (nature-purpose (nature "Test") (purpose "Unit test"))
          (client-business-unit TEST-UNIT)
          (kyc-token "pending"))"#;
        let forms = parse(src).unwrap();
        assert_eq!(forms.len(), 1);
        let (head, args) = forms[0].as_call().unwrap();
        assert_eq!(head, "kyc-case");
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn parses_percent_and_string() {
        let src = r#"(owner ACME-Corp 45.5%)"#;
        let forms = parse(src).unwrap();
        let (head, args) = forms[0].as_call().unwrap();
        assert_eq!(head, "owner");
        assert_eq!(args[0], Expr::Atom(Atom::Ident("ACME-Corp".to_string())));
        assert_eq!(args[1], Expr::Atom(Atom::Percent(45.5)));
    }

    #[test]
    fn handles_comments() {
        let src = "(kyc-case X ; trailing comment\n  (kyc-token \"pending\"))";
        let forms = parse(src).unwrap();
        assert_eq!(forms.len(), 1);
    }

    #[test]
    fn rejects_empty_document() {
        assert!(matches!(
            parse("   ; only a comment\n"),
            Err(ParseError::EmptyDocument)
        ));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = parse("(kyc-case X) stray").unwrap_err();
        assert!(matches!(err, ParseError::TrailingInput { .. }));
    }

    #[test]
    fn escapes_round_trip_in_strings() {
        let src = r#"(nature "Say \"hi\"")"#;
        let forms = parse(src).unwrap();
        let (_, args) = forms[0].as_call().unwrap();
        assert_eq!(args[0], Expr::Atom(Atom::Str("Say \"hi\"".to_string())));
    }

    #[test]
    fn multiple_top_level_cases() {
        let src = "(kyc-case A (kyc-token \"pending\")) (kyc-case B (kyc-token \"pending\"))";
        let forms = parse(src).unwrap();
        assert_eq!(forms.len(), 2);
    }
}
