use thiserror::Error;

/// A source position within the original DSL text, used to pinpoint
/// parse/bind errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors raised by the parser (C3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input while reading {context} at {position}")]
    UnexpectedEof { context: String, position: Position },
    #[error("unexpected token {found:?} while reading {context} at {position}")]
    UnexpectedToken {
        context: String,
        found: String,
        position: Position,
    },
    #[error("unterminated string literal starting at {position}")]
    UnterminatedString { position: Position },
    #[error("expected at least one top-level (kyc-case ...) form")]
    EmptyDocument,
    #[error("trailing input after last top-level form at {position}: {remainder:?}")]
    TrailingInput { position: Position, remainder: String },
}

/// Errors raised by the binder (C4): AST -> typed case model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("clause {clause:?} at position {index}: {message}")]
    InvalidClause {
        clause: String,
        index: usize,
        message: String,
    },
    #[error("unknown clause head {head:?} at position {index}")]
    UnknownClause { head: String, index: usize },
    #[error("duplicate clause {clause:?} is not permitted (first seen at position {first_index}, repeated at {index})")]
    DuplicateClause {
        clause: String,
        first_index: usize,
        index: usize,
    },
    #[error("case name {name:?} is not identifier-shaped (expected [A-Z0-9][A-Z0-9-]*)")]
    InvalidCaseName { name: String },
    #[error("identifier {value:?} in clause {clause:?} is not identifier-shaped")]
    InvalidIdentifier { clause: String, value: String },
    #[error("percentage {value:?} in clause {clause:?} is not a valid percentage literal")]
    InvalidPercentage { clause: String, value: String },
    #[error("duplicate identifier {value:?} within {clause:?}")]
    DuplicateIdentifier { clause: String, value: String },
    #[error("the document did not contain a (kyc-case ...) form")]
    MissingCase,
}

/// Errors raised by the compiler (C7): typed model -> instruction plan.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("instruction {opcode:?} at index {index} expected {expected} argument(s), got {got}")]
    ArityMismatch {
        opcode: String,
        index: usize,
        expected: usize,
        got: usize,
    },
    #[error("unknown function action {action:?} at index {index}")]
    UnknownFunctionAction { action: String, index: usize },
}

/// Errors raised by the executor (C8).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("instruction at index {index} ({opcode:?}): {message}")]
    InstructionFailed {
        index: usize,
        opcode: String,
        message: String,
    },
    #[error("invalid instruction plan JSON: {0}")]
    InvalidJson(String),
}

/// Errors raised by the rule evaluator (C10).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("unbound attribute {0:?} in rule expression")]
    UnboundAttribute(String),
    #[error("type mismatch in {operator:?}: {message}")]
    TypeMismatch { operator: String, message: String },
    #[error("division by zero in arithmetic expression")]
    DivisionByZero,
    #[error("operator {operator:?} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        operator: String,
        expected: String,
        got: usize,
    },
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),
    #[error("`case` expression requires a trailing (else <value>) clause")]
    MissingElseClause,
    #[error("malformed rule expression: {0}")]
    Malformed(String),
}

/// Umbrella error for the whole DSL pipeline (spec.md §7 taxonomy, core
/// subset). Transport/service crates wrap this further.
#[derive(Debug, Error)]
pub enum DslError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("bind error: {0}")]
    Bind(#[from] BindError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("execution error: {0}")]
    Exec(#[from] ExecError),
    #[error("rule evaluation error: {0}")]
    Rule(#[from] RuleError),
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}
