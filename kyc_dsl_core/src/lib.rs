//! Core DSL pipeline: parse -> bind -> serialize/compile -> execute, plus
//! the standalone rule evaluator used by derived attributes.
//!
//! Each stage is pure, synchronous and owns no shared mutable state
//! (spec.md §5), so every public function here is safe to call
//! concurrently from many requests.

pub mod ast;
pub mod binder;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod instruction;
pub mod model;
pub mod parser;
pub mod rule;
pub mod serializer;

pub use error::{BindError, CompileError, DslError, ExecError, ParseError, RuleError};
pub use instruction::Instruction;
pub use model::Case;

/// Parse and bind DSL source straight into a typed [`Case`].
pub fn parse_and_bind(src: &str) -> Result<Case, DslError> {
    let forms = parser::parse(src)?;
    let case = binder::bind(&forms)?;
    Ok(case)
}

/// Compile DSL source into an instruction plan, serialized as JSON.
pub fn compile_dsl(src: &str) -> Result<String, DslError> {
    let case = parse_and_bind(src)?;
    let plan = compiler::compile(&case)?;
    serde_json::to_string(&plan).map_err(|e| DslError::InvalidJson(e.to_string()))
}

/// Execute a compiled plan (JSON) and return the resulting context (JSON).
pub fn execute_plan(plan_json: &str) -> Result<String, DslError> {
    Ok(executor::execute(plan_json)?)
}

/// Canonicalize DSL source: parse, bind, and serialize back to text.
/// Round-trip stable (spec.md §4.1.3).
pub fn canonicalize(src: &str) -> Result<String, DslError> {
    let case = parse_and_bind(src)?;
    Ok(serializer::serialize(&case))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"(kyc-case ACME-001
      (nature-purpose (nature "Corporate") (purpose "Investment"))
      (client-business-unit WEALTH-MGMT)
      (function DISCOVER-POLICIES)
      (kyc-token "pending"))"#;

    #[test]
    fn full_pipeline_parses_compiles_and_executes() {
        let case = parse_and_bind(MINIMAL).unwrap();
        assert_eq!(case.name, "ACME-001");

        let plan_json = compile_dsl(MINIMAL).unwrap();
        let result_json = execute_plan(&plan_json).unwrap();
        assert!(result_json.contains("ACME-001"));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let once = canonicalize(MINIMAL).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert_eq!(once, twice);
    }
}
