//! Executor (C8): deterministically interprets an [`Instruction`] plan
//! against an [`ExecutionContext`], producing a result state.
//!
//! Single-threaded, synchronous, finite (spec.md §5). Before execution the
//! context is empty; after execution it is a complete snapshot of the
//! plan's execution-relevant fields (spec.md §4.4.2).

use crate::error::ExecError;
use crate::instruction::{opcodes, Instruction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerEdge {
    pub entity: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerEdge {
    pub entity: String,
    pub role: String,
}

/// Pending/complete/failed function invocations recorded during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedFunction {
    pub action: String,
}

/// Mutable state threaded through instruction execution (spec.md §4.4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub case_id: Option<String>,
    pub nature: Option<String>,
    pub purpose: Option<String>,
    pub client_business_unit: Option<String>,
    pub policies: Vec<String>,
    pub functions: Vec<ExecutedFunction>,
    pub obligations: Vec<String>,
    pub owners: Vec<OwnerEdge>,
    pub beneficial_owners: Vec<OwnerEdge>,
    pub controllers: Vec<ControllerEdge>,
    pub kyc_token: Option<String>,
    /// Scratch stack for the `push` opcode.
    pub stack: Vec<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Execute a compiled plan (JSON) and return the resulting context as JSON.
pub fn execute(plan_json: &str) -> Result<String, ExecError> {
    let plan: Vec<Instruction> =
        serde_json::from_str(plan_json).map_err(|e| ExecError::InvalidJson(e.to_string()))?;
    let ctx = execute_plan(&plan)?;
    serde_json::to_string(&ctx).map_err(|e| ExecError::InvalidJson(e.to_string()))
}

/// Execute an already-decoded plan, returning the final context directly
/// (used by the amendment engine, which never serializes the plan to JSON).
pub fn execute_plan(plan: &[Instruction]) -> Result<ExecutionContext, ExecError> {
    let mut ctx = ExecutionContext::new();
    for (index, instruction) in plan.iter().enumerate() {
        execute_instruction(index, instruction, &mut ctx)?;
    }
    Ok(ctx)
}

fn execute_instruction(
    index: usize,
    instruction: &Instruction,
    ctx: &mut ExecutionContext,
) -> Result<(), ExecError> {
    let args = &instruction.args;
    let fail = |message: String| ExecError::InstructionFailed {
        index,
        opcode: instruction.opcode.clone(),
        message,
    };
    match instruction.opcode.as_str() {
        opcodes::INIT_CASE => ctx.case_id = Some(require(args, 0, &fail)?),
        opcodes::NATURE => ctx.nature = Some(require(args, 0, &fail)?),
        opcodes::PURPOSE => ctx.purpose = Some(require(args, 0, &fail)?),
        opcodes::CLIENT_BUSINESS_UNIT => {
            ctx.client_business_unit = Some(require(args, 0, &fail)?)
        }
        opcodes::POLICY => ctx.policies.push(require(args, 0, &fail)?),
        opcodes::FUNCTION => ctx.functions.push(ExecutedFunction {
            action: require(args, 0, &fail)?,
        }),
        opcodes::OBLIGATION => ctx.obligations.push(require(args, 0, &fail)?),
        opcodes::OWNER => {
            let entity = require(args, 0, &fail)?;
            let percentage = require_f64(args, 1, &fail)?;
            ctx.owners.push(OwnerEdge { entity, percentage });
        }
        opcodes::BENEFICIAL_OWNER => {
            let entity = require(args, 0, &fail)?;
            let percentage = require_f64(args, 1, &fail)?;
            ctx.beneficial_owners.push(OwnerEdge { entity, percentage });
        }
        opcodes::CONTROLLER => {
            let entity = require(args, 0, &fail)?;
            let role = require(args, 1, &fail)?;
            ctx.controllers.push(ControllerEdge { entity, role });
        }
        opcodes::KYC_TOKEN => ctx.kyc_token = Some(require(args, 0, &fail)?),
        opcodes::PUSH => ctx.stack.push(require(args, 0, &fail)?),
        other => return Err(fail(format!("unknown opcode {:?}", other))),
    }
    Ok(())
}

fn require(
    args: &[String],
    idx: usize,
    fail: &dyn Fn(String) -> ExecError,
) -> Result<String, ExecError> {
    args.get(idx)
        .cloned()
        .ok_or_else(|| fail(format!("missing argument {}", idx)))
}

fn require_f64(
    args: &[String],
    idx: usize,
    fail: &dyn Fn(String) -> ExecError,
) -> Result<f64, ExecError> {
    let raw = require(args, idx, fail)?;
    raw.parse::<f64>()
        .map_err(|_| fail(format!("argument {} ({:?}) is not numeric", idx, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executes_simple_plan() {
        let plan = vec![
            Instruction::new(opcodes::INIT_CASE, vec!["TEST-CASE".to_string()]),
            Instruction::new(opcodes::NATURE, vec!["Corporate".to_string()]),
            Instruction::new(opcodes::KYC_TOKEN, vec!["pending".to_string()]),
        ];
        let ctx = execute_plan(&plan).unwrap();
        assert_eq!(ctx.case_id.as_deref(), Some("TEST-CASE"));
        assert_eq!(ctx.nature.as_deref(), Some("Corporate"));
        assert_eq!(ctx.kyc_token.as_deref(), Some("pending"));
    }

    #[test]
    fn executes_owner_instruction() {
        let plan = vec![Instruction::new(
            opcodes::OWNER,
            vec!["ACME-Corp".to_string(), "45.5".to_string()],
        )];
        let ctx = execute_plan(&plan).unwrap();
        assert_eq!(ctx.owners[0].entity, "ACME-Corp");
        assert_eq!(ctx.owners[0].percentage, 45.5);
    }

    #[test]
    fn rejects_missing_args() {
        let plan = vec![Instruction::new(opcodes::INIT_CASE, vec![])];
        let err = execute_plan(&plan).unwrap_err();
        assert!(matches!(err, ExecError::InstructionFailed { .. }));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = execute("not json").unwrap_err();
        assert!(matches!(err, ExecError::InvalidJson(_)));
    }

    #[test]
    fn rejects_non_numeric_percentage() {
        let plan = vec![Instruction::new(
            opcodes::OWNER,
            vec!["ACME".to_string(), "not-a-number".to_string()],
        )];
        let err = execute_plan(&plan).unwrap_err();
        assert!(matches!(err, ExecError::InstructionFailed { .. }));
    }
}
