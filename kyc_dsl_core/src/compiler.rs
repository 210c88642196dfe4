//! Compiler (C7): typed [`Case`] model -> linear [`Instruction`] plan.
//!
//! Lowers only the execution-relevant fields (identity, nature/purpose, CBU,
//! policies, functions, obligations, ownership, token) into the closed
//! opcode set of spec.md §4.4.1. `data-dictionary`, `document-requirements`
//! and `derived-attributes` are data, not procedure, and are consulted
//! directly off the typed model by the validator; they have no opcode.

use crate::error::CompileError;
use crate::instruction::{opcodes, Instruction};
use crate::model::{Case, OwnershipNode};

pub fn compile(case: &Case) -> Result<Vec<Instruction>, CompileError> {
    let mut plan = Vec::new();

    push(&mut plan, opcodes::INIT_CASE, vec![case.name.clone()])?;
    if !case.nature.is_empty() {
        push(&mut plan, opcodes::NATURE, vec![case.nature.clone()])?;
    }
    if !case.purpose.is_empty() {
        push(&mut plan, opcodes::PURPOSE, vec![case.purpose.clone()])?;
    }
    if !case.client_business_unit.is_empty() {
        push(
            &mut plan,
            opcodes::CLIENT_BUSINESS_UNIT,
            vec![case.client_business_unit.clone()],
        )?;
    }
    for policy in &case.policies {
        push(&mut plan, opcodes::POLICY, vec![policy.clone()])?;
    }
    for f in &case.functions {
        push(&mut plan, opcodes::FUNCTION, vec![f.action.as_str().to_string()])?;
    }
    for node in &case.ownership {
        match node {
            OwnershipNode::Owner { entity, percentage } => push(
                &mut plan,
                opcodes::OWNER,
                vec![entity.clone(), percentage.to_string()],
            )?,
            OwnershipNode::BeneficialOwner { entity, percentage } => push(
                &mut plan,
                opcodes::BENEFICIAL_OWNER,
                vec![entity.clone(), percentage.to_string()],
            )?,
            OwnershipNode::Controller { entity, role } => push(
                &mut plan,
                opcodes::CONTROLLER,
                vec![entity.clone(), role.clone()],
            )?,
            OwnershipNode::Entity { .. } => {}
        }
    }
    for obligation in &case.obligations {
        push(&mut plan, opcodes::OBLIGATION, vec![obligation.clone()])?;
    }
    if !case.kyc_token.is_empty() {
        push(&mut plan, opcodes::KYC_TOKEN, vec![case.kyc_token.clone()])?;
    }

    Ok(plan)
}

fn push(plan: &mut Vec<Instruction>, opcode: &str, args: Vec<String>) -> Result<(), CompileError> {
    let expected = opcodes::arity(opcode).unwrap_or(args.len());
    if args.len() != expected {
        return Err(CompileError::ArityMismatch {
            opcode: opcode.to_string(),
            index: plan.len(),
            expected,
            got: args.len(),
        });
    }
    plan.push(Instruction::new(opcode, args));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder;
    use crate::parser;

    #[test]
    fn compiles_minimal_case() {
        let forms = parser::parse(
            r#"(kyc-case TEST-CASE
              (nature-purpose (nature "Corporate") (purpose "Investment"))
              (kyc-token "pending"))"#,
        )
        .unwrap();
        let case = binder::bind(&forms).unwrap();
        let plan = compile(&case).unwrap();

        assert_eq!(plan[0].opcode, opcodes::INIT_CASE);
        assert_eq!(plan[0].args[0], "TEST-CASE");
        assert_eq!(plan[1].opcode, opcodes::NATURE);
        assert_eq!(plan[1].args[0], "Corporate");
        assert_eq!(plan[2].opcode, opcodes::PURPOSE);
        assert_eq!(plan.last().unwrap().opcode, opcodes::KYC_TOKEN);
    }

    #[test]
    fn compiles_ownership_nodes() {
        let forms = parser::parse(
            r#"(kyc-case X
              (ownership-structure (owner ACME-Corp 45.5%) (controller ACME-Corp "director"))
              (kyc-token "pending"))"#,
        )
        .unwrap();
        let case = binder::bind(&forms).unwrap();
        let plan = compile(&case).unwrap();

        let owner_instr = plan.iter().find(|i| i.opcode == opcodes::OWNER).unwrap();
        assert_eq!(owner_instr.args, vec!["ACME-Corp", "45.5"]);
    }
}
