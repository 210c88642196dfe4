use serde::{Deserialize, Serialize};

/// One step of the linear plan the compiler (C7) produces and the executor
/// (C8) interprets. JSON-serializable so it can cross a process boundary
/// (spec.md §4.4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: String,
    pub args: Vec<String>,
}

impl Instruction {
    pub fn new(opcode: &str, args: Vec<String>) -> Self {
        Self {
            opcode: opcode.to_string(),
            args,
        }
    }
}

/// The closed opcode set (spec.md §4.4.1).
pub mod opcodes {
    pub const INIT_CASE: &str = "init-case";
    pub const NATURE: &str = "nature";
    pub const PURPOSE: &str = "purpose";
    pub const CLIENT_BUSINESS_UNIT: &str = "client-business-unit";
    pub const POLICY: &str = "policy";
    pub const FUNCTION: &str = "function";
    pub const OBLIGATION: &str = "obligation";
    pub const OWNER: &str = "owner";
    pub const BENEFICIAL_OWNER: &str = "beneficial-owner";
    pub const CONTROLLER: &str = "controller";
    pub const KYC_TOKEN: &str = "kyc-token";
    pub const PUSH: &str = "push";

    pub const ARITY: &[(&str, usize)] = &[
        (INIT_CASE, 1),
        (NATURE, 1),
        (PURPOSE, 1),
        (CLIENT_BUSINESS_UNIT, 1),
        (POLICY, 1),
        (FUNCTION, 1),
        (OBLIGATION, 1),
        (OWNER, 2),
        (BENEFICIAL_OWNER, 2),
        (CONTROLLER, 2),
        (KYC_TOKEN, 1),
        (PUSH, 1),
    ];

    pub fn arity(opcode: &str) -> Option<usize> {
        ARITY.iter().find(|(op, _)| *op == opcode).map(|(_, n)| *n)
    }
}
