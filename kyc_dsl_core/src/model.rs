//! The typed case model (spec.md §3.1–§3.3): the output of the binder (C4),
//! the input to the serializer (C5) and compiler (C7).

use serde::{Deserialize, Serialize};

/// Lifecycle status of a case (spec.md §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    Approved,
    Declined,
    Review,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::Approved => "approved",
            CaseStatus::Declined => "declined",
            CaseStatus::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CaseStatus::Pending),
            "approved" => Some(CaseStatus::Approved),
            "declined" => Some(CaseStatus::Declined),
            "review" => Some(CaseStatus::Review),
            _ => None,
        }
    }
}

/// The closed set of function-invocation action names (spec.md §4.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum FunctionAction {
    DiscoverPolicies,
    SolicitDocuments,
    ExtractData,
    BuildOwnershipTree,
    VerifyOwnership,
    AssessRisk,
    RegulatorNotify,
}

impl FunctionAction {
    pub const ALL: &'static [FunctionAction] = &[
        FunctionAction::DiscoverPolicies,
        FunctionAction::SolicitDocuments,
        FunctionAction::ExtractData,
        FunctionAction::BuildOwnershipTree,
        FunctionAction::VerifyOwnership,
        FunctionAction::AssessRisk,
        FunctionAction::RegulatorNotify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionAction::DiscoverPolicies => "DISCOVER-POLICIES",
            FunctionAction::SolicitDocuments => "SOLICIT-DOCUMENTS",
            FunctionAction::ExtractData => "EXTRACT-DATA",
            FunctionAction::BuildOwnershipTree => "BUILD-OWNERSHIP-TREE",
            FunctionAction::VerifyOwnership => "VERIFY-OWNERSHIP",
            FunctionAction::AssessRisk => "ASSESS-RISK",
            FunctionAction::RegulatorNotify => "REGULATOR-NOTIFY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == s)
    }
}

/// Status of an individual function invocation within `functions` (spec.md §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionStatus {
    Pending,
    Complete,
    Failed,
}

impl FunctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionStatus::Pending => "pending",
            FunctionStatus::Complete => "complete",
            FunctionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInvocation {
    pub action: FunctionAction,
    pub status: FunctionStatus,
}

impl FunctionInvocation {
    pub fn pending(action: FunctionAction) -> Self {
        Self {
            action,
            status: FunctionStatus::Pending,
        }
    }
}

/// A single node of the ownership graph (spec.md §3.2). Flat and ordered;
/// the four variants are mutually exclusive per-node (never combined).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OwnershipNode {
    /// Legal ownership. `percentage` is a whole-number-or-decimal 0..=100.
    Owner { entity: String, percentage: f64 },
    /// Economic (beneficial) interest.
    BeneficialOwner { entity: String, percentage: f64 },
    /// A natural or legal controller with a free-form role label.
    Controller { entity: String, role: String },
    /// Declares the subject entity. At most one may appear.
    Entity { entity: String },
}

impl OwnershipNode {
    pub fn entity_code(&self) -> &str {
        match self {
            OwnershipNode::Owner { entity, .. }
            | OwnershipNode::BeneficialOwner { entity, .. }
            | OwnershipNode::Controller { entity, .. }
            | OwnershipNode::Entity { entity } => entity,
        }
    }
}

/// A tiered source for a data-dictionary attribute entry (spec.md §3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeSource {
    Document(String),
    OpsValidation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDictionaryEntry {
    pub attribute: String,
    pub primary: AttributeSource,
    pub secondary: Option<AttributeSource>,
    pub tertiary: Option<AttributeSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredDocument {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequirementBlock {
    pub jurisdiction: String,
    pub documents: Vec<RequiredDocument>,
}

/// A derived-attribute lineage binding (spec.md §3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    pub derived: String,
    pub sources: Vec<String>,
    pub rule: String,
    pub jurisdiction: Option<String>,
    pub regulation: Option<String>,
}

/// Case identity (spec.md §3.1); version/status/last-updated are store
/// metadata, not DSL-text fields, so they live on [`CaseIdentity`] and are
/// populated by the case store rather than the binder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseIdentity {
    pub name: String,
    pub version: u64,
    pub status: CaseStatus,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// The full typed case model (spec.md §3.1). Field order matches the
/// canonical serialization order (spec.md §4.1.3), except `identity`,
/// which is store metadata folded into the DSL head + `kyc-token` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub name: String,
    pub nature: String,
    pub purpose: String,
    pub client_business_unit: String,
    pub policies: Vec<String>,
    pub functions: Vec<FunctionInvocation>,
    pub ownership: Vec<OwnershipNode>,
    pub data_dictionary: Vec<DataDictionaryEntry>,
    pub document_requirements: Vec<DocumentRequirementBlock>,
    pub derived_attributes: Vec<Derivation>,
    pub obligations: Vec<String>,
    pub kyc_token: String,
}

impl Case {
    /// Sum of legal-ownership (`Owner`) percentages.
    pub fn ownership_sum(&self) -> f64 {
        self.ownership
            .iter()
            .filter_map(|n| match n {
                OwnershipNode::Owner { percentage, .. } => Some(*percentage),
                _ => None,
            })
            .sum()
    }

    pub fn owners(&self) -> impl Iterator<Item = (&str, f64)> {
        self.ownership.iter().filter_map(|n| match n {
            OwnershipNode::Owner { entity, percentage } => Some((entity.as_str(), *percentage)),
            _ => None,
        })
    }

    pub fn controllers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ownership.iter().filter_map(|n| match n {
            OwnershipNode::Controller { entity, role } => Some((entity.as_str(), role.as_str())),
            _ => None,
        })
    }

    pub fn has_function(&self, action: FunctionAction) -> bool {
        self.functions.iter().any(|f| f.action == action)
    }

    pub fn document_codes(&self) -> impl Iterator<Item = &str> {
        let dict = self.data_dictionary.iter().flat_map(|e| {
            [Some(&e.primary), e.secondary.as_ref(), e.tertiary.as_ref()]
                .into_iter()
                .flatten()
                .filter_map(|s| match s {
                    AttributeSource::Document(code) => Some(code.as_str()),
                    AttributeSource::OpsValidation => None,
                })
        });
        let reqs = self
            .document_requirements
            .iter()
            .flat_map(|b| b.documents.iter().map(|d| d.code.as_str()));
        dict.chain(reqs)
    }

    pub fn attribute_codes(&self) -> impl Iterator<Item = &str> {
        let dict_attrs = self.data_dictionary.iter().map(|e| e.attribute.as_str());
        let derived = self.derived_attributes.iter().flat_map(|d| {
            std::iter::once(d.derived.as_str()).chain(d.sources.iter().map(|s| s.as_str()))
        });
        dict_attrs.chain(derived)
    }
}

/// `[A-Z0-9][A-Z0-9\-]*` per spec.md §3.1.
pub fn is_case_name_shaped(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

/// Generic identifier shape used for policy/obligation/attribute/document
/// codes: `[A-Za-z_][A-Za-z0-9_-]*` (matches the surface-grammar `IDENT`).
pub fn is_identifier_shaped(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
