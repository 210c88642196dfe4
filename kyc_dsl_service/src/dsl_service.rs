//! DSL facade (spec.md §6.3): parse/validate/serialize/amend/execute a
//! case's DSL text, delegating entirely to the core/validator/amendment
//! crates. This service owns no business logic of its own.

use tonic::{Request, Response, Status};
use tracing::instrument;

use kyc_amendment_engine::{AmendmentEngine, CancelToken};
use kyc_validator::ValidationContext;

use crate::proto::kyc::dsl::dsl_service_server::DslService;
use crate::proto::kyc::dsl::*;
use crate::state::{AppState, GRAMMAR_VERSION, ONTOLOGY_VERSION};

pub struct DslServiceImpl {
    state: AppState,
}

impl DslServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl DslService for DslServiceImpl {
    #[instrument(skip(self, request))]
    async fn parse(&self, request: Request<ParseRequest>) -> Result<Response<ParseResponse>, Status> {
        let req = request.into_inner();
        match kyc_dsl_core::parse_and_bind(&req.dsl) {
            Ok(case) => Ok(Response::new(ParseResponse {
                success: true,
                message: "parse successful".to_string(),
                cases: vec![ParsedCase {
                    name: case.name,
                    nature: case.nature,
                    purpose: case.purpose,
                    client_business_unit: case.client_business_unit,
                    kyc_token: case.kyc_token,
                }],
                errors: vec![],
            })),
            Err(e) => Ok(Response::new(ParseResponse {
                success: false,
                message: "parse failed".to_string(),
                cases: vec![],
                errors: vec![e.to_string()],
            })),
        }
    }

    #[instrument(skip(self, request))]
    async fn validate(
        &self,
        request: Request<ValidateRequest>,
    ) -> Result<Response<ValidationResult>, Status> {
        let req = request.into_inner();
        let case = match kyc_dsl_core::parse_and_bind(&req.dsl) {
            Ok(c) => c,
            Err(e) => {
                return Ok(Response::new(ValidationResult {
                    valid: false,
                    errors: vec![e.to_string()],
                    warnings: vec![],
                    issues: vec![ValidationIssue {
                        severity: "ERROR".to_string(),
                        message: e.to_string(),
                        code: "PARSE_ERROR".to_string(),
                        line: 0,
                        column: 0,
                    }],
                    checks_total: 0,
                    checks_passed: 0,
                    checks_failed: 0,
                }))
            }
        };

        let version = self
            .state
            .cases
            .get_latest(&req.case_id)
            .await
            .map(|v| v.version + 1)
            .unwrap_or(1);

        let (record, findings) = kyc_validator::validate(
            &case,
            version,
            self.state.ontology.as_ref(),
            ValidationContext {
                actor: "Service:kyc_dsl_service",
                grammar_version: GRAMMAR_VERSION,
                ontology_version: ONTOLOGY_VERSION,
            },
        )
        .await;

        let issues = findings
            .iter()
            .filter(|f| f.status != kyc_case_store::FindingStatus::Pass)
            .map(|f| ValidationIssue {
                severity: format!("{:?}", f.severity).to_uppercase(),
                message: f.message.clone(),
                code: f.check_type.clone(),
                line: 0,
                column: 0,
            })
            .collect();

        Ok(Response::new(ValidationResult {
            valid: record.status == kyc_case_store::ValidationStatus::Pass,
            errors: findings
                .iter()
                .filter(|f| f.status == kyc_case_store::FindingStatus::Fail)
                .map(|f| f.message.clone())
                .collect(),
            warnings: findings
                .iter()
                .filter(|f| f.status == kyc_case_store::FindingStatus::Warn)
                .map(|f| f.message.clone())
                .collect(),
            issues,
            checks_total: record.totals.total,
            checks_passed: record.totals.passed,
            checks_failed: record.totals.failed,
        }))
    }

    #[instrument(skip(self, request))]
    async fn serialize(
        &self,
        request: Request<SerializeRequest>,
    ) -> Result<Response<SerializeResponse>, Status> {
        let req = request.into_inner();
        match kyc_dsl_core::canonicalize(&req.dsl) {
            Ok(dsl) => Ok(Response::new(SerializeResponse {
                success: true,
                dsl,
                message: "serialization successful".to_string(),
            })),
            Err(e) => Ok(Response::new(SerializeResponse {
                success: false,
                dsl: String::new(),
                message: e.to_string(),
            })),
        }
    }

    #[instrument(skip(self, request))]
    async fn amend(&self, request: Request<AmendRequest>) -> Result<Response<AmendResponse>, Status> {
        let req = request.into_inner();
        let engine = AmendmentEngine {
            case_store: self.state.cases.as_ref(),
            ontology: self.state.ontology.as_ref(),
            grammar_version: GRAMMAR_VERSION,
            ontology_version: ONTOLOGY_VERSION,
        };
        let actor = if req.actor.is_empty() { "Service:kyc_dsl_service" } else { &req.actor };
        match engine
            .apply_amendment(&req.case_name, &req.step, actor, &CancelToken::new())
            .await
        {
            Ok(version) => Ok(Response::new(AmendResponse {
                success: true,
                message: format!("applied amendment '{}'", req.step),
                updated_dsl: version.dsl_snapshot,
                new_version: version.version,
                content_hash: version.hash,
            })),
            Err(e) => Ok(Response::new(AmendResponse {
                success: false,
                message: e.to_string(),
                updated_dsl: String::new(),
                new_version: 0,
                content_hash: String::new(),
            })),
        }
    }

    #[instrument(skip(self, request))]
    async fn execute(
        &self,
        request: Request<ExecuteRequest>,
    ) -> Result<Response<ExecuteResponse>, Status> {
        let req = request.into_inner();
        let latest = self
            .state
            .cases
            .get_latest(&req.case_id)
            .await
            .map_err(|e| Status::not_found(e.to_string()))?;

        let plan_json = kyc_dsl_core::compile_dsl(&latest.dsl_snapshot)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        match kyc_dsl_core::execute_plan(&plan_json) {
            Ok(result_json) => Ok(Response::new(ExecuteResponse {
                success: true,
                message: format!("executed function '{}'", req.function_name),
                case_id: req.case_id,
                result_json,
            })),
            Err(e) => Ok(Response::new(ExecuteResponse {
                success: false,
                message: e.to_string(),
                case_id: req.case_id,
                result_json: String::new(),
            })),
        }
    }

    async fn get_grammar(
        &self,
        _request: Request<GetGrammarRequest>,
    ) -> Result<Response<GrammarResponse>, Status> {
        Ok(Response::new(GrammarResponse {
            ebnf: GRAMMAR_EBNF.to_string(),
            version: GRAMMAR_VERSION.to_string(),
            created_at: None,
        }))
    }

    async fn list_amendments(
        &self,
        _request: Request<ListAmendmentsRequest>,
    ) -> Result<Response<ListAmendmentsResponse>, Status> {
        let amendments = kyc_amendment_engine::mutations::ALL_STEPS
            .iter()
            .map(|step| AmendmentType {
                name: step.to_string(),
                description: step_description(step).to_string(),
            })
            .collect();
        Ok(Response::new(ListAmendmentsResponse { amendments }))
    }
}

fn step_description(step: &str) -> &'static str {
    use kyc_amendment_engine::mutations::*;
    match step {
        POLICY_DISCOVERY => "append DISCOVER-POLICIES and the policies applicable to the case's jurisdiction",
        DOCUMENT_SOLICITATION => "append SOLICIT-DOCUMENTS and the obligations implied by the case's policies",
        DOCUMENT_DISCOVERY => "populate data-dictionary and document-requirements from the ontology",
        OWNERSHIP_DISCOVERY => "append BUILD-OWNERSHIP-TREE and VERIFY-OWNERSHIP",
        RISK_ASSESSMENT => "append ASSESS-RISK",
        REGULATOR_NOTIFY => "append REGULATOR-NOTIFY",
        APPROVE => "set kyc-token to approved; refuses while a function is pending",
        DECLINE => "set kyc-token to declined",
        REVIEW => "set kyc-token to review",
        _ => "",
    }
}

const GRAMMAR_EBNF: &str = r#"
case         = "(" "kyc-case" IDENT { clause } ")"
clause       = nature-purpose | cbu | policy | function | obligation
             | ownership | data-dict | doc-req | derived | token
nature-purpose = "(" "nature-purpose" "(" "nature" STRING ")" "(" "purpose" STRING ")" ")"
cbu          = "(" "client-business-unit" IDENT ")"
policy       = "(" "policy" IDENT ")"
function     = "(" "function" IDENT ")"
obligation   = "(" "obligation" IDENT ")"
ownership    = "(" "ownership-structure" { owner-node } ")"
data-dict    = "(" "data-dictionary" { attribute-entry } ")"
doc-req      = "(" "document-requirements" "(" "jurisdiction" IDENT ")" { "(" "document" IDENT STRING ")" } ")"
derived      = "(" "derived-attributes" { derivation } ")"
token        = "(" "kyc-token" STRING ")"
IDENT        = [A-Za-z_][A-Za-z0-9_-]*
STRING       = '"' .* '"'
PERCENT      = [0-9]+ ("." [0-9]+)? "%"
"#;
