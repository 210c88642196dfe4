//! Case store facade (spec.md §6.3): read access to versions, the
//! amendment trail, and case summaries. `SaveCaseVersion` is the one
//! mutating RPC and is a thin wrapper over the amendment engine, since the
//! store itself never applies a mutation on its own.

use tonic::{Request, Response, Status};

use kyc_amendment_engine::{AmendmentEngine, CancelToken};
use kyc_case_store::{CaseFilter, CaseStatus};

use crate::proto::kyc::dsl::case_store_service_server::CaseStoreService;
use crate::proto::kyc::dsl::*;
use crate::state::{AppState, GRAMMAR_VERSION, ONTOLOGY_VERSION};

pub struct CaseStoreServiceImpl {
    state: AppState,
}

impl CaseStoreServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn to_message(version: kyc_case_store::CaseVersion) -> CaseVersionMessage {
    CaseVersionMessage {
        name: version.name,
        version: version.version,
        hash: version.hash,
        dsl_snapshot: version.dsl_snapshot,
        actor: version.actor,
        created_at: Some(prost_types::Timestamp {
            seconds: version.created_at.timestamp(),
            nanos: version.created_at.timestamp_subsec_nanos() as i32,
        }),
    }
}

fn parse_status(raw: &str) -> Option<CaseStatus> {
    match raw.to_ascii_lowercase().as_str() {
        "pending" => Some(CaseStatus::Pending),
        "approved" => Some(CaseStatus::Approved),
        "declined" => Some(CaseStatus::Declined),
        "review" => Some(CaseStatus::Review),
        _ => None,
    }
}

#[tonic::async_trait]
impl CaseStoreService for CaseStoreServiceImpl {
    async fn save_case_version(
        &self,
        request: Request<SaveCaseVersionRequest>,
    ) -> Result<Response<CaseVersionMessage>, Status> {
        let req = request.into_inner();
        let engine = AmendmentEngine {
            case_store: self.state.cases.as_ref(),
            ontology: self.state.ontology.as_ref(),
            grammar_version: GRAMMAR_VERSION,
            ontology_version: ONTOLOGY_VERSION,
        };
        let actor = if req.actor.is_empty() { "Service:kyc_dsl_service" } else { &req.actor };
        let version = engine
            .apply_amendment(&req.name, &req.step, actor, &CancelToken::new())
            .await
            .map_err(|e| Status::failed_precondition(e.to_string()))?;
        Ok(Response::new(to_message(version)))
    }

    async fn get_case_version(
        &self,
        request: Request<GetCaseVersionRequest>,
    ) -> Result<Response<CaseVersionMessage>, Status> {
        let req = request.into_inner();
        let version = self
            .state
            .cases
            .get_version(&req.name, req.version)
            .await
            .map_err(|e| Status::not_found(e.to_string()))?;
        Ok(Response::new(to_message(version)))
    }

    async fn get_latest_case_version(
        &self,
        request: Request<GetLatestCaseVersionRequest>,
    ) -> Result<Response<CaseVersionMessage>, Status> {
        let req = request.into_inner();
        let version = self
            .state
            .cases
            .get_latest(&req.name)
            .await
            .map_err(|e| Status::not_found(e.to_string()))?;
        Ok(Response::new(to_message(version)))
    }

    async fn list_case_versions(
        &self,
        request: Request<ListCaseVersionsRequest>,
    ) -> Result<Response<ListCaseVersionsResponse>, Status> {
        let req = request.into_inner();
        let versions = self
            .state
            .cases
            .list_versions(&req.name)
            .await
            .map_err(|e| Status::not_found(e.to_string()))?
            .into_iter()
            .map(to_message)
            .collect();
        Ok(Response::new(ListCaseVersionsResponse { versions }))
    }

    async fn list_all_cases(
        &self,
        request: Request<ListAllCasesRequest>,
    ) -> Result<Response<ListAllCasesResponse>, Status> {
        let req = request.into_inner();
        let filter = CaseFilter {
            status: parse_status(&req.status_filter),
            name_prefix: if req.name_prefix.is_empty() {
                None
            } else {
                Some(req.name_prefix)
            },
        };
        let cases = self
            .state
            .cases
            .list_cases(Some(filter))
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .into_iter()
            .map(|summary| CaseSummaryMessage {
                name: summary.name,
                status: format!("{:?}", summary.status).to_lowercase(),
                last_updated: Some(prost_types::Timestamp {
                    seconds: summary.last_updated.timestamp(),
                    nanos: summary.last_updated.timestamp_subsec_nanos() as i32,
                }),
            })
            .collect();
        Ok(Response::new(ListAllCasesResponse { cases }))
    }
}
