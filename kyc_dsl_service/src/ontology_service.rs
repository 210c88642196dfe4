//! Ontology facade (spec.md §6.3): regulation/document linkage and
//! attribute derivation lineage, for clients that need the graph itself
//! rather than a flat dictionary lookup.

use std::collections::HashSet;

use tonic::{Request, Response, Status};

use crate::proto::kyc::dsl::ontology_service_server::OntologyService;
use crate::proto::kyc::dsl::*;
use crate::state::AppState;

pub struct OntologyServiceImpl {
    state: AppState,
}

impl OntologyServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl OntologyService for OntologyServiceImpl {
    async fn list_regulations(
        &self,
        _request: Request<ListRegulationsRequest>,
    ) -> Result<Response<ListRegulationsResponse>, Status> {
        let regulations = self
            .state
            .ontology
            .list_regulations()
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .into_iter()
            .map(|r| RegulationMessage {
                code: r.code,
                name: r.name,
                jurisdictions: r.jurisdictions,
            })
            .collect();
        Ok(Response::new(ListRegulationsResponse { regulations }))
    }

    async fn list_documents_by_regulation(
        &self,
        request: Request<ListDocumentsByRegulationRequest>,
    ) -> Result<Response<ListDocumentsResponse>, Status> {
        let req = request.into_inner();
        let documents = self
            .state
            .ontology
            .documents_by_regulation(&req.regulation_code)
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .into_iter()
            .map(|d| DocumentMessage {
                code: d.code,
                name: d.name,
                doc_type: d.doc_type,
                jurisdiction: d.jurisdiction,
            })
            .collect();
        Ok(Response::new(ListDocumentsResponse { documents }))
    }

    async fn get_attribute_derivations(
        &self,
        request: Request<GetAttributeDerivationsRequest>,
    ) -> Result<Response<GetAttributeDerivationsResponse>, Status> {
        let req = request.into_inner();
        let derivations = self
            .state
            .ontology
            .get_attribute_derivations(&req.derived_code)
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .into_iter()
            .map(|d| DerivationMessage {
                derived: d.derived,
                source: d.source,
            })
            .collect();
        Ok(Response::new(GetAttributeDerivationsResponse { derivations }))
    }

    /// Walks the derivation graph outward from `attribute_code`, breadth
    /// first, following only the `derived -> source` edges the ontology
    /// actually catalogues. Cycles can't occur here (the ontology only
    /// records catalogued rules, not a case's own derived-attributes
    /// clause), but the visited set guards against a malformed seed anyway.
    async fn get_attribute_lineage(
        &self,
        request: Request<GetAttributeLineageRequest>,
    ) -> Result<Response<GetAttributeLineageResponse>, Status> {
        let req = request.into_inner();
        let mut lineage = Vec::new();
        let mut visited = HashSet::new();
        let mut frontier = vec![req.attribute_code.to_ascii_uppercase()];
        visited.insert(frontier[0].clone());

        while let Some(code) = frontier.pop() {
            let derivations = self
                .state
                .ontology
                .get_attribute_derivations(&code)
                .await
                .map_err(|e| Status::internal(e.to_string()))?;
            for derivation in derivations {
                if visited.insert(derivation.source.clone()) {
                    lineage.push(derivation.source.clone());
                    frontier.push(derivation.source);
                }
            }
        }

        Ok(Response::new(GetAttributeLineageResponse { lineage }))
    }
}
