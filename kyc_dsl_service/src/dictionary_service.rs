//! Dictionary facade (spec.md §6.3): reference data a client renders
//! without walking the full ontology graph itself — single attribute and
//! document lookups plus their listings.

use tonic::{Request, Response, Status};

use kyc_ontology_store::AttributeClass;

use crate::proto::kyc::dsl::dictionary_service_server::DictionaryService;
use crate::proto::kyc::dsl::*;
use crate::state::AppState;

pub struct DictionaryServiceImpl {
    state: AppState,
}

impl DictionaryServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn class_str(class: AttributeClass) -> &'static str {
    match class {
        AttributeClass::Public => "public",
        AttributeClass::Private => "private",
    }
}

fn to_attribute_message(attribute: kyc_ontology_store::Attribute) -> AttributeMessage {
    AttributeMessage {
        code: attribute.code,
        name: attribute.name,
        domain: attribute.domain,
        data_type: attribute.data_type,
        class: class_str(attribute.class).to_string(),
    }
}

fn to_document_message(document: kyc_ontology_store::Document) -> DocumentMessage {
    DocumentMessage {
        code: document.code,
        name: document.name,
        doc_type: document.doc_type,
        jurisdiction: document.jurisdiction,
    }
}

#[tonic::async_trait]
impl DictionaryService for DictionaryServiceImpl {
    async fn get_attribute(
        &self,
        request: Request<GetAttributeRequest>,
    ) -> Result<Response<AttributeMessage>, Status> {
        let req = request.into_inner();
        let attribute = self
            .state
            .ontology
            .get_attribute(&req.code)
            .await
            .map_err(|e| Status::not_found(e.to_string()))?;
        Ok(Response::new(to_attribute_message(attribute)))
    }

    async fn list_attributes(
        &self,
        request: Request<ListAttributesRequest>,
    ) -> Result<Response<ListAttributesResponse>, Status> {
        let req = request.into_inner();
        let attributes = match req.class_filter.to_ascii_lowercase().as_str() {
            "public" => self.state.ontology.list_public_attributes().await,
            "private" => self.state.ontology.list_private_attributes().await,
            _ => {
                let mut all = self
                    .state
                    .ontology
                    .list_public_attributes()
                    .await
                    .map_err(|e| Status::internal(e.to_string()))?;
                all.extend(
                    self.state
                        .ontology
                        .list_private_attributes()
                        .await
                        .map_err(|e| Status::internal(e.to_string()))?,
                );
                Ok(all)
            }
        }
        .map_err(|e| Status::internal(e.to_string()))?
        .into_iter()
        .map(to_attribute_message)
        .collect();
        Ok(Response::new(ListAttributesResponse { attributes }))
    }

    async fn get_document(
        &self,
        request: Request<GetDocumentRequest>,
    ) -> Result<Response<DocumentMessage>, Status> {
        let req = request.into_inner();
        let document = self
            .state
            .ontology
            .get_document(&req.code)
            .await
            .map_err(|e| Status::not_found(e.to_string()))?;
        Ok(Response::new(to_document_message(document)))
    }

    async fn list_documents(
        &self,
        _request: Request<ListDocumentsRequest>,
    ) -> Result<Response<ListDocumentsResponse>, Status> {
        let documents = self
            .state
            .ontology
            .list_documents()
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .into_iter()
            .map(to_document_message)
            .collect();
        Ok(Response::new(ListDocumentsResponse { documents }))
    }
}
