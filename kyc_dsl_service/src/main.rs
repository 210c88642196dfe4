//! KYC DSL gRPC service (spec.md §6.3): four thin facades over the core
//! crates, served as one process. No facade holds business logic; each
//! call is parsed/bound/validated/amended by `kyc_dsl_core`,
//! `kyc_validator` and `kyc_amendment_engine`, and persisted through
//! `kyc_case_store`/`kyc_ontology_store`.

mod case_store_service;
mod dictionary_service;
mod dsl_service;
mod ontology_service;
mod proto;
mod state;

use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tracing::info;

use case_store_service::CaseStoreServiceImpl;
use dictionary_service::DictionaryServiceImpl;
use dsl_service::DslServiceImpl;
use ontology_service::OntologyServiceImpl;
use proto::kyc::dsl::case_store_service_server::CaseStoreServiceServer;
use proto::kyc::dsl::dictionary_service_server::DictionaryServiceServer;
use proto::kyc::dsl::dsl_service_server::DslServiceServer;
use proto::kyc::dsl::ontology_service_server::OntologyServiceServer;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let addr = "[::1]:50060".parse()?;
    let app_state = AppState::seeded();

    let reflection_service = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(tonic::include_file_descriptor_set!("dsl_descriptor"))
        .build_v1()?;

    info!(%addr, "kyc_dsl_service listening");

    Server::builder()
        .add_service(DslServiceServer::new(DslServiceImpl::new(app_state.clone())))
        .add_service(CaseStoreServiceServer::new(CaseStoreServiceImpl::new(app_state.clone())))
        .add_service(DictionaryServiceServer::new(DictionaryServiceImpl::new(app_state.clone())))
        .add_service(OntologyServiceServer::new(OntologyServiceImpl::new(app_state)))
        .add_service(reflection_service)
        .serve(addr)
        .await?;

    Ok(())
}
