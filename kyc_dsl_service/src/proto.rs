#[allow(dead_code, unused_imports, clippy::all)]
pub mod kyc {
    pub mod dsl {
        tonic::include_proto!("kyc.dsl");
    }
}
