fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .extern_path(".google.protobuf.Timestamp", "::prost_types::Timestamp")
        .compile_protos(&["../proto/dsl_service.proto"], &["../proto"])?;

    println!("cargo:rerun-if-changed=../proto/dsl_service.proto");

    Ok(())
}
