//! Build script for the HelloTrace proto crate
//!
//! Compiles the Protocol Buffer definitions into Rust code using
//! tonic-build. The generated code provides the gRPC service traits and
//! message types shared by the backend service and the edge API.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        // Generate server code (the backend implements the services)
        .build_server(true)
        // Generate client code (the edge API and tests consume it)
        .build_client(true)
        .compile_protos(
            &["proto/greeter.proto", "proto/health.proto"],
            &["proto"],
        )?;

    println!("cargo:rerun-if-changed=proto/greeter.proto");
    println!("cargo:rerun-if-changed=proto/health.proto");

    Ok(())
}
