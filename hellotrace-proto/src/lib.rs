//! Generated protobuf types for HelloTrace.
//!
//! The `greeter` module carries the business contract (`Greeter`), the
//! `health` module a minimal `grpc.health.v1` surface.

/// Greeting service contract.
pub mod greeter {
    tonic::include_proto!("hellotrace");
}

/// Health checking contract (grpc.health.v1 subset).
pub mod health {
    tonic::include_proto!("grpc.health.v1");
}
