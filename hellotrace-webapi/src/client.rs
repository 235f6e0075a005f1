//! Upstream greeting client.
//!
//! Thin seam over the backend gRPC service. The trait exists so the relay
//! handler can be exercised against a mock; the production implementation
//! holds a shared lazy channel and stamps every call with the propagated
//! trace context and a fixed deadline.

use async_trait::async_trait;
use opentelemetry::Context;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use hellotrace_proto::greeter::greeter_client::GreeterClient;
use hellotrace_proto::greeter::HelloRequest;
use hellotrace_telemetry::inject_metadata;

use crate::config::RPC_DEADLINE;

#[async_trait]
pub trait GreeterApi: Send + Sync {
    /// Relay one greeting upstream within the context `cx`, returning the
    /// reply message.
    async fn say_hello(&self, name: &str, cx: &Context) -> Result<String, Status>;
}

/// gRPC-backed greeter client. Cloning shares the underlying channel.
#[derive(Clone)]
pub struct GrpcGreeterClient {
    channel: Channel,
}

impl GrpcGreeterClient {
    /// Build a client for `endpoint`. The connection is established lazily
    /// on first use and re-established after failures.
    pub fn new(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(endpoint.to_string())?.connect_lazy();
        Ok(Self { channel })
    }
}

#[async_trait]
impl GreeterApi for GrpcGreeterClient {
    async fn say_hello(&self, name: &str, cx: &Context) -> Result<String, Status> {
        let mut request = Request::new(HelloRequest {
            name: name.to_string(),
        });
        inject_metadata(cx, request.metadata_mut());
        request.set_timeout(RPC_DEADLINE);

        let mut client = GreeterClient::new(self.channel.clone());
        let reply = client.say_hello(request).await?;
        Ok(reply.into_inner().message)
    }
}
