use std::sync::Arc;

use tonic::transport::Server;

use hellotrace_grpc::{
    GreeterService, GrpcConfig, HealthService, InMemoryReplyCache, PgGreetingStore, StoreConfig,
};
use hellotrace_proto::greeter::greeter_server::GreeterServer;
use hellotrace_proto::health::health_server::HealthServer;
use hellotrace_telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let telemetry = TelemetryConfig::from_env("hellotrace-grpc");
    init_telemetry(&telemetry)?;

    let grpc_config = GrpcConfig::from_env();
    let store_config = StoreConfig::from_env();

    let store = PgGreetingStore::from_config(&store_config)?;
    // Connections are lazy, so a down database surfaces here rather than
    // at pool creation. Keep serving; the first insert will report it.
    if let Err(err) = store.ensure_schema().await {
        tracing::warn!(error = %err, "Schema check failed at startup");
    }

    let cache = Arc::new(InMemoryReplyCache::new());
    let greeter = GreeterService::new(Arc::new(store), cache);

    let addr = grpc_config.bind_addr()?;
    tracing::info!(%addr, propagation = ?telemetry.propagation, "Greeting service listening");

    Server::builder()
        .add_service(GreeterServer::new(greeter))
        .add_service(HealthServer::new(HealthService))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    shutdown_telemetry();
    Ok(())
}
