use std::sync::Arc;

use hellotrace_telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use hellotrace_webapi::{router, AppState, GrpcGreeterClient, WebConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let telemetry = TelemetryConfig::from_env("hellotrace-webapi");
    init_telemetry(&telemetry)?;

    let config = WebConfig::from_env();
    let greeter = GrpcGreeterClient::new(&config.greeter_endpoint)?;
    let state = AppState {
        greeter: Arc::new(greeter),
    };

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        upstream = %config.greeter_endpoint,
        propagation = ?telemetry.propagation,
        "Edge API listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    shutdown_telemetry();
    Ok(())
}
