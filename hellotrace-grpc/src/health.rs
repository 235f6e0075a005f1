//! gRPC health checking service.
//!
//! Reports `SERVING` unconditionally once the process has bound its
//! listener. Liveness only; downstream dependency health is not probed.

use tonic::{Request, Response, Status};

use hellotrace_proto::health::{
    health_check_response::ServingStatus, health_server::Health, HealthCheckRequest,
    HealthCheckResponse,
};

#[derive(Debug, Default)]
pub struct HealthService;

#[tonic::async_trait]
impl Health for HealthService {
    async fn check(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        tracing::debug!(service = %request.into_inner().service, "Health check");
        Ok(Response::new(HealthCheckResponse {
            status: ServingStatus::Serving as i32,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_serving() {
        let svc = HealthService;
        let response = svc
            .check(Request::new(HealthCheckRequest {
                service: String::new(),
            }))
            .await
            .unwrap();
        assert_eq!(response.into_inner().status, ServingStatus::Serving as i32);
    }
}
