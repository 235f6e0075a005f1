//! Deadline extraction from gRPC request metadata.
//!
//! tonic carries the caller's deadline as the `grpc-timeout` request
//! header but does not enforce it server-side, so the pipeline reads it
//! explicitly. A missing or unparseable header means "no deadline was
//! supplied" and is rejected by the pipeline as a policy violation.

use std::time::Duration;

use tokio::time::Instant;
use tonic::metadata::MetadataMap;

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Read the caller-supplied deadline from request metadata, as an absolute
/// instant relative to now.
pub fn deadline_from_metadata(metadata: &MetadataMap) -> Option<Instant> {
    let value = metadata.get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    let timeout = parse_grpc_timeout(value)?;
    Some(Instant::now() + timeout)
}

/// Parse a `grpc-timeout` header value: 1-8 ASCII digits followed by a
/// unit character (H, M, S, m, u, n).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;
    match unit {
        "H" => Some(Duration::from_secs(amount.checked_mul(3600)?)),
        "M" => Some(Duration::from_secs(amount.checked_mul(60)?)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}
