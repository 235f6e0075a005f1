//! Error types for the greeting pipeline.
//!
//! The taxonomy mirrors what callers can observe on the wire:
//! - policy violation (missing deadline) -> `Cancelled`
//! - invalid argument (empty name, the reserved "Mud") -> `InvalidArgument`
//! - deadline expiry while the request is in flight -> `DeadlineExceeded`
//! - repository failure -> `Internal`
//!
//! Every failure kind is also recorded as exactly one event on the active
//! request span; none is retried inside the pipeline.

use tonic::{Code, Status};

use crate::store::RepositoryError;

/// Rejection message for an empty (or whitespace-only) name.
pub const NAME_REQUIRED: &str = "'Name' is Required";

/// Rejection message for the reserved name. Case-insensitive on purpose;
/// does anyone else remember this song?
pub const NAME_IS_MUD: &str = "Your name is not Mud";

/// A failed pass through the greeting pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The caller did not attach a deadline to the call. This is a policy
    /// violation, not a missing-field error: it is logged as a warning and
    /// reported as cancellation-class.
    #[error("No Deadline Supplied")]
    MissingDeadline,

    /// The caller-supplied deadline elapsed before the named operation
    /// completed.
    #[error("deadline expired during `{0}`")]
    DeadlineExpired(&'static str),

    /// Input validation failed; the message is surfaced verbatim.
    #[error("{0}")]
    InvalidArgument(&'static str),

    /// The store failed; wraps the operation name and underlying cause.
    /// Fatal to the request, never retried here.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PipelineError {
    pub fn code(&self) -> Code {
        match self {
            PipelineError::MissingDeadline => Code::Cancelled,
            PipelineError::DeadlineExpired(_) => Code::DeadlineExceeded,
            PipelineError::InvalidArgument(_) => Code::InvalidArgument,
            PipelineError::Repository(_) => Code::Internal,
        }
    }

    pub fn to_status(&self) -> Status {
        Status::new(self.code(), self.to_string())
    }
}

impl From<PipelineError> for Status {
    fn from(err: PipelineError) -> Self {
        err.to_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert_eq!(PipelineError::MissingDeadline.code(), Code::Cancelled);
        assert_eq!(
            PipelineError::DeadlineExpired("insert_greeting").code(),
            Code::DeadlineExceeded
        );
        assert_eq!(
            PipelineError::InvalidArgument(NAME_REQUIRED).code(),
            Code::InvalidArgument
        );
        let repo = RepositoryError::new(
            "insert_greeting",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert_eq!(PipelineError::Repository(repo).code(), Code::Internal);
    }

    #[test]
    fn messages_are_surfaced_verbatim() {
        let status = PipelineError::MissingDeadline.to_status();
        assert_eq!(status.message(), "No Deadline Supplied");

        let status = PipelineError::InvalidArgument(NAME_IS_MUD).to_status();
        assert_eq!(status.message(), "Your name is not Mud");
    }
}
