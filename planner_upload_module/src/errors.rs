use std::time::Duration;

/// Broad failure category, so callers can pick a retry policy without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidInput,
    Timeout,
    Request,
}

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("missing required environment variable: {0}")]
    MissingConfig(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("upload to planner timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to upload PDF to planner: {0}")]
    Request(String),
    #[error("planner upload failed: HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

impl PlannerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlannerError::MissingConfig(_) => ErrorKind::Configuration,
            PlannerError::InvalidInput(_) => ErrorKind::InvalidInput,
            PlannerError::Timeout(_) => ErrorKind::Timeout,
            PlannerError::Request(_) | PlannerError::HttpStatus { .. } => ErrorKind::Request,
        }
    }
}
