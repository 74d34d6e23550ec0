use std::path::PathBuf;

use planner_upload_module::PlannerError;

/// Failure category shared by every intake operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidInput,
    Retrieval,
    Timeout,
    Request,
    Collaborator,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("missing required environment variable: {0}")]
    MissingConfig(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read downloaded attachment from {}: {source}", path.display())]
    Retrieval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("gmail request failed: {0}")]
    Gmail(String),
    #[error("document conversion failed: {0}")]
    Conversion(String),
    #[error("invoice extraction failed: {0}")]
    Extraction(String),
    #[error("task tracker update failed: {0}")]
    Tracker(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Upload(#[from] PlannerError),
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::MissingConfig(_) => ErrorKind::Configuration,
            IntakeError::InvalidInput(_) => ErrorKind::InvalidInput,
            IntakeError::Retrieval { .. } => ErrorKind::Retrieval,
            IntakeError::Gmail(_) => ErrorKind::Request,
            IntakeError::Conversion(_)
            | IntakeError::Extraction(_)
            | IntakeError::Tracker(_)
            | IntakeError::Io(_) => ErrorKind::Collaborator,
            IntakeError::Upload(err) => match err.kind() {
                planner_upload_module::ErrorKind::Configuration => ErrorKind::Configuration,
                planner_upload_module::ErrorKind::InvalidInput => ErrorKind::InvalidInput,
                planner_upload_module::ErrorKind::Timeout => ErrorKind::Timeout,
                planner_upload_module::ErrorKind::Request => ErrorKind::Request,
            },
        }
    }
}
