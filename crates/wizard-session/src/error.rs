use thiserror::Error;
use wizard_spec::{SpecError, SummaryError};

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid wizard: {0}")]
    Spec(#[from] SpecError),
    #[error("session already completed")]
    AlreadyCompleted,
    #[error("failed to send the summary, please try again: {0}")]
    Notification(#[source] ServiceError),
    #[error("failed to generate the document, please try again: {0}")]
    Document(#[source] ServiceError),
}
