use thiserror::Error;

/// Failures while writing a profile out. Contract violations in the hooks
/// are panics, not values of this type.
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("failed to write profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode profile as json: {0}")]
    Json(#[from] serde_json::Error),
}
