//! Error types for sscbatch
use ssc_platform::SscError;

/// Custom error type for sscbatch operations
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    /// SSC API error
    #[error("SSC API error: {0}")]
    Ssc(#[from] SscError),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command line or input file content
    #[error("Invalid input: {0}")]
    Input(String),

    /// Batch action name not in the registry
    #[error(
        "Unknown batch action '{0}' (expected one of: {actions})",
        actions = crate::actions::BatchAction::NAMES.join(", ")
    )]
    UnknownAction(String),

    /// Upload or report did not finish in time
    #[error("Timed out after {0} seconds waiting for {1}")]
    Timeout(u64, String),
}

/// Result type alias for sscbatch operations
pub type Result<T> = std::result::Result<T, CliError>;
