//! Error types for plan generation and execution.

use thiserror::Error;

/// Result type alias using [`AssemblyError`].
pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Errors raised while planning or executing an assembly.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// Reading, cloning or writing a package failed.
    #[error(transparent)]
    Package(#[from] deck_core::Error),

    /// A selection named a candidate the step does not have.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// The operation is not allowed in the plan's current state.
    #[error("Invalid plan state: {0}")]
    InvalidState(String),

    /// The match provider failed or answered with something unusable.
    #[error("Match provider error: {0}")]
    MatchProvider(String),

    /// The conversion service failed or is not configured.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The assembly inputs do not make sense together.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
