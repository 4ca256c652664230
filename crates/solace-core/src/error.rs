//! Error types for the core gateway crate.

use thiserror::Error;

/// Errors returned by gateway operations.
///
/// External completion failures never appear here: the companion engine
/// absorbs them into local fallback text before they reach a caller.
#[derive(Debug, Error)]
pub enum SolaceCoreError {
    /// Routine provider error.
    #[error("routine provider error: {0}")]
    Routine(String),
    /// Profile store error.
    #[error("profile store error: {0}")]
    Profile(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
