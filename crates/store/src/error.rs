use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store backend is not ready.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}
