use muster_core::DeviceId;
use thiserror::Error;

/// Errors that can occur during device registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The device was never registered.
    #[error("device not found: {0}")]
    NotFound(DeviceId),

    /// The registry backend is not ready.
    #[error("device registry unavailable: {0}")]
    Unavailable(String),
}
