//! Error types for the control system
use thiserror::Error;

/// Control system errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// OSC encode/decode or transport error
    #[error("OSC error: {0}")]
    OscError(String),

    /// DMX output error
    #[error("DMX error: {0}")]
    DmxError(String),

    /// Service registration or browse error
    #[error("Discovery error: {0}")]
    DiscoveryError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid message format
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl From<rosc::OscError> for ControlError {
    fn from(err: rosc::OscError) -> Self {
        ControlError::OscError(format!("{:?}", err))
    }
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
