use std::path::PathBuf;

/// Errors that can occur in SCSI transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device node.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to release a device handle.
    #[error("failed to close device handle: {0}")]
    Close(std::io::Error),

    /// Failed to read the identity of the device node.
    #[error("failed to probe {path}: {source}")]
    Probe {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred while submitting a command.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session holds no open handle.
    #[error("device is not open")]
    NotOpen,

    /// No backend is available for the requested device.
    #[error("unsupported device: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
