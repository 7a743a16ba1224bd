use bytes::Bytes;
use scsiprims_codec::CodecError;
use scsiprims_transport::status::status_name;
use scsiprims_transport::TransportError;

/// Errors surfaced by device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Malformed layout or bad field reference.
    #[error("configuration error: {0}")]
    Configuration(#[from] CodecError),

    /// The command asked to move data in both directions at once.
    #[error(
        "bidirectional transfer is not supported (datain {datain} bytes, dataout {dataout} bytes)"
    )]
    UnsupportedTransfer { datain: usize, dataout: usize },

    /// The device reported a command-specific fault.
    #[error("check condition ({} sense bytes)", .sense.len())]
    CheckCondition { sense: Bytes },

    /// The command completed with a status other than GOOD or CHECK CONDITION.
    #[error("transport failure: status {status} ({})", status_label(.status))]
    TransportFailure { status: i32 },

    /// The command could not be submitted, or the handle could not be
    /// (re)acquired.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

fn status_label(status: &i32) -> &'static str {
    status_name(*status)
}

impl DeviceError {
    /// Returns true for failures of the transport layer rather than of the
    /// command itself.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            DeviceError::TransportFailure { .. } | DeviceError::Transport(_)
        )
    }

    /// Sense data of a check condition.
    pub fn sense(&self) -> Option<&[u8]> {
        match self {
            DeviceError::CheckCondition { sense } => Some(sense.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
