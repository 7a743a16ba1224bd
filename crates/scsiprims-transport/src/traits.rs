use std::path::Path;

use crate::error::Result;

/// Direction of the data phase of a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// No data phase.
    None,
    /// Device to caller (`datain`).
    FromDevice,
    /// Caller to device (`dataout`).
    ToDevice,
}

impl Direction {
    /// Short name for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::FromDevice => "from-device",
            Direction::ToDevice => "to-device",
        }
    }
}

/// Identity of whatever is currently reachable at a device path.
///
/// Two probes of the same path compare equal only if the same node is still
/// bound there. A device that was unplugged and replugged shows up as a new
/// node even when it reappears under the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// Device containing the node (`st_dev`).
    pub dev: u64,
    /// Inode number of the node (`st_ino`).
    pub ino: u64,
}

impl DeviceIdentity {
    /// Probe the identity of `path` from filesystem metadata.
    #[cfg(unix)]
    pub fn of(path: impl AsRef<Path>) -> Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| crate::TransportError::Probe {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }
}

/// One command exchange handed to a transport.
///
/// At most one of `dataout` and `datain` is non-empty, matching `direction`.
#[derive(Debug)]
pub struct Exchange<'a> {
    pub direction: Direction,
    pub cdb: &'a [u8],
    pub dataout: &'a [u8],
    pub datain: &'a mut [u8],
    pub sense: &'a mut [u8],
}

/// Outcome of a submitted exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Raw status code, see [`crate::status`].
    pub status: i32,
    /// Number of valid bytes the transport wrote into the sense buffer.
    pub sense_len: usize,
}

impl Completion {
    /// A completion with `status` and no sense data.
    pub fn new(status: i32) -> Self {
        Self {
            status,
            sense_len: 0,
        }
    }
}

/// A backend able to move SCSI commands to a device.
///
/// A transport is a factory for handles. Handles are owned by exactly one
/// caller at a time and are released by passing them back to [`close`].
/// All operations block the calling thread.
///
/// [`close`]: Transport::close
pub trait Transport {
    /// An open device handle.
    type Handle;

    /// Open the device at `path`.
    fn open(&mut self, path: &Path, writable: bool) -> Result<Self::Handle>;

    /// Release a handle.
    fn close(&mut self, handle: Self::Handle) -> Result<()>;

    /// Submit one command and wait for it to complete.
    ///
    /// On return `datain` and `sense` hold whatever the device sent back.
    /// An `Err` means the command could not be submitted at all; device and
    /// host faults after submission are reported through
    /// [`Completion::status`].
    fn execute(&mut self, handle: &mut Self::Handle, exchange: Exchange<'_>) -> Result<Completion>;

    /// Probe the identity of the node currently bound at `path`.
    fn probe(&self, path: &Path) -> Result<DeviceIdentity>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}
