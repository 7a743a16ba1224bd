/// Controls how a device session acquires and guards its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Open the device read-write instead of read-only.
    pub writable: bool,
    /// Compare the device identity before every execution and reopen the
    /// handle when a different device has appeared at the same path.
    pub detect_replugged: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            writable: false,
            detect_replugged: true,
        }
    }
}
