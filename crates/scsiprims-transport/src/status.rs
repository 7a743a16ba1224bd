//! Raw status codes reported by a transport.
//!
//! Values 0x00-0xFF are SAM status bytes as returned by the device.
//! Negative values are synthetic and never appear on the wire.

/// The command completed without error.
pub const GOOD: i32 = 0x00;

/// The device has sense data describing a command-specific fault.
pub const CHECK_CONDITION: i32 = 0x02;

/// Search condition met (obsolete in current SAM revisions).
pub const CONDITION_MET: i32 = 0x04;

/// The logical unit is busy.
pub const BUSY: i32 = 0x08;

/// The logical unit is reserved by another initiator.
pub const RESERVATION_CONFLICT: i32 = 0x18;

/// The task set is full.
pub const TASK_SET_FULL: i32 = 0x28;

/// An auto contingent allegiance condition exists.
pub const ACA_ACTIVE: i32 = 0x30;

/// The command was aborted by another initiator.
pub const TASK_ABORTED: i32 = 0x40;

/// The host adapter or driver failed the transfer before the device answered.
pub const SGIO_ERROR: i32 = -1;

/// Returns a human-readable name for a raw status code.
pub fn status_name(status: i32) -> &'static str {
    match status {
        GOOD => "GOOD",
        CHECK_CONDITION => "CHECK_CONDITION",
        CONDITION_MET => "CONDITION_MET",
        BUSY => "BUSY",
        RESERVATION_CONFLICT => "RESERVATION_CONFLICT",
        TASK_SET_FULL => "TASK_SET_FULL",
        ACA_ACTIVE => "ACA_ACTIVE",
        TASK_ABORTED => "TASK_ABORTED",
        SGIO_ERROR => "SGIO_ERROR",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_codes() {
        assert_eq!(status_name(GOOD), "GOOD");
        assert_eq!(status_name(CHECK_CONDITION), "CHECK_CONDITION");
        assert_eq!(status_name(SGIO_ERROR), "SGIO_ERROR");
    }

    #[test]
    fn unknown_codes_have_generic_name() {
        assert_eq!(status_name(0x7f), "UNKNOWN");
        assert_eq!(status_name(-42), "UNKNOWN");
    }
}
