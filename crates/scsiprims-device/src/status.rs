use scsiprims_transport::status;

/// Outcome classes of a raw status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    CheckCondition,
    TransportFailure,
}

/// Classify a raw status code.
///
/// Anything other than GOOD or CHECK CONDITION is a transport failure,
/// including codes this crate has never heard of.
pub fn classify(code: i32) -> StatusClass {
    match code {
        status::GOOD => StatusClass::Success,
        status::CHECK_CONDITION => StatusClass::CheckCondition,
        _ => StatusClass::TransportFailure,
    }
}
