use std::error::Error;
use std::fmt;

use crate::ride::RideStatus;

/// Error taxonomy for dispatch operations.
///
/// `Validation`, `InvalidTransition` and `Conflict` are returned synchronously
/// to the caller and must not be swallowed. `InsufficientData` is only used by
/// callers that require a modeled forecast (the forecaster itself degrades to
/// a baseline instead of failing). `ExternalService` wraps store/feed failures
/// without internal retry.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Malformed or inconsistent input (bad coordinates, pickup == destination).
    Validation(String),
    /// State machine precondition violated for the attempted operation.
    InvalidTransition {
        from: RideStatus,
        operation: &'static str,
    },
    /// A concurrent mutation won the race; the record is no longer in the
    /// status the caller observed.
    Conflict {
        expected: RideStatus,
        actual: RideStatus,
    },
    /// Referenced zone, driver or ride does not exist.
    NotFound(String),
    /// Too little history to produce a modeled result for the zone.
    InsufficientData { zone: String, samples: usize },
    /// Backing store or change feed unreachable.
    ExternalService(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Validation(msg) => write!(f, "validation failed: {msg}"),
            DispatchError::InvalidTransition { from, operation } => {
                write!(f, "cannot {operation} a ride in status {from:?}")
            }
            DispatchError::Conflict { expected, actual } => {
                write!(f, "conflict: expected status {expected:?}, found {actual:?}")
            }
            DispatchError::NotFound(what) => write!(f, "not found: {what}"),
            DispatchError::InsufficientData { zone, samples } => {
                write!(f, "insufficient data for zone {zone}: {samples} samples")
            }
            DispatchError::ExternalService(msg) => write!(f, "external service error: {msg}"),
        }
    }
}

impl Error for DispatchError {}
