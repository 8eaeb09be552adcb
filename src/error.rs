//! Error types shared by the level builders.
//!
//! EDI method failures are not errors; they are reported through
//! [`EdiOutcome`](crate::edi::EdiOutcome). Everything here is fatal for the
//! call that produced it and no partial record is ever returned alongside it.

use thiserror::Error;

use crate::record::{Frame, Range};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Failures raised while applying a calibration table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// A sample falls outside every table of the range that governs it.
    #[error("no {range} calibration table covers epoch {epoch} ns")]
    NoCoverage { range: Range, epoch: i64 },

    /// No table of this range intersects the requested window.
    #[error("no {range} calibration tables available for the requested interval")]
    EmptyTable { range: Range },
}

/// Fatal processing errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Neither attitude nor sun-pulse data was supplied for despinning.
    #[error("despin requires attitude or sun-pulse data; neither was supplied")]
    DespinInputMissing,

    /// A processing path that exists but has no implementation.
    #[error("not implemented: {what}")]
    NotImplemented { what: &'static str },

    /// Two series that must be aligned have different lengths.
    #[error("{what}: expected length {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A stage needed a frame its input record does not carry.
    #[error("input record has no {0} field")]
    MissingFrame(Frame),

    #[error("invalid time bound {value:?}: {reason}")]
    InvalidTime { value: String, reason: String },

    /// Epochs that must be non-decreasing are not.
    #[error("{what}: epochs are not sorted")]
    UnsortedEpochs { what: &'static str },

    /// A spin-axis estimate is missing, zero, or not finite.
    #[error("spin axis {index} is missing or not a usable direction")]
    InvalidSpinAxis { index: usize },

    #[error("{what}: need at least {needed} samples, found {found}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        found: usize,
    },
}

impl ProcessingError {
    pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
        if expected != found {
            return Err(ProcessingError::LengthMismatch {
                what,
                expected,
                found,
            });
        }
        Ok(())
    }
}
