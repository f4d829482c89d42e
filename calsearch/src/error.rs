use thiserror::Error;

use crate::kind::CalibrationKind;

/// Fatal errors that abort an association run.
///
/// Shortfalls in the data (no candidates, fewer than requested, overlapping
/// exposures) are not errors; they are reported as
/// [`Condition`](crate::callback::Condition)s on the affected result.
#[derive(Error, Debug)]
pub enum AssociationError {
    /// More eligible candidates than the configured capacity.
    #[error(
        "{kind} candidate set for science record {science_index} exceeds capacity of {capacity}"
    )]
    CapacityExceeded {
        /// Calibration kind being searched.
        kind: CalibrationKind,
        /// Configured capacity.
        capacity: usize,
        /// Science record being associated.
        science_index: usize,
    },

    /// Quota, window or capacity misconfigured.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Input collection is not in ascending start-time order.
    #[error("records not sorted by start time: record {index} starts before its predecessor")]
    UnsortedRecords {
        /// First record found out of order.
        index: usize,
    },

    /// Policy JSON could not be parsed.
    #[error("failed to parse policy: {0}")]
    PolicyParse(#[from] serde_json::Error),
}
