//! Error taxonomy for trace analysis.
//!
//! Every variant is terminal for the operation that raised it: a load, one
//! key's reconstruction, or an alignment. Nothing here is retried or patched
//! over; the error is the finding.

use std::path::PathBuf;

use super::depth::DepthViolation;
use super::event::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// A row failed schema or type validation; the whole load is rejected.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// More dequeues than enqueues for some key at some instant.
    #[error(transparent)]
    DepthInvariantViolation(#[from] Box<DepthViolation>),

    /// The trace has no `StopSystem` event.
    #[error("trace has no StopSystem event")]
    MissingStopMarker,

    /// The trace has more than one `StopSystem` event.
    #[error("trace has {} StopSystem events, expected exactly one", timestamps.len())]
    AmbiguousStopMarker { timestamps: Vec<Timestamp> },

    /// The trace file could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<DepthViolation> for TraceError {
    fn from(violation: DepthViolation) -> Self {
        Self::DepthInvariantViolation(Box::new(violation))
    }
}

pub type Result<T, E = TraceError> = std::result::Result<T, E>;
