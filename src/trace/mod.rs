//! Mailbox and pool queue-depth reconstruction from actor-runtime traces.
//!
//! The actor runtime logs every mailbox enqueue/dequeue, every pool
//! enqueue/dequeue, restarts and the final system stop to a CSV file. This
//! module turns that flat log into one depth curve per actor plus one for the
//! worker pool, checks that no curve ever goes negative, and lines the curves
//! up against the stop and restart markers.
//!
//! # Usage
//!
//! ```ignore
//! use mailscope::trace::{ActorSelection, analyze, load_path, render};
//!
//! let trace = load_path(Path::new("log/actor_trace.csv"))?;
//! let report = analyze(&trace, &ActorSelection::All)?;
//! println!("{}", render(&report));
//! ```

pub mod align;
pub mod analyze;
pub mod depth;
pub mod display;
pub mod error;
pub mod event;
pub mod parse;
pub mod partition;
pub mod summary;

// Re-export main types for convenience
pub use align::{AlignedSeries, Marker, Measure, Point, RestartMarker, Timeline, align};
pub use analyze::{ActorSelection, Report, analyze};
pub use depth::{DepthRow, DepthSeries, DepthViolation, reconstruct};
pub use display::render;
pub use error::{Result, TraceError};
pub use event::{ActorId, EntityKey, EventRecord, EventType, Timestamp};
pub use parse::{Trace, load_path, load_reader, load_str};
pub use partition::Partition;
pub use summary::{Summary, summarize};
