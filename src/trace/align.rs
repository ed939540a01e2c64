//! Putting independent depth series on one time axis.
//!
//! Series are not merged: each keeps only the timestamps where its own queue
//! changed. What they share is the horizontal extent and the system-wide
//! markers (restarts and the single stop). A step renderer holds each value
//! until the series' next row; [`AlignedSeries::depth_at`] does the same
//! lookup for callers that need a value at an arbitrary instant.

use serde::Serialize;

use super::depth::{DepthRow, DepthSeries};
use super::error::{Result, TraceError};
use super::event::{ActorId, EntityKey, EventRecord, Timestamp};

/// An actor restart, drawn as a vertical line on that actor's series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestartMarker {
    pub timestamp: Timestamp,
    /// Generation the actor restarted into, if the trace recorded it.
    pub gen_id: Option<u64>,
}

impl From<&EventRecord> for RestartMarker {
    fn from(record: &EventRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            gen_id: record.gen_id,
        }
    }
}

/// One key's depth series with its restart annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedSeries {
    #[serde(flatten)]
    pub series: DepthSeries,
    pub restarts: Vec<RestartMarker>,
}

impl AlignedSeries {
    pub fn key(&self) -> EntityKey {
        self.series.key
    }

    pub fn rows(&self) -> &[DepthRow] {
        &self.series.rows
    }

    /// Depth held at `timestamp`: the last row at or before it, 0 before the
    /// first row.
    pub fn depth_at(&self, timestamp: Timestamp) -> u64 {
        let rows = self.rows();
        match rows.partition_point(|row| row.timestamp <= timestamp) {
            0 => 0,
            n => rows[n - 1].depth,
        }
    }
}

/// Which value of a depth row a [`Point`] carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Measure {
    Depth,
    Enqueued,
    Dequeued,
}

/// One `(timestamp, series, value)` entry of the rendering table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub timestamp: Timestamp,
    pub key: EntityKey,
    pub measure: Measure,
    pub value: u64,
}

/// A vertical annotation on the shared axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Marker {
    Restart {
        timestamp: Timestamp,
        actor: ActorId,
        gen_id: Option<u64>,
    },
    Stop {
        timestamp: Timestamp,
    },
}

impl Marker {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Restart { timestamp, .. } | Self::Stop { timestamp } => *timestamp,
        }
    }
}

/// Depth series for a set of keys, ready to plot against one time axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    /// When the system was stopped.
    pub stop: Timestamp,
    /// Earliest instant anything on the timeline happens.
    pub start: Timestamp,
    /// Latest instant anything on the timeline happens.
    pub end: Timestamp,
    /// Actors ascending, then the pool.
    pub series: Vec<AlignedSeries>,
}

impl Timeline {
    pub fn series(&self, key: EntityKey) -> Option<&AlignedSeries> {
        self.series.iter().find(|s| s.key() == key)
    }

    /// Every row value as a flat table, ordered by timestamp, then key, then
    /// measure.
    pub fn points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self
            .series
            .iter()
            .flat_map(|s| {
                let key = s.key();
                s.rows().iter().flat_map(move |row| {
                    [
                        (Measure::Depth, row.depth),
                        (Measure::Enqueued, row.enqueued),
                        (Measure::Dequeued, row.dequeued),
                    ]
                    .map(|(measure, value)| Point {
                        timestamp: row.timestamp,
                        key,
                        measure,
                        value,
                    })
                })
            })
            .collect();
        points.sort_by_key(|p| (p.timestamp, p.key, p.measure));
        points
    }

    /// Restart markers of every series plus the stop marker, by timestamp.
    /// A restart sharing the stop's millisecond sorts before it.
    pub fn markers(&self) -> Vec<Marker> {
        let mut markers: Vec<Marker> = self
            .series
            .iter()
            .filter_map(|s| match s.key() {
                EntityKey::Actor(actor) => Some((actor, &s.restarts)),
                _ => None,
            })
            .flat_map(|(actor, restarts)| {
                restarts.iter().map(move |r| Marker::Restart {
                    timestamp: r.timestamp,
                    actor,
                    gen_id: r.gen_id,
                })
            })
            .collect();
        markers.push(Marker::Stop {
            timestamp: self.stop,
        });
        markers.sort_by_key(Marker::timestamp);
        markers
    }
}

/// The single stop instant of a trace.
///
/// Zero or several `StopSystem` events is an error; choosing between several
/// is left to the caller.
pub fn stop_timestamp(stop_markers: &[Timestamp]) -> Result<Timestamp> {
    match stop_markers {
        [] => Err(TraceError::MissingStopMarker),
        [only] => Ok(*only),
        many => Err(TraceError::AmbiguousStopMarker {
            timestamps: many.to_vec(),
        }),
    }
}

/// Align depth series and their restart markers against the trace's stop
/// marker.
pub fn align(
    series: Vec<(DepthSeries, Vec<RestartMarker>)>,
    stop_markers: &[Timestamp],
) -> Result<Timeline> {
    let stop = stop_timestamp(stop_markers)?;

    let mut series: Vec<AlignedSeries> = series
        .into_iter()
        .map(|(series, restarts)| AlignedSeries { series, restarts })
        .collect();
    series.sort_by_key(AlignedSeries::key);

    let instants = series.iter().flat_map(|s| {
        s.rows()
            .iter()
            .map(|row| row.timestamp)
            .chain(s.restarts.iter().map(|r| r.timestamp))
    });
    let (start, end) = instants.fold((stop, stop), |(start, end), t| {
        (start.min(t), end.max(t))
    });

    log::debug!(
        "Aligned {} series on [{start}ms, {end}ms], stop at {stop}ms",
        series.len()
    );
    Ok(Timeline {
        stop,
        start,
        end,
        series,
    })
}
