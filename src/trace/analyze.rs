//! End-to-end analysis of a loaded trace.

use rayon::prelude::*;
use serde::Serialize;

use super::align::{self, Marker, Point, RestartMarker, Timeline};
use super::depth::{self, DepthViolation};
use super::error::Result;
use super::event::{ActorId, EntityKey, Timestamp};
use super::parse::Trace;
use super::partition::Partition;
use super::summary::{self, Summary};

/// Which actors get a depth series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActorSelection {
    /// Every id from 0 through the highest id in the trace.
    ///
    /// Only ids with events get a series; the silent ones in between are
    /// counted in [`Report::idle_actors`]. Actor ids are runtime slot numbers
    /// and can be arbitrarily sparse.
    #[default]
    All,
    /// Exactly these ids. Ids with no events still get an (empty) series: an
    /// actor that never received anything is not an error.
    Ids(Vec<ActorId>),
}

impl ActorSelection {
    /// Concrete ids to reconstruct, ascending and unique.
    pub fn resolve(&self, partition: &Partition) -> Vec<ActorId> {
        match self {
            Self::All => partition.actor_ids().collect(),
            Self::Ids(ids) => {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        }
    }

    /// Ids the selection covers that have no events and no series.
    pub fn idle(&self, partition: &Partition) -> u64 {
        match self {
            Self::All => {
                let observed = partition.actor_ids().count() as u64;
                // `0..=max` holds `max + 1` ids, of which `observed` are seen
                partition
                    .actor_ids()
                    .last()
                    .map_or(0, |max| max - (observed - 1))
            }
            Self::Ids(_) => 0,
        }
    }
}

/// Everything the renderer needs from one trace.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Number of records loaded.
    pub records: usize,
    /// Depth series for every key that reconstructed cleanly.
    pub timeline: Timeline,
    /// Keys whose depth went negative, in key order.
    pub violations: Vec<DepthViolation>,
    /// Records timestamped after the stop marker.
    pub after_stop: usize,
    /// Selected actor ids with no events at all.
    pub idle_actors: u64,
    pub summary: Summary,
}

impl Report {
    pub fn stop(&self) -> Timestamp {
        self.timeline.stop
    }

    /// True when every requested key reconstructed.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// JSON for external renderers: the report plus the flattened point
    /// table and marker list.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct RenderedReport<'a> {
            #[serde(flatten)]
            report: &'a Report,
            points: Vec<Point>,
            markers: Vec<Marker>,
        }

        serde_json::to_string_pretty(&RenderedReport {
            report: self,
            points: self.timeline.points(),
            markers: self.timeline.markers(),
        })
    }
}

/// Run the whole pipeline: partition, reconstruct each key, summarize, align.
///
/// Stop-marker problems fail the whole analysis. A depth violation only
/// drops that key's series; the others are still returned.
pub fn analyze(trace: &Trace, selection: &ActorSelection) -> Result<Report> {
    let partition = Partition::new(trace.records());
    let stops: Vec<Timestamp> = partition
        .stop_markers()
        .iter()
        .map(|r| r.timestamp)
        .collect();
    let stop = align::stop_timestamp(&stops)?;

    let keys: Vec<EntityKey> = selection
        .resolve(&partition)
        .into_iter()
        .map(EntityKey::Actor)
        .chain([EntityKey::Pool])
        .collect();

    // Keys are independent; each fold only depends on its own events.
    let results: Vec<_> = keys
        .par_iter()
        .map(|&key| depth::reconstruct(key, partition.queue_events(key)))
        .collect();

    let mut series = Vec::with_capacity(results.len());
    let mut violations = Vec::new();
    for result in results {
        match result {
            Ok(depth_series) => {
                let restarts = match depth_series.key {
                    EntityKey::Actor(id) => partition
                        .restarts(id)
                        .iter()
                        .map(|r| RestartMarker::from(*r))
                        .collect(),
                    _ => Vec::new(),
                };
                series.push((depth_series, restarts));
            }
            Err(violation) => violations.push(violation),
        }
    }

    let timeline = align::align(series, &stops)?;

    let after_stop = trace
        .records()
        .iter()
        .filter(|r| r.timestamp > stop)
        .count();
    if after_stop > 0 {
        log::warn!("{after_stop} events logged after StopSystem at {stop}ms");
    }

    Ok(Report {
        records: trace.len(),
        timeline,
        violations,
        after_stop,
        idle_actors: selection.idle(&partition),
        summary: summary::summarize(trace.records()),
    })
}
