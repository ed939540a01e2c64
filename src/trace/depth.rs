//! Queue-depth reconstruction.
//!
//! A queue's depth at time `t` is everything enqueued up to and including
//! `t`, minus everything dequeued up to and including `t`. Events landing on
//! the same millisecond collapse into one row, so the order of an enqueue and
//! a dequeue inside one millisecond never matters. Depth is checked after
//! each row; a negative value means the trace lost or reordered an event and
//! reconstruction for that key stops there.

use serde::Serialize;

use super::event::{EntityKey, EventRecord, QueueSide, Timestamp};

/// Queue activity at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepthRow {
    pub timestamp: Timestamp,
    /// Enqueues at exactly this timestamp.
    pub enqueued: u64,
    /// Dequeues at exactly this timestamp.
    pub dequeued: u64,
    /// Pending messages after this timestamp's events.
    pub depth: u64,
}

/// Sparse depth curve for one key: a row only where the queue changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthSeries {
    pub key: EntityKey,
    pub rows: Vec<DepthRow>,
}

impl DepthSeries {
    pub fn empty(key: EntityKey) -> Self {
        Self {
            key,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Depth after the last row; an idle queue ends empty.
    pub fn final_depth(&self) -> u64 {
        self.rows.last().map_or(0, |row| row.depth)
    }

    pub fn total_enqueued(&self) -> u64 {
        self.rows.iter().map(|row| row.enqueued).sum()
    }

    pub fn total_dequeued(&self) -> u64 {
        self.rows.iter().map(|row| row.dequeued).sum()
    }

    /// The first row at which the queue was deepest.
    pub fn peak(&self) -> Option<&DepthRow> {
        self.rows
            .iter()
            .reduce(|best, row| if row.depth > best.depth { row } else { best })
    }

    /// First and last timestamps with activity.
    pub fn span(&self) -> Option<(Timestamp, Timestamp)> {
        Some((self.rows.first()?.timestamp, self.rows.last()?.timestamp))
    }
}

/// Dequeues outran enqueues for a key.
///
/// Keeps the rows computed before the offending timestamp so the lead-up can
/// be inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{key} queue depth went negative at {timestamp}ms (depth {depth})")]
pub struct DepthViolation {
    pub key: EntityKey,
    pub timestamp: Timestamp,
    pub depth: i64,
    pub rows: Vec<DepthRow>,
}

/// Fold one key's queue events into its depth series.
///
/// `events` must be in timestamp order, as produced by the loader and
/// partitioner. Events that do not move this key's queue are skipped.
pub fn reconstruct(
    key: EntityKey,
    events: &[&EventRecord],
) -> Result<DepthSeries, DepthViolation> {
    debug_assert!(events.is_sorted_by_key(|r| r.timestamp));

    let mut rows = Vec::new();
    let mut enq_total: u64 = 0;
    let mut deq_total: u64 = 0;

    for same_ms in events.chunk_by(|a, b| a.timestamp == b.timestamp) {
        let timestamp = same_ms[0].timestamp;
        let (enqueued, dequeued) =
            same_ms
                .iter()
                .fold((0, 0), |(enq, deq), r| match r.event_type.queue_side(key) {
                    Some(QueueSide::Enqueue) => (enq + 1, deq),
                    Some(QueueSide::Dequeue) => (enq, deq + 1),
                    None => (enq, deq),
                });
        if enqueued == 0 && dequeued == 0 {
            continue;
        }

        enq_total += enqueued;
        deq_total += dequeued;
        let depth = enq_total as i64 - deq_total as i64;
        if depth < 0 {
            log::warn!("{key}: depth {depth} at {timestamp}ms, dequeued more than enqueued");
            return Err(DepthViolation {
                key,
                timestamp,
                depth,
                rows,
            });
        }

        rows.push(DepthRow {
            timestamp,
            enqueued,
            dequeued,
            depth: depth as u64,
        });
    }

    log::debug!("{key}: {} depth rows", rows.len());
    Ok(DepthSeries { key, rows })
}
