//! Event counts per key and event type.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::event::{EntityKey, EventRecord, EventType};

/// Cross-tabulation of `(key, event type) -> count`.
///
/// Iterates keys ascending and, within a key, event types in vocabulary
/// order with unrecognised names last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    counts: BTreeMap<(EntityKey, EventType), usize>,
}

impl Summary {
    pub fn count(&self, key: EntityKey, event_type: &EventType) -> usize {
        self.counts
            .get(&(key, event_type.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &EventType, usize)> {
        self.counts
            .iter()
            .map(|((key, event_type), count)| (*key, event_type, *count))
    }

    /// Keys with at least one event, ascending.
    pub fn keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<_> = self.counts.keys().map(|(key, _)| *key).collect();
        keys.dedup();
        keys
    }

    /// Event types seen anywhere in the trace, in display order.
    pub fn event_types(&self) -> Vec<&EventType> {
        let mut types: Vec<_> = self.counts.keys().map(|(_, t)| t).collect();
        types.sort();
        types.dedup();
        types
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Serialize)]
struct SummaryEntry<'a> {
    key: EntityKey,
    event_type: &'a EventType,
    count: usize,
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|(key, event_type, count)| SummaryEntry {
            key,
            event_type,
            count,
        }))
    }
}

/// Count every record, including types the depth logic ignores.
pub fn summarize(records: &[EventRecord]) -> Summary {
    let mut summary = Summary::default();
    for record in records {
        *summary
            .counts
            .entry((record.scope(), record.event_type.clone()))
            .or_default() += 1;
    }
    summary
}
