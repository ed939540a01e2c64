//! Grouping trace records by the queue they belong to.

use std::collections::BTreeMap;

use super::event::{ActorId, EntityKey, EventRecord, EventType};

/// Per-actor views over the trace.
#[derive(Debug, Clone, Default)]
pub struct ActorEvents<'a> {
    /// `Enqueue`/`Dequeue` records in trace order.
    pub mailbox: Vec<&'a EventRecord>,
    /// `Restart` records in trace order.
    pub restarts: Vec<&'a EventRecord>,
}

/// Trace records split by key, each sub-sequence keeping trace order.
///
/// Borrowing views only; the trace itself is never copied or mutated.
#[derive(Debug, Clone, Default)]
pub struct Partition<'a> {
    actors: BTreeMap<ActorId, ActorEvents<'a>>,
    pool: Vec<&'a EventRecord>,
    stops: Vec<&'a EventRecord>,
}

impl<'a> Partition<'a> {
    /// Partition records that are already in timestamp order.
    pub fn new(records: &'a [EventRecord]) -> Self {
        let mut partition = Self::default();

        for record in records {
            match record.scope() {
                EntityKey::Actor(id) => {
                    let key = EntityKey::Actor(id);
                    let actor = partition.actors.entry(id).or_default();
                    if record.event_type.queue_side(key).is_some() {
                        actor.mailbox.push(record);
                    } else if record.event_type == EventType::Restart {
                        actor.restarts.push(record);
                    }
                }
                EntityKey::Pool => partition.pool.push(record),
                EntityKey::System => {
                    if record.event_type == EventType::StopSystem {
                        partition.stops.push(record);
                    }
                }
            }
        }

        log::debug!(
            "Partitioned trace: {} actors, {} pool events, {} stop markers",
            partition.actors.len(),
            partition.pool.len(),
            partition.stops.len()
        );
        partition
    }

    /// Actors that own at least one event, ascending.
    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.actors.keys().copied()
    }

    /// Queue traffic for a key. Empty for keys with no traffic.
    pub fn queue_events(&self, key: EntityKey) -> &[&'a EventRecord] {
        match key {
            EntityKey::Actor(id) => self
                .actors
                .get(&id)
                .map(|actor| actor.mailbox.as_slice())
                .unwrap_or_default(),
            EntityKey::Pool => &self.pool,
            EntityKey::System => &[],
        }
    }

    /// Restart markers for an actor.
    pub fn restarts(&self, id: ActorId) -> &[&'a EventRecord] {
        self.actors
            .get(&id)
            .map(|actor| actor.restarts.as_slice())
            .unwrap_or_default()
    }

    /// Every `StopSystem` record; a well-formed trace has exactly one.
    pub fn stop_markers(&self) -> &[&'a EventRecord] {
        &self.stops
    }
}
