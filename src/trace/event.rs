//! Normalized trace events and the keys they are grouped under.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Milliseconds since the trace's (arbitrary) epoch.
pub type Timestamp = u64;

/// Slot index of an actor in the runtime.
pub type ActorId = u64;

/// Kind of a trace event.
///
/// The runtime emits a fixed vocabulary, but the set is open: anything
/// unrecognised is kept verbatim in [`EventType::Other`] so it still shows up
/// in the summary counts. Variant order is the display order used by the
/// summary table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, strum::EnumString)]
pub enum EventType {
    Register,
    Unregister,
    Restart,
    Fail,
    DrainStart,
    DrainEnd,
    Enqueue,
    Dequeue,
    PoolEnqueue,
    PoolDequeue,
    StopSystem,
    #[strum(default)]
    Other(String),
}

/// Which side of a queue an event moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSide {
    Enqueue,
    Dequeue,
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Register => "Register",
            Self::Unregister => "Unregister",
            Self::Restart => "Restart",
            Self::Fail => "Fail",
            Self::DrainStart => "DrainStart",
            Self::DrainEnd => "DrainEnd",
            Self::Enqueue => "Enqueue",
            Self::Dequeue => "Dequeue",
            Self::PoolEnqueue => "PoolEnqueue",
            Self::PoolDequeue => "PoolDequeue",
            Self::StopSystem => "StopSystem",
            Self::Other(name) => name,
        }
    }

    /// Parse an event type name. Never fails: strum's default variant
    /// catches unknown names as `Other`.
    pub fn parse(name: &str) -> Self {
        Self::from_str(name).unwrap_or_else(|_| Self::Other(name.to_string()))
    }

    /// Whether rows of this type must carry an actor id.
    pub fn requires_actor(&self) -> bool {
        matches!(
            self,
            Self::Register
                | Self::Unregister
                | Self::Restart
                | Self::Fail
                | Self::DrainStart
                | Self::DrainEnd
                | Self::Enqueue
                | Self::Dequeue
        )
    }

    /// The queue side this event moves for the given key, if any.
    ///
    /// Actor mailboxes only move on `Enqueue`/`Dequeue`; the pool queue only
    /// on `PoolEnqueue`/`PoolDequeue`.
    pub fn queue_side(&self, key: EntityKey) -> Option<QueueSide> {
        match (key, self) {
            (EntityKey::Actor(_), Self::Enqueue) | (EntityKey::Pool, Self::PoolEnqueue) => {
                Some(QueueSide::Enqueue)
            }
            (EntityKey::Actor(_), Self::Dequeue) | (EntityKey::Pool, Self::PoolDequeue) => {
                Some(QueueSide::Dequeue)
            }
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The logical owner of a queue or of a group of events.
///
/// Ordering is actors by id, then the pool, then system-wide events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Actor(ActorId),
    /// The shared worker-pool queue.
    Pool,
    /// Events that belong to no actor or queue (`StopSystem`).
    System,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actor(id) => write!(f, "actor {id}"),
            Self::Pool => f.write_str("pool"),
            Self::System => f.write_str("system"),
        }
    }
}

impl Serialize for EntityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One normalized trace row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub timestamp: Timestamp,
    /// Absent for pool-wide and system events.
    pub actor_id: Option<ActorId>,
    /// Incarnation counter; informational only.
    pub gen_id: Option<u64>,
    pub thread_id: String,
    pub event_type: EventType,
}

impl EventRecord {
    /// The key this record is counted under in the summary.
    pub fn scope(&self) -> EntityKey {
        match (&self.event_type, self.actor_id) {
            (EventType::PoolEnqueue | EventType::PoolDequeue, _) => EntityKey::Pool,
            (EventType::StopSystem, _) => EntityKey::System,
            (_, Some(id)) => EntityKey::Actor(id),
            (_, None) => EntityKey::System,
        }
    }
}
