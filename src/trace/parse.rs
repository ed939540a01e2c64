//! Loading trace CSV files into an ordered event sequence.
//!
//! The runtime writes one row per event with the header
//! `timestamp,actor_id,gen_id,thread_id,eventType`. Column order does not
//! matter and extra columns are ignored. Rows are written by many threads
//! through one lock, so they arrive roughly but not strictly in time order;
//! [`Trace`] re-sorts them, keeping log order among equal timestamps.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use super::error::{Result, TraceError};
use super::event::{ActorId, EntityKey, EventRecord, EventType, Timestamp};

const TIMESTAMP: &str = "timestamp";
const ACTOR_ID: &str = "actor_id";
const GEN_ID: &str = "gen_id";
const THREAD_ID: &str = "thread_id";
const EVENT_TYPE: &str = "eventType";

/// A fully loaded trace, ordered non-decreasing by timestamp.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    records: Vec<EventRecord>,
}

impl Trace {
    /// Build a trace from records in log order.
    ///
    /// The sort is stable: records sharing a millisecond keep the order they
    /// were logged in.
    pub fn from_records(mut records: Vec<EventRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest actor id that owns at least one event.
    pub fn max_actor_id(&self) -> Option<ActorId> {
        self.records
            .iter()
            .filter_map(|r| match r.scope() {
                EntityKey::Actor(id) => Some(id),
                _ => None,
            })
            .max()
    }

    /// First and last timestamps in the trace.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some((first.timestamp, last.timestamp))
    }
}

/// Positions of the required columns within the header.
struct Columns {
    timestamp: usize,
    actor_id: usize,
    gen_id: usize,
    thread_id: usize,
    event_type: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TraceError::MalformedRecord {
                    line: 1,
                    reason: format!("missing required column `{name}`"),
                })
        };

        Ok(Self {
            timestamp: find(TIMESTAMP)?,
            actor_id: find(ACTOR_ID)?,
            gen_id: find(GEN_ID)?,
            thread_id: find(THREAD_ID)?,
            event_type: find(EVENT_TYPE)?,
        })
    }
}

/// Load a trace file from disk.
///
/// Only opening the file is an I/O error; bad content (including invalid
/// UTF-8) is a malformed record at its line.
pub fn load_path(path: &Path) -> Result<Trace> {
    let file = File::open(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_reader(file)
}

/// Load a trace from CSV text.
pub fn load_str(input: &str) -> Result<Trace> {
    load_reader(input.as_bytes())
}

/// Load a trace from any CSV byte stream.
///
/// Either every row loads or none does: the first malformed row rejects the
/// whole input.
pub fn load_reader<R: Read>(reader: R) -> Result<Trace> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns = Columns::from_headers(&headers)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let line = row.position().map_or(0, |p| p.line());
        records.push(parse_record(&row, &columns, line)?);
    }

    log::debug!("Loaded {} trace records", records.len());
    Ok(Trace::from_records(records))
}

fn parse_record(row: &StringRecord, columns: &Columns, line: u64) -> Result<EventRecord> {
    let field = |idx: usize| row.get(idx).unwrap_or_default();

    let timestamp = parse_integer(field(columns.timestamp), TIMESTAMP, line)?
        .ok_or_else(|| malformed(line, format!("`{TIMESTAMP}` is empty")))?;

    let event_name = field(columns.event_type);
    if event_name.is_empty() {
        return Err(malformed(line, format!("`{EVENT_TYPE}` is empty")));
    }
    let event_type = EventType::parse(event_name);

    let actor_id = parse_integer(field(columns.actor_id), ACTOR_ID, line)?;
    if actor_id.is_none() && event_type.requires_actor() {
        return Err(malformed(
            line,
            format!("`{ACTOR_ID}` is empty but {event_type} events belong to an actor"),
        ));
    }

    Ok(EventRecord {
        timestamp,
        actor_id,
        gen_id: parse_integer(field(columns.gen_id), GEN_ID, line)?,
        thread_id: field(columns.thread_id).to_string(),
        event_type,
    })
}

/// Parse an optional non-negative integer field; blank means absent.
fn parse_integer(value: &str, column: &str, line: u64) -> Result<Option<u64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| {
        malformed(
            line,
            format!("`{column}` is not a non-negative integer: {value:?}"),
        )
    })
}

fn malformed(line: u64, reason: String) -> TraceError {
    TraceError::MalformedRecord { line, reason }
}

fn csv_error(err: csv::Error) -> TraceError {
    let line = err.position().map_or(0, |p| p.line());
    TraceError::MalformedRecord {
        line,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "timestamp,actor_id,gen_id,thread_id,eventType\n";

    fn load(body: &str) -> Result<Trace> {
        load_str(&format!("{HEADER}{body}"))
    }

    fn malformed_line(result: Result<Trace>) -> (u64, String) {
        match result {
            Err(TraceError::MalformedRecord { line, reason }) => (line, reason),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_sort_is_stable() {
        let trace = load(
            "20,0,0,t2,Dequeue\n\
             10,0,0,t1,Enqueue\n\
             10,1,0,t3,Dequeue\n\
             10,1,0,t3,Enqueue\n\
             5,0,0,t1,Register\n",
        )
        .unwrap();

        let order: Vec<_> = trace
            .records()
            .iter()
            .map(|r| (r.timestamp, r.actor_id, r.event_type.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, Some(0), "Register"),
                (10, Some(0), "Enqueue"),
                (10, Some(1), "Dequeue"),
                (10, Some(1), "Enqueue"),
                (20, Some(0), "Dequeue"),
            ]
        );
        assert!(
            trace
                .records()
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
        );
    }

    #[test]
    fn test_columns_reordered_and_extra_ignored() {
        let trace = load_str(
            "eventType, payload, thread_id, gen_id, actor_id, timestamp\n\
             Enqueue, 1234, 140213, 2, 7, 42\n",
        )
        .unwrap();

        let record = &trace.records()[0];
        assert_eq!(record.timestamp, 42);
        assert_eq!(record.actor_id, Some(7));
        assert_eq!(record.gen_id, Some(2));
        assert_eq!(record.thread_id, "140213");
        assert_eq!(record.event_type, EventType::Enqueue);
    }

    #[test]
    fn test_blank_actor_allowed_for_system_events() {
        let trace = load("30,,,,StopSystem\n31,,,w1,PoolEnqueue\n").unwrap();
        assert_eq!(trace.records()[0].actor_id, None);
        assert_eq!(trace.records()[0].gen_id, None);
        assert_eq!(trace.records()[1].event_type, EventType::PoolEnqueue);
        assert_eq!(trace.max_actor_id(), None);
    }

    #[test]
    fn test_blank_actor_rejected_for_mailbox_events() {
        let (line, reason) = malformed_line(load("10,0,0,t1,Enqueue\n11,,0,t1,Dequeue\n"));
        assert_eq!(line, 3);
        assert!(reason.contains("actor_id"), "{reason}");
    }

    #[test]
    fn test_non_integer_fields() {
        let (line, reason) = malformed_line(load("abc,0,0,t1,Enqueue\n"));
        assert_eq!(line, 2);
        assert!(reason.contains("timestamp"), "{reason}");

        let (_, reason) = malformed_line(load("-5,0,0,t1,Enqueue\n"));
        assert!(reason.contains("timestamp"), "{reason}");

        let (_, reason) = malformed_line(load("5,0,x,t1,Enqueue\n"));
        assert!(reason.contains("gen_id"), "{reason}");
    }

    #[test]
    fn test_missing_fields() {
        let (_, reason) = malformed_line(load(",0,0,t1,Enqueue\n"));
        assert!(reason.contains("timestamp"), "{reason}");

        let (_, reason) = malformed_line(load("5,0,0,t1,\n"));
        assert!(reason.contains("eventType"), "{reason}");

        // Short row
        malformed_line(load("5,0,0\n"));
    }

    #[test]
    fn test_missing_column() {
        let (line, reason) =
            malformed_line(load_str("timestamp,actor_id,thread_id,eventType\n1,0,t,Enqueue\n"));
        assert_eq!(line, 1);
        assert!(reason.contains("gen_id"), "{reason}");

        malformed_line(load_str(""));
    }

    #[test]
    fn test_header_only_is_empty_trace() {
        let trace = load("").unwrap();
        assert!(trace.is_empty());
        assert_eq!(trace.time_range(), None);
    }

    #[test]
    fn test_unknown_event_types_preserved() {
        let trace = load("1,2,0,t,Teleport\n").unwrap();
        assert_eq!(
            trace.records()[0].event_type,
            EventType::Other("Teleport".to_string())
        );
        assert_eq!(trace.max_actor_id(), Some(2));
    }

    #[test]
    fn test_sample_log_loads_sorted() {
        let trace = load_str(include_str!("testdata/sample.csv")).unwrap();
        assert!(!trace.is_empty());
        assert!(
            trace
                .records()
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
        );
        assert_eq!(trace.max_actor_id(), Some(2));
    }

    #[test]
    fn test_load_path_invalid_utf8_is_malformed() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.write_all(b"1,0,0,t1,Enqueue\n2,0,0,\xff\xfe,Dequeue\n")
            .unwrap();

        let (line, _) = malformed_line(load_path(file.path()));
        assert_eq!(line, 3);
    }

    #[test]
    fn test_load_path_reads_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/trace/testdata/sample.csv");
        let trace = load_path(&path).unwrap();
        assert_eq!(trace.len(), 25);
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = load_path(Path::new("/nonexistent/trace.csv")).unwrap_err();
        assert!(matches!(err, TraceError::Io { .. }));
    }
}
