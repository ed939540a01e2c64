//! Plain-text rendering of a depth report.

use std::fmt::Write as _;

use chrono::DateTime;

use super::align::Marker;
use super::analyze::Report;
use super::event::Timestamp;
use super::summary::Summary;

/// Render the complete report to a string.
pub fn render(report: &Report) -> String {
    let mut out = String::new();

    render_header(&mut out, report);
    render_counts(&mut out, &report.summary);
    render_series(&mut out, report);
    render_violations(&mut out, report);
    render_markers(&mut out, report);

    out
}

fn render_header(out: &mut String, report: &Report) {
    out.push_str("============================================================\n");
    out.push_str("                 MAILBOX DEPTH ANALYSIS\n");
    out.push_str("============================================================\n");

    let timeline = &report.timeline;
    writeln!(out, "Records: {}", report.records).unwrap();
    writeln!(out, "Extent:  {}ms .. {}ms", timeline.start, timeline.end).unwrap();
    writeln!(
        out,
        "Stop:    {}ms ({})",
        timeline.stop,
        wall_clock(timeline.stop)
    )
    .unwrap();
    if report.idle_actors > 0 {
        writeln!(out, "Idle:    {} actor ids with no events", report.idle_actors).unwrap();
    }
    if report.after_stop > 0 {
        writeln!(out, "Warning: {} events after stop", report.after_stop).unwrap();
    }
}

fn render_counts(out: &mut String, summary: &Summary) {
    out.push_str("\nEVENT COUNTS\n");
    out.push_str("------------\n");

    let types = summary.event_types();
    let widths: Vec<usize> = types.iter().map(|t| t.as_str().len().max(5)).collect();

    write!(out, "{:<10}", "Key").unwrap();
    for (event_type, &width) in types.iter().zip(&widths) {
        write!(out, " {:>width$}", event_type.as_str()).unwrap();
    }
    out.push('\n');

    for key in summary.keys() {
        write!(out, "{:<10}", key.to_string()).unwrap();
        for (event_type, &width) in types.iter().zip(&widths) {
            match summary.count(key, event_type) {
                0 => write!(out, " {:>width$}", "-").unwrap(),
                n => write!(out, " {n:>width$}").unwrap(),
            }
        }
        out.push('\n');
    }
}

fn render_series(out: &mut String, report: &Report) {
    out.push_str("\nQUEUE DEPTH\n");
    out.push_str("-----------\n");

    for aligned in &report.timeline.series {
        let series = &aligned.series;
        match series.peak() {
            Some(peak) => writeln!(
                out,
                "{}: peak {} at {}ms, final {}",
                series.key,
                peak.depth,
                peak.timestamp,
                series.final_depth()
            )
            .unwrap(),
            None => writeln!(out, "{}: no queue activity", series.key).unwrap(),
        }

        if !series.is_empty() {
            writeln!(
                out,
                "  {:>10} {:>5} {:>5} {:>6}",
                "Time(ms)", "Enq", "Deq", "Depth"
            )
            .unwrap();
            for row in &series.rows {
                writeln!(
                    out,
                    "  {:>10} {:>5} {:>5} {:>6}",
                    row.timestamp, row.enqueued, row.dequeued, row.depth
                )
                .unwrap();
            }
        }

        for restart in &aligned.restarts {
            writeln!(
                out,
                "  restart at {}ms (gen {})",
                restart.timestamp,
                generation(restart.gen_id)
            )
            .unwrap();
        }
    }
}

fn render_violations(out: &mut String, report: &Report) {
    if report.violations.is_empty() {
        return;
    }

    out.push_str("\nDEPTH VIOLATIONS\n");
    out.push_str("----------------\n");
    for violation in &report.violations {
        writeln!(
            out,
            "{}: depth {} at {}ms after {} good rows",
            violation.key,
            violation.depth,
            violation.timestamp,
            violation.rows.len()
        )
        .unwrap();
    }
}

fn render_markers(out: &mut String, report: &Report) {
    out.push_str("\nMARKERS\n");
    out.push_str("-------\n");

    for marker in report.timeline.markers() {
        match marker {
            Marker::Restart {
                timestamp,
                actor,
                gen_id,
            } => writeln!(
                out,
                "{timestamp:>10}ms  restart actor {actor} (gen {})",
                generation(gen_id)
            )
            .unwrap(),
            Marker::Stop { timestamp } => {
                writeln!(out, "{timestamp:>10}ms  stop").unwrap()
            }
        }
    }
}

/// Milliseconds since the epoch as a UTC wall-clock time.
fn wall_clock(timestamp: Timestamp) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(
            || "out of range".to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        )
}

fn generation(gen_id: Option<u64>) -> String {
    gen_id.map_or_else(|| "?".to_string(), |g| g.to_string())
}
