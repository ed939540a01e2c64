//! Integration tests for the mailscope binary.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use rstest::rstest;

const HEADER: &str = "timestamp,actor_id,gen_id,thread_id,eventType\n";

fn sample_trace() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/trace/testdata/sample.csv")
}

/// A command isolated from the user's config and log settings.
fn mailscope() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mailscope"));
    cmd.env("MAILSCOPE_CONFIG_PATH", "/nonexistent/mailscope/config.toml")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn mailscope");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .expect("Failed to write to stdin");

    child.wait_with_output().expect("Failed to read output")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Test that the binary produces the text report for a trace on stdin.
#[test]
fn test_analyze_from_stdin() {
    let input = format!(
        "{HEADER}10,0,0,1,Enqueue\n10,0,0,1,Enqueue\n20,0,0,2,Dequeue\n30,0,0,1,StopSystem\n"
    );
    let output = run_with_stdin(mailscope(), &input);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("MAILBOX DEPTH ANALYSIS"), "Should have header");
    assert!(stdout.contains("actor 0: peak 2 at 10ms, final 1"));
    assert!(stdout.contains("pool: no queue activity"));
}

/// Test that `-` also means stdin.
#[test]
fn test_analyze_dash_reads_stdin() {
    let input = format!("{HEADER}5,0,0,1,StopSystem\n");
    let mut cmd = mailscope();
    cmd.arg("-");
    let output = run_with_stdin(cmd, &input);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Stop:    5ms"));
}

#[test]
fn test_analyze_sample_file() {
    let output = mailscope().arg(sample_trace()).output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("Records: 25"));
    assert!(stdout.contains("Extent:  1002ms .. 1012ms"));
    assert!(stdout.contains("actor 0: peak 2 at 1002ms, final 0"));
    assert!(stdout.contains("actor 2: peak 1 at 1006ms, final 0"));
    assert!(stdout.contains("pool: peak 1 at 1002ms, final 0"));
    assert!(stdout.contains("restart at 1008ms (gen 1)"));
}

#[test]
fn test_missing_file_fails() {
    let output = mailscope()
        .arg("/nonexistent/path/to/trace.csv")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("failed to read /nonexistent/path/to/trace.csv"),
        "stderr: {}",
        stderr(&output)
    );
}

#[rstest]
#[case::missing("", "no StopSystem event")]
#[case::ambiguous("5,0,0,1,StopSystem\n9,0,0,1,StopSystem\n", "2 StopSystem events")]
fn test_stop_marker_errors(#[case] body: &str, #[case] expected: &str) {
    let input = format!("{HEADER}1,0,0,1,Enqueue\n{body}");
    let output = run_with_stdin(mailscope(), &input);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains(expected), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty(), "No report on terminal failure");
}

#[test]
fn test_malformed_record_names_line() {
    let input = format!("{HEADER}10,0,0,1,Enqueue\nsoon,0,0,1,Dequeue\n");
    let output = run_with_stdin(mailscope(), &input);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("malformed record at line 3"), "stderr: {stderr}");
    assert!(stderr.contains("Expected header"), "Should show hint");
}

const VIOLATING: &str = "10,0,0,1,Enqueue\n\
                         20,1,0,1,Dequeue\n\
                         30,0,0,2,Dequeue\n\
                         40,0,0,1,StopSystem\n";

/// A violating key is reported next to the clean ones, with exit code 2.
#[test]
fn test_violation_reported() {
    let output = run_with_stdin(mailscope(), &format!("{HEADER}{VIOLATING}"));

    assert_eq!(output.status.code(), Some(2));
    let stdout = stdout(&output);
    assert!(stdout.contains("DEPTH VIOLATIONS"));
    assert!(stdout.contains("actor 1: depth -1 at 20ms after 0 good rows"));
    assert!(stdout.contains("actor 0: peak 1 at 10ms, final 0"));
    assert!(stderr(&output).contains("1 key violated the queue-depth invariant"));
}

#[test]
fn test_abort_on_violation() {
    let mut cmd = mailscope();
    cmd.arg("--abort-on-violation");
    let output = run_with_stdin(cmd, &format!("{HEADER}{VIOLATING}"));

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("actor 1 queue depth went negative at 20ms"));
}

#[test]
fn test_actor_selection_skips_violating_key() {
    let mut cmd = mailscope();
    cmd.args(["-a", "0"]);
    let output = run_with_stdin(cmd, &format!("{HEADER}{VIOLATING}"));

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("actor 0:"));
    assert!(!stdout.contains("actor 1:"));
}

#[test]
fn test_json_output() {
    let output = mailscope()
        .args(["--format", "json", "--actor", "0,2"])
        .arg(sample_trace())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["records"], 25);
    assert_eq!(json["timeline"]["stop"], 1012);

    let keys: Vec<_> = json["timeline"]["series"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, ["actor 0", "actor 2", "pool"]);

    let markers = json["markers"].as_array().unwrap();
    assert_eq!(markers.len(), 2, "One restart and the stop");
    assert!(!json["points"].as_array().unwrap().is_empty());
}

#[test]
fn test_config_file_sets_defaults() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "actors = [1]\nformat = \"json\"").unwrap();

    let output = mailscope()
        .env("MAILSCOPE_CONFIG_PATH", config.path())
        .arg(sample_trace())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["timeline"]["series"][0]["key"], "actor 1");

    // Flags override the file
    let output = mailscope()
        .arg("--config")
        .arg(config.path())
        .args(["--format", "text"])
        .arg(sample_trace())
        .output()
        .unwrap();
    assert!(stdout(&output).contains("MAILBOX DEPTH ANALYSIS"));
}

#[test]
fn test_bad_config_fails() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "colour = true").unwrap();

    let output = mailscope()
        .arg("--config")
        .arg(config.path())
        .arg(sample_trace())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to parse config file"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let output = mailscope()
        .args(["--config", "/nonexistent/mailscope.toml"])
        .arg(sample_trace())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("config file not found"));
}

/// The default selection covers ids up to the highest one without building a
/// series per id.
#[test]
fn test_huge_actor_id() {
    let input = format!(
        "{HEADER}1,{max},0,1,Enqueue\n2,{max},0,1,Dequeue\n3,,,1,StopSystem\n",
        max = u64::MAX
    );
    let output = run_with_stdin(mailscope(), &input);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains(&format!("actor {}: peak 1 at 1ms, final 0", u64::MAX)));
    assert!(stdout.contains(&format!("Idle:    {} actor ids with no events", u64::MAX)));
}

#[test]
fn test_invalid_utf8_file_is_malformed() {
    let mut trace = tempfile::NamedTempFile::new().unwrap();
    trace.write_all(HEADER.as_bytes()).unwrap();
    trace.write_all(b"1,0,0,\xff\xfe,Enqueue\n").unwrap();

    let output = mailscope().arg(trace.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("malformed record at line 2"), "stderr: {stderr}");
    assert!(!stderr.contains("failed to read"), "stderr: {stderr}");
}
