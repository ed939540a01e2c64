//! Reconstruct actor mailbox and worker-pool queue depth from a runtime trace.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a trace file
//! mailscope log/actor_trace.csv
//!
//! # Only actors 0 and 3, as JSON
//! mailscope -a 0,3 --format json log/actor_trace.csv
//!
//! # From stdin
//! cat log/actor_trace.csv | mailscope
//! ```

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use mailscope::config::{OutputFormat, UserConfig, ViolationPolicy, get_config_path};
use mailscope::styling::{eprintln, error_message, hint_message, println, warning_message};
use mailscope::trace::{self, ActorId, ActorSelection, Report, TraceError};

/// Reconstruct actor mailbox and worker-pool queue depth from a runtime trace
#[derive(Parser, Debug)]
#[command(name = "mailscope", version, about)]
struct Cli {
    /// Trace CSV to analyze (`-` or nothing reads stdin)
    #[arg(value_name = "TRACE")]
    trace: Option<PathBuf>,

    /// Actor ids to reconstruct (default: every id up to the highest seen)
    #[arg(short = 'a', long = "actor", value_name = "ID", value_delimiter = ',')]
    actors: Vec<ActorId>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Fail on the first key whose queue depth goes negative
    #[arg(long)]
    abort_on_violation: bool,

    /// Config file (default: $MAILSCOPE_CONFIG_PATH or the platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// How a completed run went.
enum Outcome {
    Clean,
    Violations(usize),
}

#[derive(Debug, thiserror::Error)]
#[error("no trace given and stdin is a terminal")]
struct NoInput;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Violations(count)) => {
            let keys = if count == 1 { "key" } else { "keys" };
            eprintln!(
                "{}",
                warning_message(format!("{count} {keys} violated the queue-depth invariant"))
            );
            ExitCode::from(2)
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` picks the level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let config_path = get_config_path(cli.config.as_deref());
    let config = UserConfig::load(config_path.as_ref())?;

    let selection = if cli.actors.is_empty() {
        config.actor_selection()
    } else {
        ActorSelection::Ids(cli.actors)
    };
    let format = cli.format.unwrap_or(config.format);
    let policy = if cli.abort_on_violation {
        ViolationPolicy::Abort
    } else {
        config.on_violation
    };
    log::debug!("Selection {selection:?}, format {format}, policy {policy:?}");

    let trace = match cli.trace.as_deref() {
        Some(path) if path != Path::new("-") => trace::load_path(path)?,
        _ => {
            let stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(NoInput.into());
            }
            trace::load_reader(stdin.lock())?
        }
    };
    log::info!("Loaded {} records", trace.len());

    let report = trace::analyze(&trace, &selection)?;
    if policy == ViolationPolicy::Abort
        && let Some(violation) = report.violations.first()
    {
        return Err(TraceError::from(violation.clone()).into());
    }

    print_report(&report, format)?;

    Ok(match report.violations.len() {
        0 => Outcome::Clean,
        count => Outcome::Violations(count),
    })
}

fn print_report(report: &Report, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", trace::render(report)),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

fn print_error(err: &anyhow::Error) {
    eprintln!("{}", error_message(format!("{err:#}")));
    if let Some(hint) = hint_for(err) {
        eprintln!("{}", hint_message(hint));
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    if err.is::<NoInput>() {
        return Some("Usage: mailscope <TRACE> | mailscope < TRACE");
    }
    match err.downcast_ref::<TraceError>()? {
        TraceError::MalformedRecord { .. } => {
            Some("Expected header: timestamp,actor_id,gen_id,thread_id,eventType")
        }
        TraceError::MissingStopMarker | TraceError::AmbiguousStopMarker { .. } => {
            Some("Depth curves are aligned on one StopSystem event; the trace may be truncated or concatenated")
        }
        TraceError::DepthInvariantViolation(_) => {
            Some("Drop --abort-on-violation (or set on-violation = \"report\") to see the other keys")
        }
        TraceError::Io { .. } => None,
    }
}
