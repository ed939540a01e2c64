pub mod config;
pub mod styling;
pub mod trace;

// Re-export the pipeline entry points for convenience
pub use trace::{ActorSelection, Report, TraceError, analyze, load_path, load_str, render};
