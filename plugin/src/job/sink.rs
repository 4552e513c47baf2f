//! Job log sinks

use std::sync::Mutex;

use colored::Colorize;
use tracing::{error, info, warn};

/// Kind of a job log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Info,
    Warn,
    Error,
    Success,
}

/// Destination of the lines a plugin run narrates
///
/// Lines are already redacted when they reach a sink.
pub trait LogSink: Send + Sync {
    fn send(&self, run_id: &str, kind: LineKind, line: &str);
}

/// Prints colored lines on stdout and mirrors them as tracing events
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn send(&self, run_id: &str, kind: LineKind, line: &str) {
        match kind {
            LineKind::Info => {
                println!("{}", line);
                info!(run_id, "{}", line);
            }
            LineKind::Warn => {
                println!("{} {}", "Warning:".yellow().bold(), line);
                warn!(run_id, "{}", line);
            }
            LineKind::Error => {
                println!("{} {}", "Error:".red().bold(), line);
                error!(run_id, "{}", line);
            }
            LineKind::Success => {
                println!("{}", line.green().bold());
                info!(run_id, "{}", line);
            }
        }
    }
}

/// Only emits tracing events, used by the plugin host
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn send(&self, run_id: &str, kind: LineKind, line: &str) {
        match kind {
            LineKind::Info | LineKind::Success => info!(run_id, "{}", line),
            LineKind::Warn => warn!(run_id, "{}", line),
            LineKind::Error => error!(run_id, "{}", line),
        }
    }
}

/// Buffers lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LineKind, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line received so far
    pub fn lines(&self) -> Vec<(LineKind, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, l)| l.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn send(&self, _run_id: &str, kind: LineKind, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((kind, line.to_string()));
        }
    }
}
