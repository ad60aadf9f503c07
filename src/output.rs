// ABOUTME: Terminal reporting for the CLI: progress lines, rendered results, and outcome documents.
// ABOUTME: Normal mode is chatty, quiet mode prints only results, JSON mode prints one document.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress lines, timings, and rendered results
    Normal,
    /// Rendered results and the final line only
    Quiet,
    /// A single JSON document per command
    Json,
}

/// Writes command feedback according to the selected mode.
///
/// The clock starts when the reporter is created, so timings cover the
/// whole command.
pub struct Output {
    mode: OutputMode,
    started: Instant,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: Instant::now(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// A step in progress. Normal mode only.
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Rendered content such as descriptor YAML or a table row.
    pub fn detail(&self, text: &str) {
        if self.is_json() {
            return;
        }
        if text.ends_with('\n') {
            print!("{text}");
        } else {
            println!("{text}");
        }
    }

    /// Warnings go to stderr; JSON documents carry their own.
    pub fn warnings(&self, warnings: &[Warning]) {
        if self.is_json() {
            return;
        }
        for warning in warnings {
            eprintln!("Warning: {}", warning.message);
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => println!("{message} ({:.1}s)", self.elapsed_secs()),
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => {
                if let Some(line) = self.event_line("success", message) {
                    println!("{line}");
                }
            }
        }
    }

    pub fn error(&self, message: &str) {
        if self.is_json() {
            if let Some(line) = self.event_line("error", message) {
                eprintln!("{line}");
            }
        } else {
            eprintln!("Error: {message}");
        }
    }

    /// Print `document` as pretty JSON when in JSON mode.
    ///
    /// Returns `true` if it was printed, in which case the caller skips its
    /// human-readable lines.
    pub fn document<T: Serialize>(&self, document: &T) -> bool {
        if !self.is_json() {
            return false;
        }
        match serde_json::to_string_pretty(document) {
            Ok(json) => {
                println!("{json}");
                true
            }
            Err(e) => {
                tracing::error!("Failed to serialize outcome: {}", e);
                false
            }
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn event_line(&self, event: &str, message: &str) -> Option<String> {
        serde_json::to_string(&Event {
            event,
            message,
            elapsed_secs: self.elapsed_secs(),
        })
        .ok()
    }
}

#[derive(Serialize)]
struct Event<'a> {
    event: &'a str,
    message: &'a str,
    elapsed_secs: f64,
}
