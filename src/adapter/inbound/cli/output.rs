//! Terminal output for CLI handlers.
//!
//! Every line goes through one of these functions so that `--json` turns the
//! whole session into newline-delimited `{"type": ..., "payload": ...}`
//! records and `--quiet` suppresses everything except warnings and errors.

use std::fmt::Display;
use std::sync::OnceLock;

use owo_colors::OwoColorize;
use parking_lot::RwLock;
use serde_json::{json, Value};

/// Output settings taken from the global CLI flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Emit machine-readable JSON lines instead of styled text.
    pub json: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Verbosity level (0 = normal, 1+ = increasingly verbose).
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }

    /// Log filter implied by the flags, if they override the configured one.
    #[must_use]
    pub const fn log_level(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn current() -> OutputConfig {
    *OUTPUT_CONFIG
        .get_or_init(|| RwLock::new(OutputConfig::default()))
        .read()
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    *OUTPUT_CONFIG
        .get_or_init(|| RwLock::new(OutputConfig::default()))
        .write() = config;
}

#[must_use]
pub fn is_json() -> bool {
    current().json
}

fn emit(kind: &str, payload: Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

/// Run `text` unless quiet; emit `payload` instead in JSON mode.
fn regular(kind: &str, payload: impl FnOnce() -> Value, text: impl FnOnce()) {
    let config = current();
    if config.json {
        emit(kind, payload());
    } else if !config.quiet {
        text();
    }
}

/// Print the application header with name and version.
pub fn header(version: &str) {
    regular(
        "header",
        || json!({ "app": "swapguard", "version": version }),
        || {
            println!("{} {}", "swapguard".bold(), version.dimmed());
            println!();
        },
    );
}

/// Print a section header.
pub fn section(title: &str) {
    regular(
        "section",
        || json!({ "title": title }),
        || {
            println!();
            println!("{}", title.bold());
        },
    );
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    regular(
        "field",
        || json!({ "label": label, "value": value }),
        || println!("  {:<16} {}", label.dimmed(), value),
    );
}

pub fn success(message: &str) {
    regular(
        "success",
        || json!({ "message": message }),
        || println!("  {} {}", "✓".green(), message),
    );
}

/// Print a warning line. Shown even in quiet mode.
pub fn warning(message: &str) {
    if is_json() {
        emit("warning", json!({ "message": message }));
        return;
    }
    println!("  {} {}", "⚠".yellow(), message);
}

/// Print an error line to stderr.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
        return;
    }
    eprintln!("  {} {}", "×".red(), message);
}

/// Print a dimmed note.
pub fn note(message: &str) {
    regular(
        "note",
        || json!({ "message": message }),
        || println!("  {}", message.dimmed()),
    );
}

/// Print a hint with a `hint:` prefix.
pub fn hint(message: &str) {
    regular(
        "hint",
        || json!({ "message": message }),
        || println!("  {}: {}", "hint".cyan().dimmed(), message.dimmed()),
    );
}

/// Print the outcome of one execution attempt.
pub fn attempt(index: usize, code: &str, message: &str) {
    regular(
        "attempt",
        || json!({ "attempt": index, "code": code, "message": message }),
        || {
            let label = format!("#{index}");
            if code == "settled" {
                println!("  {} {} {}", label.dimmed(), code.green(), message);
            } else {
                println!("  {} {} {}", label.dimmed(), code.red(), message);
            }
        },
    );
}

/// Print a table header row.
pub fn table_header(columns: &[(&str, usize)]) {
    regular(
        "table_header",
        || json!({ "columns": columns.iter().map(|(name, _)| *name).collect::<Vec<_>>() }),
        || {
            let line: String = columns
                .iter()
                .map(|(name, width)| format!("{name:<width$} "))
                .collect();
            println!("  {}", line.dimmed());
            let rule: String = columns
                .iter()
                .map(|(_, width)| format!("{} ", "─".repeat(*width)))
                .collect();
            println!("  {}", rule.dimmed());
        },
    );
}

/// Print a table data row.
pub fn table_row(cells: &[String], widths: &[usize]) {
    regular(
        "table_row",
        || json!({ "cells": cells }),
        || {
            let line: String = cells
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$} "))
                .collect();
            println!("  {line}");
        },
    );
}
