//! Miette-based error diagnostics for CLI error presentation.
//!
//! Configuration errors carry the file content and, where the offending
//! field can be located, a labeled span pointing at it.

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::error::{ConfigError, Error, PipelineError};

/// Configuration error with source location context.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(swapguard::config))]
pub struct ConfigDiagnostic {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub help: Option<String>,
}

impl ConfigDiagnostic {
    /// The file could not be read at all.
    #[must_use]
    pub fn unreadable(path: &Path, err: &std::io::Error) -> Self {
        Self {
            message: format!("failed to read {}: {err}", path.display()),
            src: NamedSource::new(path.display().to_string(), String::new()),
            span: None,
            help: Some("pass the path of an existing TOML file".to_string()),
        }
    }

    /// Map a load failure onto the file content.
    #[must_use]
    pub fn from_error(path: &Path, content: &str, err: &Error) -> Self {
        let (message, span, help) = match err {
            Error::Config(ConfigError::Parse(parse)) => (
                format!("invalid TOML: {}", parse.message()),
                parse.span().map(|r| SourceSpan::from((r.start, r.len()))),
                None,
            ),
            Error::Config(ConfigError::InvalidValue { field, reason }) => (
                format!("invalid value for {field}: {reason}"),
                locate(content, field),
                Some(help_for(field).to_string()),
            ),
            Error::Config(ConfigError::MissingField { field }) => (
                format!("missing required field: {field}"),
                locate(content, field),
                Some(help_for(field).to_string()),
            ),
            other => (other.to_string(), None, None),
        };
        Self {
            message,
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span,
            help,
        }
    }
}

/// Byte span of `key` inside `[section]` for a dotted `section.key` field.
fn locate(content: &str, field: &str) -> Option<SourceSpan> {
    let (section, key) = field.split_once('.')?;
    let header = format!("[{section}]");
    let section_start = content.find(&header)?;
    let body = &content[section_start + header.len()..];
    let body = body.find("\n[").map_or(body, |end| &body[..end]);
    let offset = body.find(key)?;
    Some(SourceSpan::from((
        section_start + header.len() + offset,
        key.len(),
    )))
}

fn help_for(field: &str) -> &'static str {
    match field {
        "store.database" => "set [store].database or SWAPGUARD_DATABASE",
        "rate_limit.limit" => "allow at least one request per window",
        "execution.timeout_secs" => "keep the executor timeout below the swap and balance mutation lock TTLs",
        f if f.ends_with("_secs") || f.ends_with("_ms") => {
            "durations must be positive and at most 24 hours"
        }
        _ => "see config.example.toml for accepted values",
    }
}

/// The configured stores could not be opened or swept.
#[derive(Debug, Error, Diagnostic)]
#[error("store error: {message}")]
#[diagnostic(
    code(swapguard::store),
    help("check [store].backend and that the database file is writable")
)]
pub struct StoreDiagnostic {
    pub message: String,
}

impl StoreDiagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The simulated cycle did not behave as expected.
#[derive(Debug, Error, Diagnostic)]
#[error("simulation failed: {message}")]
#[diagnostic(code(swapguard::simulate))]
pub struct SimulationDiagnostic {
    pub message: String,

    #[help]
    pub help: Option<String>,
}

impl SimulationDiagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl From<PipelineError> for SimulationDiagnostic {
    fn from(err: PipelineError) -> Self {
        Self::new(err.to_string()).with_help(err.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::settings::Config;

    #[test]
    fn parse_error_points_at_offending_span() {
        let content = "[confirmation]\nttl_secs = \"soon\"\n";
        let err = Config::parse_toml_without_env(content).unwrap_err();
        let diagnostic = ConfigDiagnostic::from_error(Path::new("config.toml"), content, &err);

        assert!(diagnostic.message.starts_with("invalid TOML"));
        assert!(diagnostic.span.is_some());
    }

    #[test]
    fn invalid_value_is_located_in_its_section() {
        let content = "[locks]\nswap_ttl_secs = 1\n\n[confirmation]\nttl_secs = 0\n";
        let err = Config::parse_toml_without_env(content).unwrap_err();
        let diagnostic = ConfigDiagnostic::from_error(Path::new("config.toml"), content, &err);

        let span = diagnostic.span.unwrap();
        let at = content.find("[confirmation]").unwrap() + "[confirmation]\n".len();
        assert_eq!(span.offset(), at);
        assert_eq!(span.len(), "ttl_secs".len());
        assert!(diagnostic.help.is_some());
    }

    #[test]
    fn field_outside_file_has_no_span() {
        assert!(locate("", "store.database").is_none());
    }
}
