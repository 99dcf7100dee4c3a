//! Error taxonomy shared by every interface adapter
//!
//! The CLI, web, and MCP adapters all render these types verbatim, which is
//! what keeps error output identical across interfaces. Parse errors carry
//! the offending file and byte span so miette can point at the source.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Path normalization failures
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("path does not exist: {0}")]
    #[diagnostic(code(mdt::path::not_found))]
    NotFound(PathBuf),

    #[error("path is not readable: {path}")]
    #[diagnostic(code(mdt::path::unreadable))]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path escapes the allowed roots: {0}")]
    #[diagnostic(
        code(mdt::path::traversal),
        help("remove '..' components or use a plain absolute path")
    )]
    Traversal(PathBuf),

    #[error("could not determine the home directory")]
    #[diagnostic(code(mdt::path::no_home))]
    NoHome,
}

/// A single field-level validation violation
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{field}: {message}")]
pub struct Violation {
    pub field: &'static str,
    pub rule: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(field: &'static str, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            rule,
            message: message.into(),
        }
    }
}

/// Malformed persisted TOML, with a span for diagnostics
#[derive(Debug, Error, Diagnostic)]
#[error("malformed TOML in {name}: {message}")]
#[diagnostic(code(mdt::config::parse))]
pub struct ParseError {
    name: String,
    message: String,

    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: Option<SourceSpan>,
}

impl ParseError {
    /// Build from a toml deserialization error against the raw file content
    pub fn from_toml(err: &toml::de::Error, source: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            message: err.message().to_string(),
            src: NamedSource::new(name, source.to_string()),
            span: err.span().map(SourceSpan::from),
        }
    }
}

/// The full taxonomy surfaced by the project service
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error("validation failed: {} error(s)", .violations.len())]
    #[diagnostic(code(mdt::validation))]
    Validation {
        #[related]
        violations: Vec<Violation>,
    },

    #[error("I/O error on {path}")]
    #[diagnostic(code(mdt::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    /// A concurrent mutation won the race; the caller must resubmit with
    /// fresh state. Never auto-retried.
    #[error("conflict: {0}")]
    #[diagnostic(code(mdt::conflict))]
    Conflict(String),

    /// Global registry and local config disagree on an identity field.
    /// Callers downgrade this to a warning and exclude the record.
    #[error("inconsistent config for '{id}': {detail}")]
    #[diagnostic(code(mdt::conflict::inconsistent))]
    InconsistentConfig { id: String, detail: String },

    #[error("project not found: {wanted}")]
    #[diagnostic(code(mdt::not_found))]
    NotFound {
        wanted: String,
        suggestions: Vec<String>,
        #[help]
        help: Option<String>,
    },

    #[error("operation cancelled")]
    #[diagnostic(code(mdt::cancelled))]
    Cancelled,
}

impl Error {
    pub fn validation(violations: Vec<Violation>) -> Self {
        Error::Validation { violations }
    }

    pub fn not_found(wanted: impl Into<String>, suggestions: Vec<String>) -> Self {
        let wanted = wanted.into();
        let help = if suggestions.is_empty() {
            None
        } else {
            Some(format!("did you mean: {}?", suggestions.join(", ")))
        };
        Error::NotFound {
            wanted,
            suggestions,
            help,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for the CLI adapter
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation { .. } => 2,
            Error::NotFound { .. } => 3,
            Error::Cancelled => 6,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::validation(vec![]).exit_code(), 2);
        assert_eq!(Error::not_found("X", vec![]).exit_code(), 3);
        assert_eq!(Error::Cancelled.exit_code(), 6);
        assert_eq!(Error::Conflict("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_not_found_suggestions_render_in_help() {
        let err = Error::not_found("WEBB", vec!["WEB".to_string(), "WEBUI".to_string()]);
        match err {
            Error::NotFound { help, .. } => {
                assert_eq!(help.as_deref(), Some("did you mean: WEB, WEBUI?"));
            }
            _ => panic!("expected NotFound"),
        }
    }

    #[test]
    fn test_parse_error_carries_span() {
        let source = "[project\nname = 1";
        let err = toml::from_str::<toml::Value>(source).unwrap_err();
        let parse = ParseError::from_toml(&err, source, "config.toml");
        assert!(parse.span.is_some());
        assert!(parse.to_string().contains("config.toml"));
    }
}
