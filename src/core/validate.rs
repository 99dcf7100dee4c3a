//! Field-level validation and normalization
//!
//! Violations are collected, never short-circuited: a caller always sees
//! everything wrong with the input at once.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

use crate::core::error::{Error, Result, Violation};
use crate::core::paths::PathResolver;
use crate::core::record::{DocumentScan, DEFAULT_TICKETS_PATH};

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new("^[A-Za-z]{2,5}$").unwrap());

/// Raw project fields as supplied by an adapter
#[derive(Debug, Clone, Default)]
pub struct ProjectInput {
    pub name: String,
    pub path: String,
    pub code: String,
    pub tickets_path: Option<String>,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub document: Option<DocumentScan>,
}

/// The normalized output of a successful validation
#[derive(Debug, Clone)]
pub struct ValidatedProject {
    pub name: String,
    pub path: PathBuf,
    pub code: String,
    pub tickets_path: String,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub document: DocumentScan,
}

/// Normalize a ticket code: accepted iff it matches `[A-Za-z]{2,5}`,
/// returned upper-cased. Idempotent.
pub fn normalize_code(raw: &str) -> Option<String> {
    CODE_RE
        .is_match(raw)
        .then(|| raw.to_ascii_uppercase())
}

/// Whether a tickets path is a usable relative path: non-empty, not
/// absolute, and without `..` components.
pub fn is_valid_tickets_path(raw: &str) -> bool {
    if raw.trim().is_empty() {
        return false;
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        return false;
    }
    !path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

pub struct Validator<'a> {
    resolver: &'a PathResolver,
}

impl<'a> Validator<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        Self { resolver }
    }

    /// Validate all fields, collecting every violation before returning.
    pub fn validate(&self, input: &ProjectInput) -> Result<ValidatedProject> {
        let mut violations = Vec::new();

        let name = input.name.trim().to_string();
        if name.is_empty() {
            violations.push(Violation::new(
                "name",
                "non-empty",
                "project name must not be empty",
            ));
        }

        let code = match normalize_code(&input.code) {
            Some(code) => Some(code),
            None => {
                violations.push(Violation::new(
                    "code",
                    "pattern",
                    format!(
                        "'{}' is not a valid code: expected 2-5 letters",
                        input.code
                    ),
                ));
                None
            }
        };

        let path = match self.resolver.resolve(&input.path) {
            Ok(path) => Some(path),
            Err(e) => {
                violations.push(Violation::new("path", "accessible", e.to_string()));
                None
            }
        };

        let tickets_path = input
            .tickets_path
            .clone()
            .unwrap_or_else(|| DEFAULT_TICKETS_PATH.to_string());
        if !is_valid_tickets_path(&tickets_path) {
            violations.push(Violation::new(
                "ticketsPath",
                "relative-path",
                format!("'{}' is not a valid relative path", tickets_path),
            ));
        }

        if !violations.is_empty() {
            return Err(Error::validation(violations));
        }

        Ok(ValidatedProject {
            name,
            path: path.expect("validated"),
            code: code.expect("validated"),
            tickets_path,
            description: input.description.clone(),
            repository_url: input.repository_url.clone(),
            document: input.document.clone().unwrap_or_default(),
        })
    }
}
