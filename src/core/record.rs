//! Project data model and persisted TOML shapes
//!
//! Three files exist on disk:
//! - `<project>/.mdt-config.toml` with a `[project]` table (local config)
//! - `<config-dir>/projects/<dir>.toml` with a `[project]` table (registry)
//! - `<config-dir>/config.toml` with a `[discovery]` table
//!
//! Registry entries come in two shapes, recognized once at parse time and
//! carried as [`GlobalEntry`] so nothing downstream has to probe optional
//! fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the per-project local config
pub const LOCAL_CONFIG_FILE: &str = ".mdt-config.toml";

/// Default tickets directory, relative to the project root
pub const DEFAULT_TICKETS_PATH: &str = "tickets";

/// The three mutually exclusive storage strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    GlobalOnly,
    ProjectFirst,
    AutoDiscovery,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::GlobalOnly => write!(f, "global-only"),
            Strategy::ProjectFirst => write!(f, "project-first"),
            Strategy::AutoDiscovery => write!(f, "auto-discovery"),
        }
    }
}

/// Document-scan settings, persisted as `[project.document]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentScan {
    pub paths: Vec<String>,
    pub exclude_folders: Vec<String>,
    pub max_depth: u32,
}

impl Default for DocumentScan {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            exclude_folders: vec!["node_modules".to_string(), ".git".to_string()],
            max_depth: 2,
        }
    }
}

/// The effective, merged view of one project as seen by every adapter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    /// Directory basename of `path`
    pub id: String,
    /// Upper-cased ticket code, `[A-Z]{2,5}`
    pub code: String,
    pub name: String,
    pub path: PathBuf,
    pub tickets_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    pub active: bool,
    pub strategy: Strategy,
    pub document: DocumentScan,
}

/// Contents of the `[project]` table in `.mdt-config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalProject {
    pub name: String,
    pub code: String,
    /// Optional; when present it must match the directory the file lives in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_tickets_path")]
    pub tickets_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    /// Normally absent for project-first layouts, where `active` lives in
    /// the registry entry; when present the local value wins the merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentScan>,
}

fn default_tickets_path() -> String {
    DEFAULT_TICKETS_PATH.to_string()
}

/// On-disk wrapper: `[project]` table of `.mdt-config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfigFile {
    pub project: LocalProject,
}

/// Raw `[project]` table of a registry file, before shape classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalProject {
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub active: bool,
    pub date_registered: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentScan>,
}

fn default_true() -> bool {
    true
}

/// On-disk wrapper: `[project]` table of a registry file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalRegistryFile {
    pub project: GlobalProject,
}

/// A registry entry after shape classification
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalEntry {
    /// Project-first layout: the registry only anchors path and activation
    Minimal {
        path: PathBuf,
        active: bool,
        date_registered: DateTime<Utc>,
    },
    /// Global-only layout: the registry carries the full field set
    Complete {
        path: PathBuf,
        active: bool,
        date_registered: DateTime<Utc>,
        name: String,
        code: String,
        tickets_path: String,
        description: Option<String>,
        repository_url: Option<String>,
        document: DocumentScan,
    },
}

impl GlobalEntry {
    /// Classify a parsed registry table. An entry is complete when it
    /// carries both `name` and `code`; anything less is treated as minimal
    /// and the stray fields are ignored.
    pub fn classify(raw: GlobalProject) -> Self {
        match (raw.name, raw.code) {
            (Some(name), Some(code)) => GlobalEntry::Complete {
                path: raw.path,
                active: raw.active,
                date_registered: raw.date_registered,
                name,
                code,
                tickets_path: raw.tickets_path.unwrap_or_else(default_tickets_path),
                description: raw.description,
                repository_url: raw.repository_url,
                document: raw.document.unwrap_or_default(),
            },
            _ => GlobalEntry::Minimal {
                path: raw.path,
                active: raw.active,
                date_registered: raw.date_registered,
            },
        }
    }

    /// Back to the on-disk table shape
    pub fn to_raw(&self) -> GlobalProject {
        match self {
            GlobalEntry::Minimal {
                path,
                active,
                date_registered,
            } => GlobalProject {
                path: path.clone(),
                active: *active,
                date_registered: *date_registered,
                name: None,
                code: None,
                tickets_path: None,
                description: None,
                repository_url: None,
                document: None,
            },
            GlobalEntry::Complete {
                path,
                active,
                date_registered,
                name,
                code,
                tickets_path,
                description,
                repository_url,
                document,
            } => GlobalProject {
                path: path.clone(),
                active: *active,
                date_registered: *date_registered,
                name: Some(name.clone()),
                code: Some(code.clone()),
                tickets_path: Some(tickets_path.clone()),
                description: description.clone(),
                repository_url: repository_url.clone(),
                document: Some(document.clone()),
            },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            GlobalEntry::Minimal { path, .. } | GlobalEntry::Complete { path, .. } => path,
        }
    }

    pub fn active(&self) -> bool {
        match self {
            GlobalEntry::Minimal { active, .. } | GlobalEntry::Complete { active, .. } => *active,
        }
    }

    pub fn set_active(&mut self, value: bool) {
        match self {
            GlobalEntry::Minimal { active, .. } | GlobalEntry::Complete { active, .. } => {
                *active = value
            }
        }
    }
}

/// The `[discovery]` table of the global config file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    pub auto_discover: bool,
    pub search_paths: Vec<String>,
}

impl DiscoveryConfig {
    /// Scan depth below each search-path root. Fixed, not configurable.
    pub const MAX_DEPTH: usize = 3;
}

/// On-disk wrapper for `<config-dir>/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfigFile {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Directory basename used as the project id
pub fn id_from_path(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: Option<&str>, code: Option<&str>) -> GlobalProject {
        GlobalProject {
            path: PathBuf::from("/srv/demo"),
            active: true,
            date_registered: Utc::now(),
            name: name.map(String::from),
            code: code.map(String::from),
            tickets_path: None,
            description: None,
            repository_url: None,
            document: None,
        }
    }

    #[test]
    fn test_classify_complete_requires_name_and_code() {
        assert!(matches!(
            GlobalEntry::classify(raw(Some("Demo"), Some("DEMO"))),
            GlobalEntry::Complete { .. }
        ));
        assert!(matches!(
            GlobalEntry::classify(raw(Some("Demo"), None)),
            GlobalEntry::Minimal { .. }
        ));
        assert!(matches!(
            GlobalEntry::classify(raw(None, None)),
            GlobalEntry::Minimal { .. }
        ));
    }

    #[test]
    fn test_local_config_round_trip() {
        let file = LocalConfigFile {
            project: LocalProject {
                name: "Demo".to_string(),
                code: "DEMO".to_string(),
                path: None,
                tickets_path: "tickets".to_string(),
                description: Some("A demo".to_string()),
                repository_url: None,
                active: None,
                document: Some(DocumentScan::default()),
            },
        };
        let toml = toml::to_string_pretty(&file).unwrap();
        assert!(toml.contains("[project]"));
        assert!(toml.contains("[project.document]"));
        assert!(toml.contains("ticketsPath"));

        let parsed: LocalConfigFile = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.project, file.project);
    }

    #[test]
    fn test_minimal_registry_entry_omits_complete_fields() {
        let entry = GlobalEntry::Minimal {
            path: PathBuf::from("/srv/demo"),
            active: true,
            date_registered: Utc::now(),
        };
        let toml = toml::to_string_pretty(&GlobalRegistryFile {
            project: entry.to_raw(),
        })
        .unwrap();
        assert!(toml.contains("dateRegistered"));
        assert!(!toml.contains("name"));
        assert!(!toml.contains("code"));
    }

    #[test]
    fn test_discovery_config_defaults() {
        let parsed: AppConfigFile = toml::from_str("").unwrap();
        assert!(!parsed.discovery.auto_discover);
        assert!(parsed.discovery.search_paths.is_empty());
    }

    #[test]
    fn test_id_from_path() {
        assert_eq!(
            id_from_path(Path::new("/srv/my-project")).as_deref(),
            Some("my-project")
        );
        assert_eq!(id_from_path(Path::new("/")), None);
    }
}
