//! Merging global-registry and local-config data into effective records
//!
//! The three storage layouts are carried as one tagged union and resolved
//! through a single exhaustive match. Local values override global values
//! for any key present in both; disagreement on an identity field fails
//! the merge, and callers exclude the record with a warning instead of
//! aborting the whole operation.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::core::error::{Error, Result};
use crate::core::record::{
    id_from_path, GlobalEntry, LocalProject, ProjectRecord, Strategy,
};
use crate::core::validate::normalize_code;

/// One project's configuration shape, resolved per storage layout
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Complete registry entry, no local file
    GlobalOnly { entry: GlobalEntry },
    /// Minimal registry entry anchoring a complete local config
    ProjectFirst {
        global: GlobalEntry,
        local: LocalProject,
    },
    /// Local config found by scanning; nothing in the registry
    AutoDiscovered { root: PathBuf, local: LocalProject },
}

/// Produce the effective record for one source.
pub fn merge(source: ConfigSource) -> Result<ProjectRecord> {
    match source {
        ConfigSource::GlobalOnly { entry } => match entry {
            GlobalEntry::Complete {
                path,
                active,
                name,
                code,
                tickets_path,
                description,
                repository_url,
                document,
                ..
            } => build(
                path,
                name,
                code,
                tickets_path,
                description,
                repository_url,
                active,
                document,
                Strategy::GlobalOnly,
            ),
            GlobalEntry::Minimal { path, .. } => Err(Error::InconsistentConfig {
                id: id_from_path(&path).unwrap_or_default(),
                detail: "registry entry is minimal but no local config exists".to_string(),
            }),
        },

        ConfigSource::ProjectFirst { global, local } => {
            let registered = global.path().to_path_buf();
            if let Some(local_path) = &local.path {
                if local_path != &registered {
                    return Err(Error::InconsistentConfig {
                        id: id_from_path(&registered).unwrap_or_default(),
                        detail: format!(
                            "registered path {} differs from local path {}",
                            registered.display(),
                            local_path.display()
                        ),
                    });
                }
            }
            // local `active` wins over the registry value when present
            let active = local.active.unwrap_or_else(|| global.active());
            build(
                registered,
                local.name,
                local.code,
                local.tickets_path,
                local.description,
                local.repository_url,
                active,
                local.document.unwrap_or_default(),
                Strategy::ProjectFirst,
            )
        }

        ConfigSource::AutoDiscovered { root, local } => {
            if let Some(local_path) = &local.path {
                if local_path != &root {
                    return Err(Error::InconsistentConfig {
                        id: id_from_path(&root).unwrap_or_default(),
                        detail: format!(
                            "config found at {} but declares path {}",
                            root.display(),
                            local_path.display()
                        ),
                    });
                }
            }
            build(
                root,
                local.name,
                local.code,
                local.tickets_path,
                local.description,
                local.repository_url,
                local.active.unwrap_or(true),
                local.document.unwrap_or_default(),
                Strategy::AutoDiscovery,
            )
        }
    }
}

/// Registration timestamp for a newly created entry
pub fn registered_now() -> DateTime<Utc> {
    Utc::now()
}

#[allow(clippy::too_many_arguments)]
fn build(
    path: PathBuf,
    name: String,
    code: String,
    tickets_path: String,
    description: Option<String>,
    repository_url: Option<String>,
    active: bool,
    document: crate::core::record::DocumentScan,
    strategy: Strategy,
) -> Result<ProjectRecord> {
    let id = id_from_path(&path).ok_or_else(|| Error::InconsistentConfig {
        id: String::new(),
        detail: format!("{} has no directory basename to use as id", path.display()),
    })?;

    let code = normalize_code(&code).ok_or_else(|| Error::InconsistentConfig {
        id: id.clone(),
        detail: format!("persisted code '{code}' is not a valid ticket code"),
    })?;

    Ok(ProjectRecord {
        id,
        code,
        name,
        path,
        tickets_path,
        description,
        repository_url,
        active,
        strategy,
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::DocumentScan;

    fn local(name: &str, code: &str) -> LocalProject {
        LocalProject {
            name: name.to_string(),
            code: code.to_string(),
            path: None,
            tickets_path: "tickets".to_string(),
            description: Some("local description".to_string()),
            repository_url: None,
            active: None,
            document: None,
        }
    }

    fn minimal(path: &str, active: bool) -> GlobalEntry {
        GlobalEntry::Minimal {
            path: PathBuf::from(path),
            active,
            date_registered: Utc::now(),
        }
    }

    #[test]
    fn test_project_first_takes_local_fields_and_global_anchor() {
        let record = merge(ConfigSource::ProjectFirst {
            global: minimal("/srv/demo", false),
            local: local("Demo", "demo"),
        })
        .unwrap();

        assert_eq!(record.id, "demo");
        assert_eq!(record.code, "DEMO");
        assert_eq!(record.name, "Demo");
        assert_eq!(record.path, PathBuf::from("/srv/demo"));
        assert_eq!(record.description.as_deref(), Some("local description"));
        // `active` comes from the registry when the local file omits it
        assert!(!record.active);
        assert_eq!(record.strategy, Strategy::ProjectFirst);
    }

    #[test]
    fn test_local_active_overrides_global() {
        let mut l = local("Demo", "DEMO");
        l.active = Some(true);
        let record = merge(ConfigSource::ProjectFirst {
            global: minimal("/srv/demo", false),
            local: l,
        })
        .unwrap();
        assert!(record.active);
    }

    #[test]
    fn test_divergent_paths_fail_the_merge() {
        let mut l = local("Demo", "DEMO");
        l.path = Some(PathBuf::from("/srv/demo-clone"));
        let err = merge(ConfigSource::ProjectFirst {
            global: minimal("/srv/demo", true),
            local: l,
        })
        .unwrap_err();
        assert!(matches!(err, Error::InconsistentConfig { .. }));
    }

    #[test]
    fn test_auto_discovered_defaults_active() {
        let record = merge(ConfigSource::AutoDiscovered {
            root: PathBuf::from("/srv/projects/demo"),
            local: local("Demo", "DEMO"),
        })
        .unwrap();
        assert!(record.active);
        assert_eq!(record.strategy, Strategy::AutoDiscovery);
    }

    #[test]
    fn test_global_only_complete_entry() {
        let record = merge(ConfigSource::GlobalOnly {
            entry: GlobalEntry::Complete {
                path: PathBuf::from("/srv/demo"),
                active: true,
                date_registered: Utc::now(),
                name: "Demo".to_string(),
                code: "demo".to_string(),
                tickets_path: "tickets".to_string(),
                description: None,
                repository_url: None,
                document: DocumentScan::default(),
            },
        })
        .unwrap();
        assert_eq!(record.code, "DEMO");
        assert_eq!(record.strategy, Strategy::GlobalOnly);
    }

    #[test]
    fn test_minimal_entry_without_local_fails() {
        let err = merge(ConfigSource::GlobalOnly {
            entry: minimal("/srv/demo", true),
        })
        .unwrap_err();
        assert!(matches!(err, Error::InconsistentConfig { .. }));
    }

    #[test]
    fn test_persisted_garbage_code_fails() {
        let record = merge(ConfigSource::AutoDiscovered {
            root: PathBuf::from("/srv/demo"),
            local: local("Demo", "not a code"),
        });
        assert!(record.is_err());
    }
}
