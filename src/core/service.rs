//! The single project-service facade consumed by every adapter
//!
//! One instance owns the store, the discovery config (loaded once at
//! startup), the TTL cache, and the keyed lock table; it is passed by
//! reference to whichever interface fronts it. Because there is exactly
//! one implementation, CLI, web, and MCP adapters cannot drift apart in
//! field sets or error shapes.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::core::cache::ProjectCache;
use crate::core::discovery;
use crate::core::error::{Error, Result, Violation};
use crate::core::guard::{FileSnapshot, MutationState, ProjectLocks, VersionMarker};
use crate::core::merge::{self, ConfigSource};
use crate::core::paths::PathResolver;
use crate::core::record::{
    id_from_path, DiscoveryConfig, GlobalEntry, LocalProject, ProjectRecord, Strategy,
};
use crate::core::store::ConfigStore;
use crate::core::strategy;
use crate::core::validate::{normalize_code, ProjectInput, ValidatedProject, Validator};

/// Fields accepted by `create`
#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub name: String,
    pub path: String,
    pub code: String,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub tickets_path: Option<String>,
    pub global_only: bool,
}

/// Fields accepted by `update`; unset fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct UpdatePatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub tickets_path: Option<String>,
}

impl UpdatePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.description.is_none()
            && self.repository_url.is_none()
            && self.tickets_path.is_none()
    }
}

pub struct ProjectService {
    store: ConfigStore,
    resolver: PathResolver,
    discovery: DiscoveryConfig,
    cache: ProjectCache,
    locks: ProjectLocks,
}

impl ProjectService {
    /// Open against the default config directory.
    pub fn open() -> Result<Self> {
        Self::with_store(ConfigStore::open_default()?)
    }

    /// Open against a specific store; the discovery config is loaded once
    /// here and kept for the lifetime of the service.
    pub fn with_store(store: ConfigStore) -> Result<Self> {
        let resolver = PathResolver::new()?;
        let discovery = store.load_discovery_config()?;
        Ok(Self {
            store,
            resolver,
            discovery,
            cache: ProjectCache::new(),
            locks: ProjectLocks::new(),
        })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn discovery_config(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    /// Persist a new discovery config and invalidate the cache.
    pub fn set_discovery_config(&mut self, discovery: DiscoveryConfig) -> Result<()> {
        self.store.save_discovery_config(&discovery)?;
        self.discovery = discovery;
        self.cache.invalidate();
        Ok(())
    }

    // ---- facade operations ----

    pub fn create(&self, spec: CreateProject) -> Result<ProjectRecord> {
        debug!(state = %MutationState::Validating, "create");
        let validator = Validator::new(&self.resolver);
        let input = ProjectInput {
            name: spec.name,
            path: spec.path,
            code: spec.code,
            tickets_path: spec.tickets_path,
            description: spec.description,
            repository_url: spec.repository_url,
            document: None,
        };
        let validated = validator.validate(&input).map_err(|e| {
            debug!(state = %MutationState::Rejected, "create");
            e
        })?;

        let id = id_from_path(&validated.path).ok_or_else(|| {
            Error::validation(vec![Violation::new(
                "path",
                "basename",
                "path has no directory basename to use as a project id",
            )])
        })?;

        let strategy = strategy::decide(&validated.path, spec.global_only, &self.discovery);

        // version markers captured at the start of the operation
        let registry_path = self.store.registry_path(&id);
        let local_path = ConfigStore::local_config_path(&validated.path);
        let registry_marker = VersionMarker::capture(&registry_path);
        let local_marker = VersionMarker::capture(&local_path);

        if self.store.load_global_entry(&id)?.is_some() {
            return Err(Error::Conflict(format!(
                "project '{id}' is already registered"
            )));
        }
        if strategy != Strategy::GlobalOnly
            && self.store.load_local_config(&validated.path)?.is_some()
        {
            return Err(Error::Conflict(format!(
                "{} already has a local config",
                validated.path.display()
            )));
        }

        let lock = self.locks.for_project(&id);
        let _guard = lock.lock();
        debug!(state = %MutationState::Locked, id = %id, strategy = %strategy, "create");

        let record = match strategy {
            Strategy::GlobalOnly => {
                registry_marker.verify_unchanged()?;
                debug!(state = %MutationState::Writing, id = %id, "create");
                let entry = GlobalEntry::Complete {
                    path: validated.path.clone(),
                    active: true,
                    date_registered: merge::registered_now(),
                    name: validated.name.clone(),
                    code: validated.code.clone(),
                    tickets_path: validated.tickets_path.clone(),
                    description: validated.description.clone(),
                    repository_url: validated.repository_url.clone(),
                    document: validated.document.clone(),
                };
                self.store.save_global_entry(&id, &entry)?;
                merge::merge(ConfigSource::GlobalOnly { entry })?
            }
            Strategy::ProjectFirst => {
                registry_marker.verify_unchanged()?;
                local_marker.verify_unchanged()?;
                debug!(state = %MutationState::Writing, id = %id, "create");
                let registry_snapshot = FileSnapshot::capture(&registry_path)?;
                let entry = GlobalEntry::Minimal {
                    path: validated.path.clone(),
                    active: true,
                    date_registered: merge::registered_now(),
                };
                self.store.save_global_entry(&id, &entry)?;

                let local = local_from(&validated, None);
                if let Err(e) = self.store.save_local_config(&validated.path, &local) {
                    warn!(state = %MutationState::RolledBack, id = %id, error = %e, "create failed");
                    let _ = registry_snapshot.restore();
                    return Err(e);
                }
                merge::merge(ConfigSource::ProjectFirst {
                    global: entry,
                    local,
                })?
            }
            Strategy::AutoDiscovery => {
                local_marker.verify_unchanged()?;
                debug!(state = %MutationState::Writing, id = %id, "create");
                let local = local_from(&validated, None);
                self.store.save_local_config(&validated.path, &local)?;
                merge::merge(ConfigSource::AutoDiscovered {
                    root: validated.path.clone(),
                    local,
                })?
            }
        };

        let tickets_dir = record.path.join(&record.tickets_path);
        if let Err(e) = fs::create_dir_all(&tickets_dir) {
            warn!(dir = %tickets_dir.display(), error = %e, "could not create tickets directory");
        }

        self.cache.invalidate();
        debug!(state = %MutationState::Committed, id = %id, "create");
        Ok(record)
    }

    /// The effective record list, cached for 30 seconds.
    pub fn list(&self) -> Result<Vec<ProjectRecord>> {
        self.cache.get_or_refresh(|| self.load_all())
    }

    pub fn get(&self, wanted: &str) -> Result<ProjectRecord> {
        let records = self.list()?;

        if let Some(record) = records.iter().find(|r| r.id == wanted) {
            return Ok(record.clone());
        }
        if let Some(code) = normalize_code(wanted) {
            if let Some(record) = records.iter().find(|r| r.code == code) {
                return Ok(record.clone());
            }
        }
        if wanted.contains('/') || wanted.starts_with('~') || wanted == "." {
            if let Ok(path) = self.resolver.resolve(wanted) {
                if let Some(record) = records.iter().find(|r| r.path == path) {
                    return Ok(record.clone());
                }
            }
        }

        Err(Error::not_found(wanted, suggestions(wanted, &records)))
    }

    pub fn update(&self, wanted: &str, patch: UpdatePatch) -> Result<ProjectRecord> {
        let current = self.get(wanted)?;
        debug!(state = %MutationState::Validating, id = %current.id, "update");

        // the file this operation rewrites
        let target = match current.strategy {
            Strategy::GlobalOnly => self.store.registry_path(&current.id),
            Strategy::ProjectFirst | Strategy::AutoDiscovery => {
                ConfigStore::local_config_path(&current.path)
            }
        };
        let marker = VersionMarker::capture(&target);

        let input = ProjectInput {
            name: patch.name.unwrap_or_else(|| current.name.clone()),
            path: current.path.to_string_lossy().into_owned(),
            code: patch.code.unwrap_or_else(|| current.code.clone()),
            tickets_path: Some(
                patch
                    .tickets_path
                    .unwrap_or_else(|| current.tickets_path.clone()),
            ),
            description: patch.description.or_else(|| current.description.clone()),
            repository_url: patch
                .repository_url
                .or_else(|| current.repository_url.clone()),
            document: Some(current.document.clone()),
        };
        let validated = Validator::new(&self.resolver).validate(&input).map_err(|e| {
            debug!(state = %MutationState::Rejected, id = %current.id, "update");
            e
        })?;

        let lock = self.locks.for_project(&current.id);
        let _guard = lock.lock();
        marker.verify_unchanged()?;
        debug!(state = %MutationState::Writing, id = %current.id, "update");
        let snapshot = FileSnapshot::capture(&target)?;

        let result = match current.strategy {
            Strategy::GlobalOnly => {
                let date_registered = match self.store.load_global_entry(&current.id)? {
                    Some(GlobalEntry::Complete {
                        date_registered, ..
                    })
                    | Some(GlobalEntry::Minimal {
                        date_registered, ..
                    }) => date_registered,
                    None => {
                        return Err(Error::Conflict(format!(
                            "registry entry for '{}' vanished mid-operation",
                            current.id
                        )))
                    }
                };
                let entry = GlobalEntry::Complete {
                    path: current.path.clone(),
                    active: current.active,
                    date_registered,
                    name: validated.name.clone(),
                    code: validated.code.clone(),
                    tickets_path: validated.tickets_path.clone(),
                    description: validated.description.clone(),
                    repository_url: validated.repository_url.clone(),
                    document: validated.document.clone(),
                };
                self.store
                    .save_global_entry(&current.id, &entry)
                    .and_then(|_| merge::merge(ConfigSource::GlobalOnly { entry }))
            }
            Strategy::ProjectFirst => {
                let global = self.store.load_global_entry(&current.id)?.ok_or_else(|| {
                    Error::Conflict(format!(
                        "registry entry for '{}' vanished mid-operation",
                        current.id
                    ))
                })?;
                let previous_active = self
                    .store
                    .load_local_config(&current.path)?
                    .and_then(|l| l.active);
                let local = local_from(&validated, previous_active);
                self.store
                    .save_local_config(&current.path, &local)
                    .and_then(|_| merge::merge(ConfigSource::ProjectFirst { global, local }))
            }
            Strategy::AutoDiscovery => {
                let previous_active = self
                    .store
                    .load_local_config(&current.path)?
                    .and_then(|l| l.active);
                let local = local_from(&validated, previous_active);
                self.store
                    .save_local_config(&current.path, &local)
                    .and_then(|_| {
                        merge::merge(ConfigSource::AutoDiscovered {
                            root: current.path.clone(),
                            local,
                        })
                    })
            }
        };

        match result {
            Ok(record) => {
                self.cache.invalidate();
                debug!(state = %MutationState::Committed, id = %current.id, "update");
                Ok(record)
            }
            Err(e) => {
                warn!(state = %MutationState::RolledBack, id = %current.id, error = %e, "update failed");
                let _ = snapshot.restore();
                Err(e)
            }
        }
    }

    pub fn delete(&self, wanted: &str) -> Result<()> {
        let current = self.get(wanted)?;
        let registry_path = self.store.registry_path(&current.id);
        let local_path = ConfigStore::local_config_path(&current.path);

        let markers: Vec<VersionMarker> = match current.strategy {
            Strategy::GlobalOnly => vec![VersionMarker::capture(&registry_path)],
            Strategy::ProjectFirst => vec![
                VersionMarker::capture(&registry_path),
                VersionMarker::capture(&local_path),
            ],
            Strategy::AutoDiscovery => vec![VersionMarker::capture(&local_path)],
        };

        let lock = self.locks.for_project(&current.id);
        let _guard = lock.lock();
        for marker in &markers {
            marker.verify_unchanged()?;
        }
        debug!(state = %MutationState::Writing, id = %current.id, "delete");

        let registry_snapshot = FileSnapshot::capture(&registry_path)?;
        let local_snapshot = FileSnapshot::capture(&local_path)?;

        let result = (|| -> Result<()> {
            match current.strategy {
                Strategy::GlobalOnly => {
                    self.store.remove_global_entry(&current.id)?;
                }
                Strategy::ProjectFirst => {
                    self.store.remove_global_entry(&current.id)?;
                    self.store.remove_local_config(&current.path)?;
                }
                Strategy::AutoDiscovery => {
                    self.store.remove_local_config(&current.path)?;
                }
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.cache.invalidate();
                debug!(state = %MutationState::Committed, id = %current.id, "delete");
                Ok(())
            }
            Err(e) => {
                warn!(state = %MutationState::RolledBack, id = %current.id, error = %e, "delete failed");
                let _ = registry_snapshot.restore();
                let _ = local_snapshot.restore();
                Err(e)
            }
        }
    }

    pub fn set_active(&self, wanted: &str, active: bool) -> Result<ProjectRecord> {
        let current = self.get(wanted)?;

        let target = match current.strategy {
            // for global-only and project-first, activation lives in the
            // registry so the project's own files stay untouched
            Strategy::GlobalOnly | Strategy::ProjectFirst => {
                self.store.registry_path(&current.id)
            }
            Strategy::AutoDiscovery => ConfigStore::local_config_path(&current.path),
        };
        let marker = VersionMarker::capture(&target);

        let lock = self.locks.for_project(&current.id);
        let _guard = lock.lock();
        marker.verify_unchanged()?;
        debug!(state = %MutationState::Writing, id = %current.id, active, "set_active");
        let snapshot = FileSnapshot::capture(&target)?;

        let result = match current.strategy {
            Strategy::GlobalOnly | Strategy::ProjectFirst => {
                match self.store.load_global_entry(&current.id)? {
                    Some(mut entry) => {
                        entry.set_active(active);
                        self.store.save_global_entry(&current.id, &entry)
                    }
                    None => Err(Error::Conflict(format!(
                        "registry entry for '{}' vanished mid-operation",
                        current.id
                    ))),
                }
            }
            Strategy::AutoDiscovery => match self.store.load_local_config(&current.path)? {
                Some(mut local) => {
                    local.active = Some(active);
                    self.store.save_local_config(&current.path, &local)
                }
                None => Err(Error::Conflict(format!(
                    "local config for '{}' vanished mid-operation",
                    current.id
                ))),
            },
        };

        if let Err(e) = result {
            warn!(state = %MutationState::RolledBack, id = %current.id, error = %e, "set_active failed");
            let _ = snapshot.restore();
            return Err(e);
        }

        self.cache.invalidate();
        debug!(state = %MutationState::Committed, id = %current.id, "set_active");
        self.get(&current.id)
    }

    /// Run a discovery scan now, regardless of the `autoDiscover` flag.
    /// Used by the `discover` command to preview what a scan would find.
    pub fn discover_preview(&self) -> Vec<ProjectRecord> {
        discovery::discover(&self.discovery, &self.store)
            .into_iter()
            .filter_map(|candidate| {
                merge::merge(ConfigSource::AutoDiscovered {
                    root: candidate.root.clone(),
                    local: candidate.local,
                })
                .map_err(|e| {
                    warn!(candidate = %candidate.root.display(), error = %e, "excluding discovered project");
                })
                .ok()
            })
            .collect()
    }

    // ---- resolution ----

    /// Resolve every known project from disk: registry entries first, then
    /// discovered candidates when auto-discovery is on. Individual bad
    /// records are excluded with a warning; the listing never aborts.
    fn load_all(&self) -> Result<Vec<ProjectRecord>> {
        let mut records: Vec<ProjectRecord> = Vec::new();
        let mut seen_paths: HashSet<PathBuf> = HashSet::new();

        for (id, entry) in self.store.list_global_entries()? {
            let source = match &entry {
                GlobalEntry::Complete { .. } => ConfigSource::GlobalOnly { entry },
                GlobalEntry::Minimal { .. } => {
                    match self.store.load_local_config(entry.path()) {
                        Ok(Some(local)) => ConfigSource::ProjectFirst {
                            global: entry,
                            local,
                        },
                        Ok(None) => {
                            warn!(id = %id, "registered project has no local config, excluding");
                            continue;
                        }
                        Err(e) => {
                            warn!(id = %id, error = %e, "unreadable local config, excluding");
                            continue;
                        }
                    }
                }
            };
            match merge::merge(source) {
                Ok(record) => {
                    if record.id != id {
                        warn!(
                            id = %id,
                            derived = %record.id,
                            "registry file name does not match the directory basename, excluding"
                        );
                        continue;
                    }
                    seen_paths.insert(record.path.clone());
                    records.push(record);
                }
                Err(e) => warn!(id = %id, error = %e, "excluding inconsistent project"),
            }
        }

        if self.discovery.auto_discover {
            for candidate in discovery::discover(&self.discovery, &self.store) {
                if seen_paths.contains(&candidate.root)
                    || records
                        .iter()
                        .any(|r| Some(r.id.as_str()) == id_from_path(&candidate.root).as_deref())
                {
                    debug!(candidate = %candidate.root.display(), "already registered, skipping");
                    continue;
                }
                match merge::merge(ConfigSource::AutoDiscovered {
                    root: candidate.root.clone(),
                    local: candidate.local,
                }) {
                    Ok(record) => {
                        seen_paths.insert(record.path.clone());
                        records.push(record);
                    }
                    Err(e) => {
                        warn!(candidate = %candidate.root.display(), error = %e, "excluding discovered project")
                    }
                }
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

fn local_from(validated: &ValidatedProject, active: Option<bool>) -> LocalProject {
    LocalProject {
        name: validated.name.clone(),
        code: validated.code.clone(),
        path: Some(validated.path.clone()),
        tickets_path: validated.tickets_path.clone(),
        description: validated.description.clone(),
        repository_url: validated.repository_url.clone(),
        active,
        document: Some(validated.document.clone()),
    }
}

/// Known codes and ids nearest to the requested one, for the not-found
/// suggestion list.
fn suggestions(wanted: &str, records: &[ProjectRecord]) -> Vec<String> {
    let target = wanted.to_ascii_uppercase();
    let mut scored: Vec<(usize, String)> = Vec::new();
    for record in records {
        for candidate in [record.code.as_str(), record.id.as_str()] {
            let distance = edit_distance(&target, &candidate.to_ascii_uppercase());
            if distance <= 2 {
                scored.push((distance, candidate.to_string()));
            }
        }
    }
    scored.sort();
    scored.dedup_by(|a, b| a.1 == b.1);
    scored.into_iter().take(3).map(|(_, s)| s).collect()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}
