//! Bounded filesystem discovery of undeclared projects
//!
//! Walks each configured search path at most [`DiscoveryConfig::MAX_DEPTH`]
//! levels deep, skipping hidden directories and a fixed exclusion set.
//! Every candidate is validated before it is surfaced; bad candidates are
//! logged and dropped, never aborting the scan.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::paths::normalize_search_path;
use crate::core::record::{
    id_from_path, DiscoveryConfig, LocalProject, LOCAL_CONFIG_FILE,
};
use crate::core::store::ConfigStore;
use crate::core::validate::{is_valid_tickets_path, normalize_code};

/// Directory names never descended into, in addition to hidden directories
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", ".idea", ".vscode"];

/// A directory holding a validated local config, found by scanning
#[derive(Debug, Clone)]
pub struct Candidate {
    pub root: PathBuf,
    pub local: LocalProject,
}

/// Walk the given roots, yielding directories that contain a local config
/// file. Bounded, finite, restartable on each call.
pub fn scan(search_paths: &[PathBuf], max_depth: usize) -> impl Iterator<Item = PathBuf> + '_ {
    search_paths.iter().flat_map(move |root| {
        WalkDir::new(root)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| !is_excluded(entry))
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory during scan");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| entry.path().join(LOCAL_CONFIG_FILE).is_file())
            .map(|entry| entry.path().to_path_buf())
    })
}

/// Scan the configured search paths and return validated, deduplicated
/// candidates.
pub fn discover(discovery: &DiscoveryConfig, store: &ConfigStore) -> Vec<Candidate> {
    let roots = expand_roots(discovery);
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_paths: HashSet<PathBuf> = HashSet::new();
    let mut candidates = Vec::new();

    for root in scan(&roots, DiscoveryConfig::MAX_DEPTH) {
        let local = match store.load_local_config(&root) {
            Ok(Some(local)) => local,
            Ok(None) => continue,
            Err(e) => {
                warn!(candidate = %root.display(), error = %e, "skipping unreadable candidate");
                continue;
            }
        };

        let Some(id) = id_from_path(&root) else {
            warn!(candidate = %root.display(), "skipping candidate without a basename");
            continue;
        };

        if let Err(reason) = check_candidate(&root, &local) {
            warn!(candidate = %root.display(), reason, "skipping invalid candidate");
            continue;
        }

        if !seen_ids.insert(id.clone()) || !seen_paths.insert(root.clone()) {
            warn!(candidate = %root.display(), id, "skipping duplicate discovery");
            continue;
        }

        debug!(candidate = %root.display(), id, "discovered project");
        candidates.push(Candidate { root, local });
    }

    candidates
}

fn expand_roots(discovery: &DiscoveryConfig) -> Vec<PathBuf> {
    discovery
        .search_paths
        .iter()
        .filter_map(|raw| match normalize_search_path(raw) {
            Ok(root) if root.is_dir() => Some(root),
            Ok(root) => {
                warn!(search_path = %root.display(), "search path does not exist, skipping");
                None
            }
            Err(e) => {
                warn!(search_path = %raw, error = %e, "unusable search path, skipping");
                None
            }
        })
        .collect()
}

/// Field checks a candidate must pass before being surfaced. Mirrors the
/// validator rules that apply to already-persisted data.
fn check_candidate(root: &PathBuf, local: &LocalProject) -> Result<(), &'static str> {
    if local.name.trim().is_empty() {
        return Err("empty project name");
    }
    if normalize_code(&local.code).is_none() {
        return Err("invalid ticket code");
    }
    if !is_valid_tickets_path(&local.tickets_path) {
        return Err("invalid tickets path");
    }
    if let Some(declared) = &local.path {
        if declared != root {
            // mismatched worktree clones are excluded, not errored
            return Err("declared path differs from the directory scanned");
        }
    }
    Ok(())
}

fn is_excluded(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &std::path::Path, name: &str, code: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(LOCAL_CONFIG_FILE),
            format!("[project]\nname = \"{name}\"\ncode = \"{code}\"\n"),
        )
        .unwrap();
    }

    fn discovery_for(root: &std::path::Path) -> DiscoveryConfig {
        DiscoveryConfig {
            auto_discover: true,
            search_paths: vec![root.to_string_lossy().into_owned()],
        }
    }

    #[test]
    fn test_scan_finds_nested_projects_within_depth() {
        let tmp = tempdir().unwrap();
        write_config(&tmp.path().join("a"), "A", "AA");
        write_config(&tmp.path().join("x/y/b"), "B", "BB");

        let found: Vec<_> = scan(&[tmp.path().to_path_buf()], 3).collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_scan_respects_max_depth() {
        let tmp = tempdir().unwrap();
        // depth 4 below the root: out of bounds
        write_config(&tmp.path().join("a/b/c/deep"), "D", "DD");
        write_config(&tmp.path().join("a/b/ok"), "O", "OK");

        let found: Vec<_> = scan(&[tmp.path().to_path_buf()], 3).collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("ok"));
    }

    #[test]
    fn test_scan_skips_hidden_and_excluded_dirs() {
        let tmp = tempdir().unwrap();
        write_config(&tmp.path().join("node_modules/pkg"), "P", "PK");
        write_config(&tmp.path().join(".hidden/proj"), "H", "HH");
        write_config(&tmp.path().join("visible"), "V", "VV");

        let found: Vec<_> = scan(&[tmp.path().to_path_buf()], 3).collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("visible"));
    }

    #[test]
    fn test_discover_validates_candidates() {
        let tmp = tempdir().unwrap();
        let store = ConfigStore::new(tmp.path().join("cfg"));
        write_config(&tmp.path().join("projects/good"), "Good", "GD");
        write_config(&tmp.path().join("projects/badcode"), "Bad", "not-a-code");
        write_config(&tmp.path().join("projects/noname"), "", "NN");
        fs::create_dir_all(tmp.path().join("projects/broken")).unwrap();
        fs::write(
            tmp.path().join("projects/broken").join(LOCAL_CONFIG_FILE),
            "not [ toml",
        )
        .unwrap();

        let found = discover(&discovery_for(&tmp.path().join("projects")), &store);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].local.name, "Good");
    }

    #[test]
    fn test_discover_skips_mismatched_declared_path() {
        let tmp = tempdir().unwrap();
        let store = ConfigStore::new(tmp.path().join("cfg"));
        let dir = tmp.path().join("projects/clone");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(LOCAL_CONFIG_FILE),
            "[project]\nname = \"Clone\"\ncode = \"CL\"\npath = \"/srv/original\"\n",
        )
        .unwrap();

        let found = discover(&discovery_for(&tmp.path().join("projects")), &store);
        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_skips_duplicate_ids_across_roots() {
        let tmp = tempdir().unwrap();
        let store = ConfigStore::new(tmp.path().join("cfg"));
        write_config(&tmp.path().join("one/demo"), "Demo 1", "DA");
        write_config(&tmp.path().join("two/demo"), "Demo 2", "DB");

        let cfg = DiscoveryConfig {
            auto_discover: true,
            search_paths: vec![
                tmp.path().join("one").to_string_lossy().into_owned(),
                tmp.path().join("two").to_string_lossy().into_owned(),
            ],
        };
        let found = discover(&cfg, &store);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].local.name, "Demo 1");
    }

    #[test]
    fn test_missing_search_path_is_skipped() {
        let tmp = tempdir().unwrap();
        let store = ConfigStore::new(tmp.path().join("cfg"));
        let cfg = DiscoveryConfig {
            auto_discover: true,
            search_paths: vec!["/no/such/root".to_string()],
        };
        assert!(discover(&cfg, &store).is_empty());
    }
}
