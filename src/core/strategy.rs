//! Storage-strategy decision
//!
//! The decision order is a fixed tie-break: an explicit global-only flag
//! always wins, then search-path containment, then project-first.

use std::path::Path;

use tracing::warn;

use crate::core::paths::{is_within, normalize_search_path};
use crate::core::record::{DiscoveryConfig, Strategy};

/// Decide which storage strategy applies to `path`.
pub fn decide(path: &Path, global_only: bool, discovery: &DiscoveryConfig) -> Strategy {
    if global_only {
        return Strategy::GlobalOnly;
    }
    if in_search_paths(path, discovery) {
        return Strategy::AutoDiscovery;
    }
    Strategy::ProjectFirst
}

/// Whether `path` is equal to or nested under any configured search path.
pub fn in_search_paths(path: &Path, discovery: &DiscoveryConfig) -> bool {
    discovery.search_paths.iter().any(|raw| {
        match normalize_search_path(raw) {
            Ok(root) => is_within(path, &root),
            Err(e) => {
                warn!(search_path = %raw, error = %e, "ignoring unusable search path");
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn discovery(paths: &[&str]) -> DiscoveryConfig {
        DiscoveryConfig {
            auto_discover: true,
            search_paths: paths.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_global_only_flag_always_wins() {
        let cfg = discovery(&["/no/such/srv/projects"]);
        let path = PathBuf::from("/no/such/srv/projects/demo");
        assert_eq!(decide(&path, true, &cfg), Strategy::GlobalOnly);
    }

    #[test]
    fn test_inside_search_path_is_auto_discovery() {
        let cfg = discovery(&["/no/such/srv/projects/"]);
        assert_eq!(
            decide(Path::new("/no/such/srv/projects/demo"), false, &cfg),
            Strategy::AutoDiscovery
        );
        // equal to the root also counts
        assert_eq!(
            decide(Path::new("/no/such/srv/projects"), false, &cfg),
            Strategy::AutoDiscovery
        );
    }

    #[test]
    fn test_outside_search_paths_is_project_first() {
        let cfg = discovery(&["/no/such/srv/projects"]);
        assert_eq!(
            decide(Path::new("/home/user/elsewhere"), false, &cfg),
            Strategy::ProjectFirst
        );
        // sibling with a shared name prefix is not contained
        assert_eq!(
            decide(Path::new("/no/such/srv/projects-archive"), false, &cfg),
            Strategy::ProjectFirst
        );
    }

    #[test]
    fn test_empty_search_paths_fall_through() {
        let cfg = DiscoveryConfig::default();
        assert_eq!(
            decide(Path::new("/anywhere"), false, &cfg),
            Strategy::ProjectFirst
        );
    }
}
