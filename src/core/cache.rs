//! TTL cache over the resolved project list
//!
//! One refresh at a time: when the cache is cold or expired, the first
//! caller performs the refresh while late callers block on a condvar and
//! pick up its result instead of triggering redundant scans. Any mutation
//! invalidates immediately.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::core::error::Result;
use crate::core::record::ProjectRecord;

/// Time-to-live measured from the last successful refresh
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

pub struct ProjectCache {
    ttl: Duration,
    state: Mutex<CacheState>,
    refreshed: Condvar,
}

#[derive(Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    refreshing: bool,
}

struct CacheEntry {
    loaded_at: Instant,
    payload: Vec<ProjectRecord>,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState::default()),
            refreshed: Condvar::new(),
        }
    }

    /// Return the cached payload, or run `refresh` if the cache is cold or
    /// expired. Concurrent callers share a single in-flight refresh.
    pub fn get_or_refresh<F>(&self, refresh: F) -> Result<Vec<ProjectRecord>>
    where
        F: FnOnce() -> Result<Vec<ProjectRecord>>,
    {
        let mut state = self.state.lock();
        loop {
            if let Some(entry) = &state.entry {
                if entry.loaded_at.elapsed() < self.ttl {
                    return Ok(entry.payload.clone());
                }
            }
            if !state.refreshing {
                break;
            }
            // another caller is refreshing; wait for its result
            self.refreshed.wait(&mut state);
        }
        state.refreshing = true;
        drop(state);

        let result = refresh();

        let mut state = self.state.lock();
        state.refreshing = false;
        if let Ok(payload) = &result {
            state.entry = Some(CacheEntry {
                loaded_at: Instant::now(),
                payload: payload.clone(),
            });
        }
        self.refreshed.notify_all();
        result
    }

    /// Drop the cached payload; the next read triggers a fresh scan.
    pub fn invalidate(&self) {
        self.state.lock().entry = None;
    }
}

impl Default for ProjectCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn record(id: &str) -> ProjectRecord {
        use crate::core::record::{DocumentScan, Strategy};
        ProjectRecord {
            id: id.to_string(),
            code: "AA".to_string(),
            name: id.to_string(),
            path: std::path::PathBuf::from("/srv").join(id),
            tickets_path: "tickets".to_string(),
            description: None,
            repository_url: None,
            active: true,
            strategy: Strategy::ProjectFirst,
            document: DocumentScan::default(),
        }
    }

    #[test]
    fn test_fresh_cache_skips_refresh() {
        let cache = ProjectCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_refresh(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![record("a")])
            })
            .unwrap();
        let second = cache
            .get_or_refresh(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![record("a")])
            })
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expired_cache_refreshes() {
        let cache = ProjectCache::with_ttl(Duration::from_millis(10));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_refresh(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![record("a")])
                })
                .unwrap();
            thread::sleep(Duration::from_millis(25));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_forces_rescan() {
        let cache = ProjectCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_refresh(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![record("a")])
                })
                .unwrap();
            cache.invalidate();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_callers_share_one_refresh() {
        let cache = Arc::new(ProjectCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                thread::spawn(move || {
                    cache
                        .get_or_refresh(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            // hold the refresh long enough for others to queue
                            thread::sleep(Duration::from_millis(50));
                            Ok(vec![record("a")])
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_refresh_leaves_cache_cold() {
        let cache = ProjectCache::new();
        let err = cache
            .get_or_refresh(|| Err(crate::core::error::Error::Conflict("boom".to_string())));
        assert!(err.is_err());

        // next caller retries the refresh rather than seeing stale data
        let ok = cache.get_or_refresh(|| Ok(vec![record("a")])).unwrap();
        assert_eq!(ok.len(), 1);
    }
}
