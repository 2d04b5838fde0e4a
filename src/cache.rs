//! Content-hash change cache.
//!
//! Stored hashes live in the `file_hashes` table; a small in-process memo sits
//! in front of it and can be dropped at any time under memory pressure.

use dashmap::DashMap;
use tracing::debug;

use crate::error::Result;
use crate::store::db::GraphConn;

pub struct ChangeCache {
    enabled: bool,
    memo: DashMap<(String, String), String>,
}

impl ChangeCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            memo: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when the stored hash for the file equals `current_hash`.
    /// Always false while the cache is disabled.
    pub fn should_skip(&self, g: &GraphConn<'_>, repo_id: &str, file_path: &str, current_hash: &str) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }

        let key = (repo_id.to_string(), file_path.to_string());
        if let Some(stored) = self.memo.get(&key) {
            return Ok(stored.as_str() == current_hash);
        }

        match g.get_file_hash(repo_id, file_path)? {
            Some(stored) => {
                let unchanged = stored == current_hash;
                self.memo.insert(key, stored);
                if unchanged {
                    debug!("Unchanged since last run: {}", file_path);
                }
                Ok(unchanged)
            }
            None => Ok(false),
        }
    }

    /// Persist the hash seen for a file. Written even while disabled so a
    /// later incremental run starts from fresh hashes.
    pub fn record_hash(&self, g: &GraphConn<'_>, repo_id: &str, file_path: &str, content_hash: &str) -> Result<()> {
        g.set_file_hash(repo_id, file_path, content_hash)?;
        // the write may still roll back; re-read on next lookup
        self.memo.remove(&(repo_id.to_string(), file_path.to_string()));
        Ok(())
    }

    /// Drop the in-process memo
    pub fn clear_memory(&self) {
        let entries = self.memo.len();
        self.memo.clear();
        self.memo.shrink_to_fit();
        debug!("Cleared {} change-cache entries", entries);
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}
