//! In-memory VCS used by ingestion tests.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::{CommitInfo, Vcs};
use crate::error::{Result, TkgError};

#[derive(Default)]
pub(crate) struct MemoryVcs {
    /// Oldest first
    commits: Vec<CommitInfo>,
    changes: HashMap<String, Vec<String>>,
    blobs: HashMap<(String, String), Vec<u8>>,
    failing_diffs: HashSet<String>,
    pub(crate) diff_calls: Mutex<Vec<String>>,
    /// `commit:path` of every blob read in full
    pub(crate) blob_reads: Mutex<Vec<String>>,
}

impl MemoryVcs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a commit on top of the previous one. `files` maps path to new
    /// content; `None` deletes the path.
    pub(crate) fn commit(&mut self, hash: &str, timestamp_secs: i64, files: &[(&str, Option<&str>)]) -> &mut Self {
        let parents = self.commits.last().map(|c| vec![c.hash.clone()]).unwrap_or_default();
        self.push(hash, parents, timestamp_secs, files)
    }

    pub(crate) fn push(
        &mut self,
        hash: &str,
        parents: Vec<String>,
        timestamp_secs: i64,
        files: &[(&str, Option<&str>)],
    ) -> &mut Self {
        // carry forward the previous tree
        if let Some(prev) = self.commits.last().map(|c| c.hash.clone()) {
            let carried: Vec<_> = self
                .blobs
                .iter()
                .filter(|((commit, _), _)| *commit == prev)
                .map(|((_, path), bytes)| (path.clone(), bytes.clone()))
                .collect();
            for (path, bytes) in carried {
                self.blobs.insert((hash.to_string(), path), bytes);
            }
        }

        for (path, content) in files {
            let key = (hash.to_string(), path.to_string());
            match content {
                Some(text) => {
                    self.blobs.insert(key, text.as_bytes().to_vec());
                }
                None => {
                    self.blobs.remove(&key);
                }
            }
        }

        self.changes
            .insert(hash.to_string(), files.iter().map(|(p, _)| p.to_string()).collect());
        self.commits.push(CommitInfo {
            hash: hash.to_string(),
            parents,
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            committer_name: "Bob".to_string(),
            committer_email: "bob@example.com".to_string(),
            timestamp_ms: timestamp_secs * 1000,
            message: format!("commit {}", hash),
        });
        self
    }

    pub(crate) fn fail_diff(&mut self, hash: &str) -> &mut Self {
        self.failing_diffs.insert(hash.to_string());
        self
    }
}

impl Vcs for MemoryVcs {
    async fn list_commits(&self, _repo_path: &Path) -> Result<Vec<CommitInfo>> {
        Ok(self
            .commits
            .iter()
            .rev()
            .filter(|c| !c.is_merge())
            .cloned()
            .collect())
    }

    async fn commit_info(&self, _repo_path: &Path, commit_hash: &str) -> Result<CommitInfo> {
        self.commits
            .iter()
            .find(|c| c.hash == commit_hash)
            .cloned()
            .ok_or_else(|| TkgError::VcsCommandFailure(format!("unknown revision {}", commit_hash)))
    }

    async fn changed_files(&self, _repo_path: &Path, commit_hash: &str) -> Result<Vec<String>> {
        self.diff_calls.lock().push(commit_hash.to_string());
        if self.failing_diffs.contains(commit_hash) {
            return Err(TkgError::VcsTimeout {
                command: format!("git diff-tree {}", commit_hash),
                secs: 10,
            });
        }
        Ok(self.changes.get(commit_hash).cloned().unwrap_or_default())
    }

    async fn blob_size(&self, _repo_path: &Path, commit_hash: &str, file_path: &str) -> Result<Option<u64>> {
        Ok(self
            .blobs
            .get(&(commit_hash.to_string(), file_path.to_string()))
            .map(|bytes| bytes.len() as u64))
    }

    async fn file_at(&self, _repo_path: &Path, commit_hash: &str, file_path: &str) -> Result<Option<Vec<u8>>> {
        self.blob_reads.lock().push(format!("{}:{}", commit_hash, file_path));
        Ok(self
            .blobs
            .get(&(commit_hash.to_string(), file_path.to_string()))
            .cloned())
    }
}
