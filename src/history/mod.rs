// History extraction from version control

pub mod git;

#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;
use tracing::warn;

use crate::error::Result;

pub use git::GitCli;

/// Separates fields of one log record (ASCII unit separator)
pub const FIELD_SEPARATOR: char = '\x1f';
/// Terminates one log record (ASCII record separator)
pub const RECORD_SEPARATOR: char = '\x1e';

/// `git log` format matching [`parse_log`]
pub const LOG_FORMAT: &str = "%H%x1f%P%x1f%an%x1f%ae%x1f%cn%x1f%ce%x1f%ct%x1f%B%x1e";

const LOG_FIELDS: usize = 8;

/// One commit as reported by the VCS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub parents: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    /// Commit time in milliseconds since the epoch
    pub timestamp_ms: i64,
    pub message: String,
}

impl CommitInfo {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Binding to the version-control tool.
///
/// Every call may fail independently; callers treat failures as scoped to the
/// commit or file they concern.
#[allow(async_fn_in_trait)]
pub trait Vcs: Send + Sync {
    /// Non-merge commits, newest first
    async fn list_commits(&self, repo_path: &Path) -> Result<Vec<CommitInfo>>;

    /// A single commit by hash
    async fn commit_info(&self, repo_path: &Path, commit_hash: &str) -> Result<CommitInfo>;

    /// Paths (relative to the repository root) touched by the commit
    async fn changed_files(&self, repo_path: &Path, commit_hash: &str) -> Result<Vec<String>>;

    /// Size in bytes of the file as of the commit, without reading it
    async fn blob_size(&self, repo_path: &Path, commit_hash: &str, file_path: &str) -> Result<Option<u64>>;

    /// File bytes as of the commit, `None` when the path does not exist there
    async fn file_at(&self, repo_path: &Path, commit_hash: &str, file_path: &str) -> Result<Option<Vec<u8>>>;
}

/// Parse records produced with [`LOG_FORMAT`].
///
/// Malformed records are logged and dropped; the rest are returned in log order.
pub fn parse_log(output: &str) -> Vec<CommitInfo> {
    output
        .split(RECORD_SEPARATOR)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| match parse_record(record) {
            Some(info) => Some(info),
            None => {
                let preview: String = record.chars().take(60).collect();
                warn!("Skipping malformed log entry: {:?}", preview);
                None
            }
        })
        .collect()
}

fn parse_record(record: &str) -> Option<CommitInfo> {
    let fields: Vec<&str> = record.splitn(LOG_FIELDS, FIELD_SEPARATOR).collect();
    if fields.len() != LOG_FIELDS {
        return None;
    }

    let hash = fields[0].trim();
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let seconds: i64 = fields[6].trim().parse().ok()?;
    let author_email = fields[3].trim();
    let committer_email = fields[5].trim();
    if author_email.is_empty() || committer_email.is_empty() {
        return None;
    }

    Some(CommitInfo {
        hash: hash.to_string(),
        parents: fields[1].split_whitespace().map(String::from).collect(),
        author_name: fields[2].trim().to_string(),
        author_email: author_email.to_string(),
        committer_name: fields[4].trim().to_string(),
        committer_email: committer_email.to_string(),
        timestamp_ms: seconds.saturating_mul(1000),
        message: fields[7].trim_end().to_string(),
    })
}

/// Reorder newest-first log output into processing order: ascending by
/// timestamp, with equal timestamps keeping parents ahead of children.
pub fn into_processing_order(mut commits: Vec<CommitInfo>) -> Vec<CommitInfo> {
    commits.reverse();
    commits.sort_by_key(|c| c.timestamp_ms);
    commits
}
