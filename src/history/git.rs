//! `git` command-line binding.

use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{parse_log, CommitInfo, Vcs, LOG_FORMAT};
use crate::config::IndexingConfig;
use crate::error::{Result, TkgError};

const DEFAULT_LOG_TIMEOUT_SECS: u64 = 300;

/// Runs `git` as a child process, bounding every call with a timeout.
///
/// Listing the whole log gets its own, longer bound; per-commit calls
/// (`diff-tree`, `cat-file`, single-commit `log`) use the short one.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
    log_timeout: Duration,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            log_timeout: Duration::from_secs(DEFAULT_LOG_TIMEOUT_SECS),
        }
    }

    pub fn with_log_timeout(mut self, log_timeout: Duration) -> Self {
        self.log_timeout = log_timeout;
        self
    }

    pub fn from_config(indexing: &IndexingConfig) -> Self {
        Self::new(Duration::from_secs(indexing.vcs_timeout_secs))
            .with_log_timeout(Duration::from_secs(indexing.log_timeout_secs))
    }

    async fn run(&self, repo_path: &Path, args: &[&str]) -> Result<Output> {
        self.run_within(self.timeout, repo_path, args).await
    }

    async fn run_within(&self, timeout: Duration, repo_path: &Path, args: &[&str]) -> Result<Output> {
        let command = format!("git {}", args.join(" "));
        debug!("Running {}", command);

        let child = Command::new("git")
            .current_dir(repo_path)
            .args(["-c", "core.quotepath=off"])
            .args(args)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(TkgError::VcsTimeout {
                command,
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn run_checked(&self, repo_path: &Path, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.run(repo_path, args).await?;
        Self::check(args, output)
    }

    fn check(args: &[&str], output: Output) -> Result<Vec<u8>> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TkgError::VcsCommandFailure(format!(
                "git {}: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Vcs for GitCli {
    async fn list_commits(&self, repo_path: &Path) -> Result<Vec<CommitInfo>> {
        let format = format!("--format={}", LOG_FORMAT);
        let args: [&str; 3] = ["log", "--no-merges", &format];
        let output = self.run_within(self.log_timeout, repo_path, &args).await?;
        let stdout = Self::check(&args, output)?;
        Ok(parse_log(&String::from_utf8_lossy(&stdout)))
    }

    async fn commit_info(&self, repo_path: &Path, commit_hash: &str) -> Result<CommitInfo> {
        let format = format!("--format={}", LOG_FORMAT);
        let stdout = self
            .run_checked(repo_path, &["log", "-1", &format, commit_hash, "--"])
            .await?;

        parse_log(&String::from_utf8_lossy(&stdout))
            .into_iter()
            .next()
            .ok_or_else(|| TkgError::VcsCommandFailure(format!("Unreadable log entry for {}", commit_hash)))
    }

    async fn changed_files(&self, repo_path: &Path, commit_hash: &str) -> Result<Vec<String>> {
        let stdout = self
            .run_checked(
                repo_path,
                &["diff-tree", "--no-commit-id", "--name-only", "-r", "--root", commit_hash],
            )
            .await?;

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn blob_size(&self, repo_path: &Path, commit_hash: &str, file_path: &str) -> Result<Option<u64>> {
        let spec = format!("{}:{}", commit_hash, file_path);
        let output = self.run(repo_path, &["cat-file", "-s", &spec]).await?;
        if !output.status.success() {
            return Ok(None);
        }

        let size = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .map_err(|e| TkgError::VcsCommandFailure(format!("Unreadable size for {}: {}", spec, e)))?;
        Ok(Some(size))
    }

    async fn file_at(&self, repo_path: &Path, commit_hash: &str, file_path: &str) -> Result<Option<Vec<u8>>> {
        let spec = format!("{}:{}", commit_hash, file_path);
        let output = self.run(repo_path, &["cat-file", "blob", &spec]).await?;

        if output.status.success() {
            Ok(Some(output.stdout))
        } else {
            // deleted in this commit, or not a blob
            debug!(
                "No blob for {}: {}",
                spec,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::tempdir;

    fn git_available() -> bool {
        StdCommand::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str], date: &str) {
        let status = StdCommand::new("git")
            .current_dir(dir)
            .args(["-c", "user.name=Ada", "-c", "user.email=ada@example.com"])
            .args(args)
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    #[tokio::test]
    async fn test_git_cli_against_real_repository() {
        if !git_available() {
            return;
        }

        let dir = tempdir().unwrap();
        let root = dir.path();
        git(root, &["init", "-q"], "2024-01-01T00:00:00Z");

        std::fs::write(root.join("a.py"), "class Foo:\n    pass\n").unwrap();
        git(root, &["add", "a.py"], "2024-01-01T00:00:00Z");
        git(root, &["commit", "-q", "-m", "add foo"], "2024-01-01T00:00:00Z");

        std::fs::write(root.join("a.py"), "class Foo:\n    x = 1\n").unwrap();
        std::fs::write(root.join("b.py"), "def bar():\n    pass\n").unwrap();
        git(root, &["add", "a.py", "b.py"], "2024-01-02T00:00:00Z");
        git(root, &["commit", "-q", "-m", "change foo"], "2024-01-02T00:00:00Z");

        let cli = GitCli::default();
        let commits = cli.list_commits(root).await.unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "change foo");
        assert!(commits[0].timestamp_ms > commits[1].timestamp_ms);
        assert_eq!(commits[0].parents, vec![commits[1].hash.clone()]);

        let mut files = cli.changed_files(root, &commits[0].hash).await.unwrap();
        files.sort();
        assert_eq!(files, vec!["a.py".to_string(), "b.py".to_string()]);

        let root_files = cli.changed_files(root, &commits[1].hash).await.unwrap();
        assert_eq!(root_files, vec!["a.py".to_string()]);

        let size = cli.blob_size(root, &commits[1].hash, "a.py").await.unwrap();
        assert_eq!(size, Some(b"class Foo:\n    pass\n".len() as u64));
        assert!(cli.blob_size(root, &commits[1].hash, "b.py").await.unwrap().is_none());

        let old = cli.file_at(root, &commits[1].hash, "a.py").await.unwrap().unwrap();
        assert_eq!(old, b"class Foo:\n    pass\n");
        assert!(cli.file_at(root, &commits[1].hash, "b.py").await.unwrap().is_none());

        let single = cli.commit_info(root, &commits[1].hash).await.unwrap();
        assert_eq!(single, commits[1]);
    }

    #[test]
    fn test_log_listing_has_its_own_timeout() {
        let mut indexing = IndexingConfig::default();
        indexing.vcs_timeout_secs = 10;
        indexing.log_timeout_secs = 600;

        let cli = GitCli::from_config(&indexing);
        assert_eq!(cli.timeout, Duration::from_secs(10));
        assert_eq!(cli.log_timeout, Duration::from_secs(600));
        assert!(GitCli::default().log_timeout > GitCli::default().timeout);
    }

    #[tokio::test]
    async fn test_git_cli_fails_outside_repository() {
        if !git_available() {
            return;
        }

        let dir = tempdir().unwrap();
        let err = GitCli::default().list_commits(dir.path()).await.unwrap_err();
        assert!(matches!(err, TkgError::VcsCommandFailure(_)));
    }
}
