//! Ingestion pipeline: commits in, versioned graph out.
//!
//! Commits are applied strictly one after another in ascending timestamp
//! order. Each commit is written in a single transaction, so a failure leaves
//! no partial commit behind and the run can be resumed at any point.

use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::ChangeCache;
use crate::config::{Config, IndexingConfig};
use crate::engine::{upsert_element_in, write_version_in};
use crate::error::Result;
use crate::history::{into_processing_order, CommitInfo, Vcs};
use crate::memory::{MemoryMonitor, MemoryPressure};
use crate::parser::{ElementDescriptor, ParserRegistry};
use crate::store::db::{GraphConn, GraphStore};
use crate::store::{content_hash, Commit, Developer, Repository};

/// Shared flag observed at batch boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reported after every batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestProgress {
    pub batch: usize,
    pub total_batches: usize,
    pub commits_done: usize,
    pub total_commits: usize,
    pub pressure: MemoryPressure,
}

pub type ProgressCallback = Box<dyn Fn(&IngestProgress) + Send + Sync>;

#[derive(Default)]
pub struct IngestOptions {
    pub progress: Option<ProgressCallback>,
    pub cancel: CancelFlag,
}

/// Result of one commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    /// False when the commit row already existed
    pub newly_indexed: bool,
    pub files_parsed: usize,
    pub files_unchanged: usize,
    pub files_unsupported: usize,
    pub files_deleted: usize,
    pub versions_written: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub commits_seen: usize,
    pub commits_indexed: usize,
    pub commits_already_indexed: usize,
    pub commits_failed: usize,
    pub files_parsed: usize,
    pub files_unchanged: usize,
    pub files_unsupported: usize,
    pub versions_written: usize,
    pub cancelled: bool,
    pub memory_critical: bool,
}

impl IngestSummary {
    /// Something was left out of the graph, but what was written is complete
    pub fn is_partial(&self) -> bool {
        self.commits_failed > 0 || self.cancelled || self.memory_critical
    }

    fn absorb(&mut self, outcome: &CommitOutcome) {
        if outcome.newly_indexed {
            self.commits_indexed += 1;
        } else {
            self.commits_already_indexed += 1;
        }
        self.files_parsed += outcome.files_parsed;
        self.files_unchanged += outcome.files_unchanged;
        self.files_unsupported += outcome.files_unsupported;
        self.versions_written += outcome.versions_written;
    }
}

/// A changed file already parsed, waiting for the commit transaction
struct ParsedFile {
    path: String,
    hash: String,
    descriptors: Vec<ElementDescriptor>,
}

pub struct Ingestor<V: Vcs> {
    store: GraphStore,
    vcs: V,
    parsers: ParserRegistry,
    cache: ChangeCache,
    monitor: MemoryMonitor,
    config: Config,
}

impl<V: Vcs> Ingestor<V> {
    pub fn new(store: GraphStore, vcs: V, config: Config) -> Self {
        let parsers =
            ParserRegistry::for_languages(&config.get_enabled_languages(), config.indexing.max_file_size);

        Self {
            cache: ChangeCache::new(config.indexing.use_change_cache),
            monitor: MemoryMonitor::new(&config.memory),
            store,
            vcs,
            parsers,
            config,
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    fn indexing(&self) -> &IndexingConfig {
        &self.config.indexing
    }

    /// Index every non-merge commit of the repository, oldest first.
    ///
    /// Per-commit failures are logged and counted; only an unavailable store
    /// aborts the run.
    pub async fn index_full_history(
        &self,
        repo_path: &Path,
        repo_id: &str,
        options: &IngestOptions,
    ) -> Result<IngestSummary> {
        self.ensure_repository(repo_path, repo_id)?;

        let commits = into_processing_order(self.vcs.list_commits(repo_path).await?);
        let batch_size = self.indexing().batch_size.max(1);
        let total_commits = commits.len();
        let total_batches = total_commits.div_ceil(batch_size);

        info!(
            "Indexing {} commits in {} batches of up to {}",
            total_commits, total_batches, batch_size
        );

        let mut summary = IngestSummary::default();
        let mut commits_done = 0;

        for (index, batch) in commits.chunks(batch_size).enumerate() {
            if options.cancel.is_cancelled() {
                info!("Indexing cancelled after {} commits", commits_done);
                summary.cancelled = true;
                break;
            }

            for info in batch {
                summary.commits_seen += 1;
                commits_done += 1;

                match self.index_one(repo_path, repo_id, info).await {
                    Ok(Some(outcome)) => summary.absorb(&outcome),
                    Ok(None) => summary.commits_already_indexed += 1,
                    Err(e) if e.is_fatal() => {
                        error!("Aborting indexing at commit {}: {}", info.hash, e);
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("Skipping commit {}: {}", info.hash, e);
                        summary.commits_failed += 1;
                    }
                }
            }

            let batch = index + 1;
            let pressure = self.relieve_memory(batch, &mut summary)?;

            if let Some(progress) = &options.progress {
                progress(&IngestProgress {
                    batch,
                    total_batches,
                    commits_done,
                    total_commits,
                    pressure,
                });
            }

            tokio::task::yield_now().await;
        }

        info!(
            "Indexed {} commits ({} already present, {} failed), {} versions written",
            summary.commits_indexed, summary.commits_already_indexed, summary.commits_failed, summary.versions_written
        );

        Ok(summary)
    }

    /// Index a single commit, typically one just created on top of an
    /// already indexed history.
    pub async fn process_commit(&self, repo_path: &Path, repo_id: &str, commit_hash: &str) -> Result<CommitOutcome> {
        self.ensure_repository(repo_path, repo_id)?;
        let info = self.vcs.commit_info(repo_path, commit_hash).await?;
        self.ingest_commit(repo_path, repo_id, &info).await
    }

    /// `None` when the change cache is on and the commit is already stored;
    /// its transaction was atomic, so presence implies completeness.
    async fn index_one(&self, repo_path: &Path, repo_id: &str, info: &CommitInfo) -> Result<Option<CommitOutcome>> {
        if self.cache.is_enabled() && self.store.read(|g| g.commit_exists(&info.hash))? {
            debug!("Commit {} already indexed", info.hash);
            return Ok(None);
        }
        self.ingest_commit(repo_path, repo_id, info).await.map(Some)
    }

    fn ensure_repository(&self, repo_path: &Path, repo_id: &str) -> Result<()> {
        self.store.write(|g| {
            if g.get_repository(repo_id)?.is_none() {
                let mut repo = Repository::for_path(repo_path);
                repo.repo_id = repo_id.to_string();
                g.upsert_repository(&repo)?;
                info!("Registered repository {} ({})", repo.name, repo.path);
            }
            Ok(())
        })
    }

    async fn ingest_commit(&self, repo_path: &Path, repo_id: &str, info: &CommitInfo) -> Result<CommitOutcome> {
        let mut outcome = CommitOutcome::default();
        let changed = self.vcs.changed_files(repo_path, &info.hash).await?;

        // one blob in memory at a time; oversized blobs are never fetched
        let mut parsed = Vec::new();
        for path in changed {
            if !self.config.should_index_file(&path) || !self.parsers.supports(&path) {
                outcome.files_unsupported += 1;
                continue;
            }

            let Some(size) = self.vcs.blob_size(repo_path, &info.hash, &path).await? else {
                debug!("{} removed in {}", path, info.hash);
                outcome.files_deleted += 1;
                continue;
            };
            if size > self.parsers.max_file_size() as u64 {
                debug!("Skipping {} ({} bytes)", path, size);
                outcome.files_unsupported += 1;
                continue;
            }

            let Some(bytes) = self.vcs.file_at(repo_path, &info.hash, &path).await? else {
                outcome.files_deleted += 1;
                continue;
            };

            let hash = content_hash(&bytes);
            if self.store.read(|g| self.cache.should_skip(g, repo_id, &path, &hash))? {
                outcome.files_unchanged += 1;
                continue;
            }

            let descriptors = self.parsers.parse_file(&path, &bytes);
            parsed.push(ParsedFile { path, hash, descriptors });
        }

        self.store.write(|g| {
            outcome.newly_indexed = self.write_commit(g, repo_id, info)?;

            for file in &parsed {
                for descriptor in &file.descriptors {
                    let element_id = upsert_element_in(g, repo_id, descriptor)?;
                    let (_, written) = write_version_in(
                        g,
                        &element_id,
                        &info.hash,
                        &descriptor.name,
                        descriptor.start_line,
                        descriptor.end_line,
                    )?;
                    if written {
                        outcome.versions_written += 1;
                    }
                }
                outcome.files_parsed += 1;

                // a replayed commit must not roll stored hashes back
                if outcome.newly_indexed {
                    self.cache.record_hash(g, repo_id, &file.path, &file.hash)?;
                }
            }
            Ok(())
        })?;

        debug!(
            "Commit {}: {} parsed, {} unchanged, {} versions",
            info.hash, outcome.files_parsed, outcome.files_unchanged, outcome.versions_written
        );

        Ok(outcome)
    }

    /// Developers, the commit row and its parent edges. Returns whether the
    /// commit was new.
    fn write_commit(&self, g: &GraphConn<'_>, repo_id: &str, info: &CommitInfo) -> Result<bool> {
        let author = Developer::new(&info.author_name, &info.author_email);
        let committer = Developer::new(&info.committer_name, &info.committer_email);
        g.upsert_developer(&author)?;
        g.upsert_developer(&committer)?;

        let inserted = g.insert_commit(&Commit {
            commit_hash: info.hash.clone(),
            repo_id: repo_id.to_string(),
            message: info.message.clone(),
            timestamp_ms: info.timestamp_ms,
            author_dev_id: author.dev_id,
            committer_dev_id: committer.dev_id,
        })?;

        for parent in &info.parents {
            g.insert_commit_parent(&info.hash, parent)?;
        }

        Ok(inserted)
    }

    /// Periodic cache clearing plus the escalating responses to memory
    /// pressure. Maintenance failures other than a lost store only warn.
    fn relieve_memory(&self, batch: usize, summary: &mut IngestSummary) -> Result<MemoryPressure> {
        let every = self.indexing().compact_every_batches;
        if every > 0 && batch % every == 0 {
            debug!("Clearing caches after batch {}", batch);
            self.cache.clear_memory();
            tolerate(self.store.release_memory())?;
        }

        let pressure = self.monitor.sample();
        match pressure {
            MemoryPressure::Normal => {}
            MemoryPressure::Elevated => {
                info!("Memory pressure elevated, clearing caches");
                self.cache.clear_memory();
                tolerate(self.store.release_memory())?;
            }
            MemoryPressure::High | MemoryPressure::Critical => {
                warn!("Memory pressure {}, compacting store", pressure);
                self.cache.clear_memory();
                tolerate(self.store.release_memory())?;
                tolerate(self.store.compact())?;
                tolerate(self.store.reopen())?;

                if pressure == MemoryPressure::Critical && !summary.memory_critical {
                    error!("Memory usage is critical; indexing continues without further recovery");
                    summary.memory_critical = true;
                }
            }
        }

        Ok(pressure)
    }
}

fn tolerate(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("Store maintenance failed: {}", e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::trace_history_in;
    use crate::history::fake::MemoryVcs;
    use crate::query::QueryEngine;
    use crate::config::MemoryConfig;
    use crate::error::TkgError;
    use crate::store::db::tests::test_store;
    use crate::store::{element_id, version_id, ElementType, GraphStats};
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const FOO_V1: &str = "class Foo {\n  bar() {\n    return 1;\n  }\n}\n";
    const FOO_V2: &str = "class Foo {\n  bar() {\n    return 2;\n  }\n\n  baz() {}\n}\n";

    struct Fixture {
        _dir: TempDir,
        store: GraphStore,
        repo_path: PathBuf,
        repo_id: String,
    }

    fn fixture() -> Fixture {
        let (dir, store) = test_store();
        let repo_path = PathBuf::from("/work/demo");
        let repo_id = Repository::for_path(&repo_path).repo_id;
        Fixture {
            _dir: dir,
            store,
            repo_path,
            repo_id,
        }
    }

    fn config(batch_size: usize, use_change_cache: bool) -> Config {
        let mut config = Config::default();
        config.indexing.batch_size = batch_size;
        config.indexing.use_change_cache = use_change_cache;
        config
    }

    fn foo_history() -> MemoryVcs {
        let mut vcs = MemoryVcs::new();
        vcs.commit("c1", 1_000, &[("a.ts", Some(FOO_V1))])
            .commit("c2", 2_000, &[("a.ts", Some(FOO_V2))]);
        vcs
    }

    fn counts(store: &GraphStore) -> GraphStats {
        store.stats().unwrap()
    }

    #[tokio::test]
    async fn test_two_commit_history_chains_versions() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), foo_history(), config(10, true));

        let summary = ingestor
            .index_full_history(&f.repo_path, &f.repo_id, &IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.commits_indexed, 2);
        assert!(!summary.is_partial());

        let foo = element_id(&f.repo_id, ElementType::Class, "a.ts:class:Foo");
        let v1 = version_id(&foo, "c1");
        let v2 = version_id(&foo, "c2");

        let history = f.store.read(|g| trace_history_in(g, &foo)).unwrap();
        let ids: Vec<&str> = history.iter().map(|v| v.version_id.as_str()).collect();
        assert_eq!(ids, vec![v2.as_str(), v1.as_str()]);
        assert_eq!(history[0].previous_version_id.as_deref(), Some(v1.as_str()));

        // baz only exists from c2 on
        let baz = element_id(&f.repo_id, ElementType::Function, "a.ts:class:Foo:method:baz");
        let baz_history = f.store.read(|g| trace_history_in(g, &baz)).unwrap();
        assert_eq!(baz_history.len(), 1);
        assert!(baz_history[0].previous_version_id.is_none());

        let query = QueryEngine::new(f.store.clone());
        assert_eq!(query.parents_of("c2").unwrap(), vec!["c1".to_string()]);
        assert_eq!(query.children_of("c1").unwrap(), vec!["c2".to_string()]);

        let stats = counts(&f.store);
        assert_eq!(stats.commits, 2);
        // Ada authors, Bob commits
        assert_eq!(stats.developers, 2);
    }

    #[tokio::test]
    async fn test_reindexing_adds_no_rows() {
        for use_cache in [true, false] {
            let f = fixture();
            let ingestor = Ingestor::new(f.store.clone(), foo_history(), config(10, use_cache));
            let options = IngestOptions::default();

            ingestor.index_full_history(&f.repo_path, &f.repo_id, &options).await.unwrap();
            let before = counts(&f.store);

            let diffs_before = ingestor.vcs.diff_calls.lock().len();
            let again = ingestor.index_full_history(&f.repo_path, &f.repo_id, &options).await.unwrap();
            let rediffed = ingestor.vcs.diff_calls.lock().len() - diffs_before;
            // stored commits are skipped before any diff when the cache is on
            assert_eq!(rediffed, if use_cache { 0 } else { 2 });
            assert_eq!(again.commits_indexed, 0);
            assert_eq!(again.commits_already_indexed, 2);
            assert_eq!(again.versions_written, 0);

            ingestor.process_commit(&f.repo_path, &f.repo_id, "c1").await.unwrap();
            assert_eq!(counts(&f.store), before);
        }
    }

    #[tokio::test]
    async fn test_replayed_commit_keeps_latest_file_hash() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), foo_history(), config(10, false));
        ingestor
            .index_full_history(&f.repo_path, &f.repo_id, &IngestOptions::default())
            .await
            .unwrap();

        ingestor.process_commit(&f.repo_path, &f.repo_id, "c1").await.unwrap();

        let stored = f.store.read(|g| g.get_file_hash(&f.repo_id, "a.ts")).unwrap();
        assert_eq!(stored, Some(content_hash(FOO_V2.as_bytes())));
    }

    #[tokio::test]
    async fn test_unchanged_content_is_skipped_by_cache() {
        let mut vcs = MemoryVcs::new();
        vcs.commit("c1", 1_000, &[("a.ts", Some(FOO_V1))])
            .commit("c2", 2_000, &[("a.ts", Some(FOO_V1))]);

        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), vcs, config(10, true));
        let summary = ingestor
            .index_full_history(&f.repo_path, &f.repo_id, &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.files_unchanged, 1);
        assert_eq!(summary.commits_indexed, 2);
        let touched = QueryEngine::new(f.store.clone()).elements_for_commit("c2").unwrap();
        assert!(touched.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_reparses_unchanged_content() {
        let mut vcs = MemoryVcs::new();
        vcs.commit("c1", 1_000, &[("a.ts", Some(FOO_V1))])
            .commit("c2", 2_000, &[("a.ts", Some(FOO_V1))]);

        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), vcs, config(10, false));
        let summary = ingestor
            .index_full_history(&f.repo_path, &f.repo_id, &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.files_unchanged, 0);
        let touched = QueryEngine::new(f.store.clone()).elements_for_commit("c2").unwrap();
        assert_eq!(touched.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_diff_skips_only_that_commit() {
        let mut vcs = MemoryVcs::new();
        vcs.commit("c1", 1_000, &[("a.py", Some("def f():\n    pass\n"))])
            .commit("c2", 2_000, &[("b.py", Some("def g():\n    pass\n"))])
            .commit("c3", 3_000, &[("a.py", Some("def f():\n    return 1\n"))])
            .fail_diff("c2");

        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), vcs, config(10, true));
        let summary = ingestor
            .index_full_history(&f.repo_path, &f.repo_id, &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.commits_failed, 1);
        assert_eq!(summary.commits_indexed, 2);
        assert!(summary.is_partial());

        let store = &f.store;
        assert!(!store.read(|g| g.commit_exists("c2")).unwrap());
        let f_id = element_id(&f.repo_id, ElementType::Function, "a.py:function:f");
        assert_eq!(store.read(|g| trace_history_in(g, &f_id)).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_and_deleted_files() {
        let mut vcs = MemoryVcs::new();
        vcs.commit(
            "c1",
            1_000,
            &[("README.md", Some("# demo\n")), ("a.py", Some("x = 1\n")), ("node_modules/x.ts", Some("class X {}\n"))],
        )
        .commit("c2", 2_000, &[("a.py", None)]);

        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), vcs, config(10, true));
        let summary = ingestor
            .index_full_history(&f.repo_path, &f.repo_id, &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.files_unsupported, 2);
        assert_eq!(summary.files_parsed, 1);
        assert_eq!(counts(&f.store).elements, 1);
        assert!(!summary.is_partial());
    }

    #[tokio::test]
    async fn test_progress_reported_per_batch() {
        let mut vcs = MemoryVcs::new();
        for i in 1..=5 {
            let content = format!("V = {}\n", i);
            vcs.commit(&format!("c{}", i), i * 1_000, &[("a.py", Some(content.as_str()))]);
        }

        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), vcs, config(2, true));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = IngestOptions {
            progress: Some(Box::new(move |p: &IngestProgress| sink.lock().push(p.clone()))),
            cancel: CancelFlag::new(),
        };

        ingestor.index_full_history(&f.repo_path, &f.repo_id, &options).await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|p| p.total_batches == 3 && p.total_commits == 5));
        assert_eq!(seen.last().map(|p| p.commits_done), Some(5));
    }

    #[tokio::test]
    async fn test_cancellation_observed_at_batch_boundary() {
        let mut vcs = MemoryVcs::new();
        for i in 1..=4 {
            let content = format!("V = {}\n", i);
            vcs.commit(&format!("c{}", i), i * 1_000, &[("a.py", Some(content.as_str()))]);
        }

        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), vcs, config(2, true));
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let options = IngestOptions {
            progress: Some(Box::new(move |_: &IngestProgress| trigger.cancel())),
            cancel,
        };

        let summary = ingestor.index_full_history(&f.repo_path, &f.repo_id, &options).await.unwrap();
        assert!(summary.cancelled);
        assert!(summary.is_partial());
        assert_eq!(summary.commits_indexed, 2);
        assert_eq!(counts(&f.store).commits, 2);
    }

    #[tokio::test]
    async fn test_out_of_order_commit_fails_without_writing() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), foo_history(), config(10, false));

        ingestor.process_commit(&f.repo_path, &f.repo_id, "c2").await.unwrap();
        let before = counts(&f.store);

        let err = ingestor.process_commit(&f.repo_path, &f.repo_id, "c1").await.unwrap_err();
        assert!(matches!(err, TkgError::OutOfOrderVersion { .. }));
        assert_eq!(counts(&f.store), before);
    }

    #[tokio::test]
    async fn test_process_commit_extends_history() {
        let mut vcs = foo_history();
        vcs.commit("c3", 3_000, &[("a.ts", Some(FOO_V1))]);

        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), vcs, config(10, true));
        for hash in ["c1", "c2", "c3"] {
            ingestor.process_commit(&f.repo_path, &f.repo_id, hash).await.unwrap();
        }

        let foo = element_id(&f.repo_id, ElementType::Class, "a.ts:class:Foo");
        let history = f.store.read(|g| trace_history_in(g, &foo)).unwrap();
        let commits: Vec<&str> = history.iter().map(|v| v.commit_hash.as_str()).collect();
        assert_eq!(commits, vec!["c3", "c2", "c1"]);
    }

    #[tokio::test]
    async fn test_oversized_blob_is_never_fetched() {
        let big = format!("X = '{}'\n", "x".repeat(4096));
        let mut vcs = MemoryVcs::new();
        vcs.commit(
            "c1",
            1_000,
            &[("big.py", Some(big.as_str())), ("a.py", Some("def f():\n    pass\n"))],
        );

        let f = fixture();
        let mut cfg = config(10, true);
        cfg.indexing.max_file_size = 1024;
        let ingestor = Ingestor::new(f.store.clone(), vcs, cfg);
        let summary = ingestor
            .index_full_history(&f.repo_path, &f.repo_id, &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.files_unsupported, 1);
        assert_eq!(summary.files_parsed, 1);
        assert_eq!(*ingestor.vcs.blob_reads.lock(), vec!["c1:a.py".to_string()]);
        assert!(f.store.read(|g| g.find_element(&f.repo_id, "big.py")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_store_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open_with_pool_size(dir.path().join("graph.db"), 1).unwrap();
        {
            let conn = store.get_conn().unwrap();
            let pages: i64 = conn.query_row("PRAGMA page_count", [], |r| r.get(0)).unwrap();
            let _: i64 = conn
                .query_row(&format!("PRAGMA max_page_count = {}", pages), [], |r| r.get(0))
                .unwrap();
        }

        let mut vcs = MemoryVcs::new();
        for i in 1..=3 {
            let content = format!("class C{}:\n    def m(self):\n        return {}\n", i, "1".repeat(2048));
            vcs.commit(&format!("c{}", i), i * 1_000, &[("a.py", Some(content.as_str()))]);
        }

        let repo_path = PathBuf::from("/work/full");
        let repo_id = Repository::for_path(&repo_path).repo_id;
        let ingestor = Ingestor::new(store, vcs, config(10, true));
        let result = ingestor
            .index_full_history(&repo_path, &repo_id, &IngestOptions::default())
            .await;

        match result {
            Err(e) => assert!(e.is_fatal(), "expected a fatal error, got {}", e),
            Ok(summary) => panic!("run should abort, got {:?}", summary),
        }
    }

    fn pressure_config(memory: MemoryConfig) -> Config {
        let mut cfg = config(1, true);
        cfg.memory = memory;
        cfg
    }

    async fn run_under(memory: MemoryConfig) -> (Fixture, IngestSummary, Vec<MemoryPressure>) {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), foo_history(), pressure_config(memory));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = IngestOptions {
            progress: Some(Box::new(move |p: &IngestProgress| sink.lock().push(p.pressure))),
            cancel: CancelFlag::new(),
        };

        let summary = ingestor.index_full_history(&f.repo_path, &f.repo_id, &options).await.unwrap();
        let pressures = seen.lock().clone();
        (f, summary, pressures)
    }

    #[tokio::test]
    async fn test_elevated_pressure_only_clears_caches() {
        let (f, summary, pressures) = run_under(MemoryConfig {
            warning_mb: 0,
            high_mb: u64::MAX - 1,
            critical_mb: u64::MAX,
        })
        .await;

        assert_eq!(pressures, vec![MemoryPressure::Elevated; 2]);
        assert!(!summary.memory_critical);
        assert!(!summary.is_partial());
        assert_eq!(counts(&f.store).commits, 2);
    }

    #[tokio::test]
    async fn test_high_pressure_compacts_and_keeps_indexing() {
        let (f, summary, pressures) = run_under(MemoryConfig {
            warning_mb: 0,
            high_mb: 1,
            critical_mb: u64::MAX,
        })
        .await;

        assert_eq!(pressures, vec![MemoryPressure::High; 2]);
        assert!(!summary.memory_critical);
        assert_eq!(summary.commits_indexed, 2);

        let foo = element_id(&f.repo_id, ElementType::Class, "a.ts:class:Foo");
        assert_eq!(f.store.read(|g| trace_history_in(g, &foo)).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_critical_pressure_flags_partial_run() {
        let (f, summary, pressures) = run_under(MemoryConfig {
            warning_mb: 0,
            high_mb: 1,
            critical_mb: 2,
        })
        .await;

        assert_eq!(pressures, vec![MemoryPressure::Critical; 2]);
        assert!(summary.memory_critical);
        assert!(summary.is_partial());
        // compaction and reopening between batches lose nothing
        assert_eq!(summary.commits_indexed, 2);
        assert_eq!(counts(&f.store).commits, 2);

        let foo = element_id(&f.repo_id, ElementType::Class, "a.ts:class:Foo");
        let history = f.store.read(|g| trace_history_in(g, &foo)).unwrap();
        let commits: Vec<&str> = history.iter().map(|v| v.commit_hash.as_str()).collect();
        assert_eq!(commits, vec!["c2", "c1"]);
    }
}
