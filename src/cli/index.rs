use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::info;

use tkgraph::config::Config;
use tkgraph::history::GitCli;
use tkgraph::ingest::{IngestOptions, IngestProgress, Ingestor};

use super::{config_label, Workspace};

pub async fn index_history(project: &str, mut config: Config, no_cache: bool, rebuild: bool) -> Result<()> {
    if no_cache {
        config.indexing.use_change_cache = false;
    }

    println!("tkgraph Indexer v0.1.0");
    println!("Project: {}", project);
    println!("Config: {}", config_label(&config));
    println!("Languages: {}", config.get_enabled_languages().join(", "));
    println!("Change cache: {}", config.indexing.use_change_cache);
    println!("Rebuild: {}", rebuild);

    let workspace = Workspace::open(project, &config)?;
    println!("Database: {}", workspace.db_path.display());

    if rebuild {
        info!("Rebuilding graph");
        workspace.store.rebuild().context("Failed to rebuild graph")?;
    }

    let vcs = GitCli::from_config(&config.indexing);
    let ingestor = Ingestor::new(workspace.store.clone(), vcs, config);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} commits {msg}")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );
    let sink = bar.clone();
    let options = IngestOptions {
        progress: Some(Box::new(move |p: &IngestProgress| {
            sink.set_length(p.total_commits as u64);
            sink.set_position(p.commits_done as u64);
            sink.set_message(format!("(batch {}/{}, memory {})", p.batch, p.total_batches, p.pressure));
        })),
        ..IngestOptions::default()
    };

    println!("\nIndexing commit history...");
    let start = Instant::now();
    let summary = ingestor
        .index_full_history(&workspace.root, &workspace.repo.repo_id, &options)
        .await
        .context("Indexing failed")?;
    bar.finish_and_clear();

    println!("\n✅ Indexing {}", if summary.is_partial() { "partially completed" } else { "complete" });
    println!("  Commits indexed: {}", summary.commits_indexed);
    println!("  Already indexed: {}", summary.commits_already_indexed);
    println!("  Failed commits: {}", summary.commits_failed);
    println!("  Files parsed: {}", summary.files_parsed);
    println!("  Files unchanged: {}", summary.files_unchanged);
    println!("  Files skipped: {}", summary.files_unsupported);
    println!("  Versions written: {}", summary.versions_written);
    println!("  Time: {:.2}s", start.elapsed().as_secs_f64());

    if summary.commits_failed > 0 {
        println!("⚠️  Some commits could not be read; rerun with --debug for details");
    }
    if summary.memory_critical {
        println!("⚠️  Memory usage reached the critical threshold during indexing");
    }

    Ok(())
}

pub async fn index_commit(project: &str, config: Config, hash: &str) -> Result<()> {
    let workspace = Workspace::open(project, &config)?;
    let vcs = GitCli::from_config(&config.indexing);
    let ingestor = Ingestor::new(workspace.store.clone(), vcs, config);

    let outcome = ingestor
        .process_commit(&workspace.root, &workspace.repo.repo_id, hash)
        .await
        .with_context(|| format!("Failed to index commit {}", hash))?;

    println!("Commit {}", hash);
    println!("  New: {}", outcome.newly_indexed);
    println!("  Files parsed: {}", outcome.files_parsed);
    println!("  Files unchanged: {}", outcome.files_unchanged);
    println!("  Files deleted: {}", outcome.files_deleted);
    println!("  Versions written: {}", outcome.versions_written);

    Ok(())
}
