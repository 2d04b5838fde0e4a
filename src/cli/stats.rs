use anyhow::{Context, Result};
use std::path::Path;

use tkgraph::config::Config;
use tkgraph::query::QueryEngine;

use super::{config_label, Workspace};

pub fn show_stats(project: &str, config: &Config, detailed: bool) -> Result<()> {
    println!("tkgraph Statistics v0.1.0");
    println!("Project: {}", project);
    println!("Config: {}", config_label(config));

    let workspace = Workspace::open(project, config)?;
    let query = QueryEngine::new(workspace.store.clone());
    let stats = query.stats()?;

    println!("\n📊 Graph Statistics:");
    println!("  Repositories: {}", stats.repositories);
    println!("  Developers: {}", stats.developers);
    println!("  Commits: {}", stats.commits);
    println!("  Code elements: {}", stats.elements);
    println!("  Element versions: {}", stats.versions);
    println!("  Decisions: {}", stats.decisions);
    println!("  Decision links: {}", stats.decision_links);
    println!("  Cached file hashes: {}", stats.file_hashes);
    println!("  Database size: {:.2} MB", db_size_mb(&workspace.db_path)?);

    if detailed {
        let repo_id = &workspace.repo.repo_id;

        let commits = query.list_commits(repo_id)?;
        if !commits.is_empty() {
            println!("\n📈 Recent commits:");
            for commit in commits.iter().take(10) {
                let touched = query.elements_for_commit(&commit.commit_hash)?.len();
                let subject = commit.message.lines().next().unwrap_or("");
                println!("  {} {} ({} elements)", short(&commit.commit_hash), subject, touched);
            }
        }

        let decisions = query.list_decisions(repo_id)?;
        if !decisions.is_empty() {
            println!("\n📝 Decisions:");
            for decision in decisions {
                println!("  {} {}", short(&decision.decision_id), decision.title);
            }
        }
    }

    Ok(())
}

pub fn compact(project: &str, config: &Config) -> Result<()> {
    let workspace = Workspace::open(project, config)?;
    let before = db_size_mb(&workspace.db_path)?;
    workspace.store.compact().context("Compaction failed")?;
    let after = db_size_mb(&workspace.db_path)?;

    println!("Compacted {}: {:.2} MB -> {:.2} MB", workspace.db_path.display(), before, after);
    Ok(())
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(10)]
}

fn db_size_mb(db_path: &Path) -> Result<f64> {
    let metadata = std::fs::metadata(db_path)?;
    Ok(metadata.len() as f64 / (1024.0 * 1024.0))
}
