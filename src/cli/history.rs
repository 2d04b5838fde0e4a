use anyhow::Result;
use serde_json::json;

use tkgraph::config::Config;
use tkgraph::query::QueryEngine;

use super::Workspace;

pub fn show_history(project: &str, config: &Config, element: &str, limit: Option<usize>, format: &str) -> Result<()> {
    let workspace = Workspace::open(project, config)?;
    let query = QueryEngine::new(workspace.store.clone());

    let found = query.require_element(&workspace.repo.repo_id, element)?;
    let versions = query.trace_history(&found.element_id)?;
    let commits = query.commit_history(&found.element_id, limit)?;
    let decisions = query.decisions_for_element(&found.element_id)?;

    let shown = limit.unwrap_or(versions.len()).min(versions.len());

    match format {
        "json" => {
            let output = json!({
                "element": found,
                "versions": &versions[..shown],
                "commits": commits,
                "decisions": decisions,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("{} ({})", found.stable_identifier, found.element_type);
            println!("Versions: {}", versions.len());

            for version in versions.iter().take(shown) {
                let Some(commit) = query.commit(&version.commit_hash)? else {
                    continue;
                };
                let when = chrono::DateTime::from_timestamp_millis(commit.timestamp_ms)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let lines = match (version.start_line, version.end_line) {
                    (Some(start), Some(end)) => format!("lines {}-{}", start, end),
                    _ => String::new(),
                };
                let subject = commit.message.lines().next().unwrap_or("");
                println!("  {} {} {} {}", &commit.commit_hash[..commit.commit_hash.len().min(10)], when, lines, subject);
            }

            if !decisions.is_empty() {
                println!("\nDecisions:");
                for decision in decisions {
                    println!("  - {}", decision.title);
                }
            }
        }
    }

    Ok(())
}
