use anyhow::Result;
use std::collections::HashMap;

use tkgraph::config::Config;
use tkgraph::query::QueryEngine;

use super::Workspace;

pub fn print_graph(project: &str, config: &Config, format: &str) -> Result<()> {
    let workspace = Workspace::open(project, config)?;
    let graph = QueryEngine::new(workspace.store.clone()).repository_graph(&workspace.repo.repo_id)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    let names: HashMap<&str, &str> = graph
        .nodes
        .iter()
        .map(|n| (n.element_id.as_str(), n.stable_identifier.as_str()))
        .collect();

    println!("{} elements, {} edges", graph.nodes.len(), graph.edges.len());
    for node in &graph.nodes {
        let marker = if node.has_decisions { " *" } else { "" };
        println!("  [{}] {}{}", node.element_type, node.stable_identifier, marker);
    }
    for edge in &graph.edges {
        let parent = names.get(edge.parent_id.as_str()).copied().unwrap_or("?");
        let child = names.get(edge.child_id.as_str()).copied().unwrap_or("?");
        println!("  {} --{}--> {}", parent, edge.kind, child);
    }

    Ok(())
}
