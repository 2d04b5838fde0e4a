use anyhow::{Context, Result};

use tkgraph::config::Config;
use tkgraph::decision::DecisionLinker;
use tkgraph::query::QueryEngine;
use tkgraph::store::{decision_id, Developer};

use super::Workspace;

/// Build the decision author from CLI flags; the name defaults to the email
pub fn author_from_args(name: Option<String>, email: Option<String>) -> Option<Developer> {
    email.map(|email| {
        let name = name.unwrap_or_else(|| email.clone());
        Developer::new(name, email)
    })
}

pub fn record_decision(
    project: &str,
    config: &Config,
    title: &str,
    content: &str,
    element: Option<&str>,
    author: Option<Developer>,
) -> Result<()> {
    let workspace = Workspace::open(project, config)?;
    workspace
        .store
        .write(|g| g.upsert_repository(&workspace.repo))
        .context("Failed to register repository")?;

    let linker = DecisionLinker::new(&workspace.store);
    let decision = linker.create_decision_record(title, content, &workspace.repo.repo_id, author.as_ref())?;

    println!("Decision: {}", decision.title);
    println!("  Id: {}", decision.decision_id);

    if let Some(sid) = element {
        let version = link(&workspace, &linker, &decision.decision_id, sid)?;
        println!("  Linked to {} (version {})", sid, version);
    }

    Ok(())
}

pub fn link_decision(project: &str, config: &Config, decision: &str, element: &str) -> Result<()> {
    let workspace = Workspace::open(project, config)?;
    let linker = DecisionLinker::new(&workspace.store);

    // accept either the id or the title
    let by_title = decision_id(&workspace.repo.repo_id, decision);
    let known = workspace.store.read(|g| g.get_decision(decision))?.is_some();
    let id = if known { decision.to_string() } else { by_title };

    let version = link(&workspace, &linker, &id, element)?;
    println!("Linked decision {} to {} (version {})", id, element, version);
    Ok(())
}

fn link(workspace: &Workspace, linker: &DecisionLinker<'_>, decision_id: &str, element: &str) -> Result<String> {
    let query = QueryEngine::new(workspace.store.clone());
    let found = query.require_element(&workspace.repo.repo_id, element)?;
    let version = linker
        .link_decision_to_element(decision_id, &found.element_id)
        .with_context(|| format!("Failed to link decision to {}", element))?;
    Ok(version)
}
