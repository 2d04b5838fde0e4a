// Query execution engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::trace_history_in;
use crate::error::{Result, TkgError};
use crate::store::db::GraphStore;
use crate::store::{
    CodeElement, CodeElementVersion, Commit, DecisionRecord, ElementType, GraphStats,
};

/// One element of the repository graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub element_id: String,
    pub element_type: ElementType,
    pub stable_identifier: String,
    pub has_decisions: bool,
}

/// Containment edge from a file to a class or function declared in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub parent_id: String,
    pub child_id: String,
    pub kind: String,
}

/// Everything a diagram renderer needs for one repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

pub const CONTAINS_EDGE: &str = "contains";

/// Read-only queries over the graph store
#[derive(Clone)]
pub struct QueryEngine {
    store: GraphStore,
}

impl QueryEngine {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    pub fn latest_version(&self, element_id: &str) -> Result<Option<CodeElementVersion>> {
        self.store.read(|g| g.latest_version(element_id))
    }

    /// Commits that touched the element, newest first
    pub fn commit_history(&self, element_id: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
        self.store.read(|g| g.commit_history(element_id, limit))
    }

    pub fn trace_history(&self, element_id: &str) -> Result<Vec<CodeElementVersion>> {
        self.store.read(|g| trace_history_in(g, element_id))
    }

    pub fn decisions_for_version(&self, version_id: &str) -> Result<Vec<DecisionRecord>> {
        self.store.read(|g| g.decisions_for_version(version_id))
    }

    pub fn decisions_for_element(&self, element_id: &str) -> Result<Vec<DecisionRecord>> {
        self.store.read(|g| g.decisions_for_element(element_id))
    }

    pub fn elements_for_commit(&self, commit_hash: &str) -> Result<Vec<CodeElement>> {
        self.store.read(|g| g.elements_for_commit(commit_hash))
    }

    pub fn commit(&self, commit_hash: &str) -> Result<Option<Commit>> {
        self.store.read(|g| g.get_commit(commit_hash))
    }

    pub fn find_element(&self, repo_id: &str, stable_identifier: &str) -> Result<Option<CodeElement>> {
        self.store.read(|g| g.find_element(repo_id, stable_identifier))
    }

    /// Like [`find_element`](Self::find_element) but a missing element is an error
    pub fn require_element(&self, repo_id: &str, stable_identifier: &str) -> Result<CodeElement> {
        self.find_element(repo_id, stable_identifier)?
            .ok_or_else(|| TkgError::ElementNotFound(stable_identifier.to_string()))
    }

    pub fn list_commits(&self, repo_id: &str) -> Result<Vec<Commit>> {
        self.store.read(|g| g.list_commits(repo_id))
    }

    pub fn list_decisions(&self, repo_id: &str) -> Result<Vec<DecisionRecord>> {
        self.store.read(|g| g.list_decisions(repo_id))
    }

    pub fn parents_of(&self, commit_hash: &str) -> Result<Vec<String>> {
        self.store.read(|g| g.parents_of(commit_hash))
    }

    pub fn children_of(&self, commit_hash: &str) -> Result<Vec<String>> {
        self.store.read(|g| g.children_of(commit_hash))
    }

    pub fn stats(&self) -> Result<GraphStats> {
        self.store.stats()
    }

    /// All elements of the repository with `contains` edges from each file to
    /// the classes and functions whose identifiers live under it.
    pub fn repository_graph(&self, repo_id: &str) -> Result<RepositoryGraph> {
        let (elements, decided) = self
            .store
            .read(|g| Ok((g.list_elements(repo_id)?, g.elements_with_decisions(repo_id)?)))?;

        let files: HashMap<&str, &str> = elements
            .iter()
            .filter(|e| e.element_type == ElementType::File)
            .map(|e| (e.stable_identifier.as_str(), e.element_id.as_str()))
            .collect();

        let edges = elements
            .iter()
            .filter(|e| e.element_type != ElementType::File)
            .filter_map(|e| {
                files.get(e.file_path()).map(|file_id| GraphEdge {
                    parent_id: file_id.to_string(),
                    child_id: e.element_id.clone(),
                    kind: CONTAINS_EDGE.to_string(),
                })
            })
            .collect();

        let nodes = elements
            .iter()
            .map(|e| GraphNode {
                element_id: e.element_id.clone(),
                element_type: e.element_type,
                stable_identifier: e.stable_identifier.clone(),
                has_decisions: decided.contains(&e.element_id),
            })
            .collect();

        Ok(RepositoryGraph { nodes, edges })
    }
}
