// Identity assignment and per-element version chaining

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{Result, TkgError};
use crate::parser::ElementDescriptor;
use crate::store::db::{GraphConn, GraphStore};
use crate::store::{version_id, CodeElement, CodeElementVersion};

/// Stateless coordinator over the graph store.
///
/// Every operation is a pure function of its input plus what is already
/// committed, so resumed or repeated runs converge on the same rows.
pub struct VersioningEngine<'s> {
    store: &'s GraphStore,
}

impl<'s> VersioningEngine<'s> {
    pub fn new(store: &'s GraphStore) -> Self {
        Self { store }
    }

    /// Write the element if absent and return its deterministic id
    pub fn upsert_element(&self, repo_id: &str, descriptor: &ElementDescriptor) -> Result<String> {
        self.store.write(|g| upsert_element_in(g, repo_id, descriptor))
    }

    /// Record the element's state at `commit_hash`, chained to the latest
    /// earlier version. The commit must already be stored.
    pub fn record_version(
        &self,
        element_id: &str,
        commit_hash: &str,
        name: &str,
        start_line: Option<u32>,
        end_line: Option<u32>,
    ) -> Result<String> {
        self.store
            .write(|g| record_version_in(g, element_id, commit_hash, name, start_line, end_line))
    }

    /// Versions of the element, newest first
    pub fn trace_history(&self, element_id: &str) -> Result<Vec<CodeElementVersion>> {
        self.store.read(|g| trace_history_in(g, element_id))
    }
}

pub fn upsert_element_in(g: &GraphConn<'_>, repo_id: &str, descriptor: &ElementDescriptor) -> Result<String> {
    let element = CodeElement::new(repo_id, descriptor.element_type, &descriptor.stable_identifier);
    if g.insert_element(&element)? {
        debug!("New element {}", element.stable_identifier);
    }
    Ok(element.element_id)
}

pub fn record_version_in(
    g: &GraphConn<'_>,
    element_id: &str,
    commit_hash: &str,
    name: &str,
    start_line: Option<u32>,
    end_line: Option<u32>,
) -> Result<String> {
    write_version_in(g, element_id, commit_hash, name, start_line, end_line).map(|(id, _)| id)
}

/// Same as [`record_version_in`], also reporting whether a row was added.
pub(crate) fn write_version_in(
    g: &GraphConn<'_>,
    element_id: &str,
    commit_hash: &str,
    name: &str,
    start_line: Option<u32>,
    end_line: Option<u32>,
) -> Result<(String, bool)> {
    let version_id = version_id(element_id, commit_hash);

    // Replays keep the first-recorded chain link
    if g.get_version(&version_id)?.is_some() {
        return Ok((version_id, false));
    }

    let timestamp = g
        .commit_timestamp(commit_hash)?
        .ok_or_else(|| TkgError::InvalidData(format!("Commit {} is not stored", commit_hash)))?;

    // A newer version would have been chained past this one
    if g.has_version_after(element_id, timestamp)? {
        return Err(TkgError::OutOfOrderVersion {
            element_id: element_id.to_string(),
            commit_hash: commit_hash.to_string(),
        });
    }

    let previous_version_id = g
        .latest_version_before(element_id, timestamp)?
        .map(|v| v.version_id);

    let inserted = g.insert_version(&CodeElementVersion {
        version_id: version_id.clone(),
        element_id: element_id.to_string(),
        commit_hash: commit_hash.to_string(),
        name: name.to_string(),
        start_line,
        end_line,
        previous_version_id,
    })?;

    Ok((version_id, inserted))
}

/// Walk `previous_version_id` links from the latest version.
///
/// Stops early, without failing, on a dangling link, a revisited version or a
/// timestamp that does not strictly decrease.
pub fn trace_history_in(g: &GraphConn<'_>, element_id: &str) -> Result<Vec<CodeElementVersion>> {
    let Some(latest) = g.latest_version(element_id)? else {
        return Ok(Vec::new());
    };

    let mut history = Vec::new();
    let mut visited = HashSet::new();
    let mut last_timestamp = g.commit_timestamp(&latest.commit_hash)?;
    let mut current = latest;

    loop {
        visited.insert(current.version_id.clone());
        let next_id = current.previous_version_id.clone();
        history.push(current);

        let Some(next_id) = next_id else { break };

        if visited.contains(&next_id) {
            warn!("Version chain of {} loops at {}", element_id, next_id);
            break;
        }

        let Some(next) = g.get_version(&next_id)? else {
            warn!("Version chain of {} has a dangling link to {}", element_id, next_id);
            break;
        };

        let timestamp = g.commit_timestamp(&next.commit_hash)?;
        match (timestamp, last_timestamp) {
            (Some(ts), Some(last)) if ts < last => last_timestamp = Some(ts),
            _ => {
                warn!("Version chain of {} is not time-ordered at {}", element_id, next_id);
                break;
            }
        }

        current = next;
    }

    Ok(history)
}
