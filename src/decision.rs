// Decision records and their links to code versions

use tracing::info;

use crate::error::{Result, TkgError};
use crate::store::db::GraphStore;
use crate::store::{decision_id, DecisionRecord, Developer};

pub struct DecisionLinker<'s> {
    store: &'s GraphStore,
}

impl<'s> DecisionLinker<'s> {
    pub fn new(store: &'s GraphStore) -> Self {
        Self { store }
    }

    /// Create a decision, or return the existing one with the same title in
    /// the same repository. The author, when given, is stored as a developer.
    pub fn create_decision_record(
        &self,
        title: &str,
        content: &str,
        repo_id: &str,
        author: Option<&Developer>,
    ) -> Result<DecisionRecord> {
        let id = decision_id(repo_id, title);

        self.store.write(|g| {
            if let Some(existing) = g.get_decision(&id)? {
                return Ok(existing);
            }

            if let Some(dev) = author {
                g.upsert_developer(dev)?;
            }

            let record = DecisionRecord {
                decision_id: id.clone(),
                repo_id: repo_id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                created_at_ms: chrono::Utc::now().timestamp_millis(),
                author_dev_id: author.map(|d| d.dev_id.clone()),
            };
            g.insert_decision(&record)?;
            info!("Recorded decision '{}'", title);
            Ok(record)
        })
    }

    /// Attach the decision to the element's latest version and return that
    /// version's id. Earlier versions are never linked.
    pub fn link_decision_to_element(&self, decision_id: &str, element_id: &str) -> Result<String> {
        self.store.write(|g| {
            if g.get_decision(decision_id)?.is_none() {
                return Err(TkgError::DecisionNotFound(decision_id.to_string()));
            }

            let version = g
                .latest_version(element_id)?
                .ok_or_else(|| TkgError::NoVersionFound(element_id.to_string()))?;

            g.link_decision(decision_id, &version.version_id)?;
            Ok(version.version_id)
        })
    }
}
