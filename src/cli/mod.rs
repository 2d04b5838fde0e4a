// CLI command implementations

pub mod decide;
pub mod graph;
pub mod history;
pub mod index;
pub mod languages;
pub mod stats;

use anyhow::{Context, Result};
use std::path::PathBuf;

use tkgraph::config::Config;
use tkgraph::store::Repository;
use tkgraph::GraphStore;

/// An opened project: canonical root, its graph store and repository record
pub struct Workspace {
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub store: GraphStore,
    pub repo: Repository,
}

impl Workspace {
    pub fn open(project: &str, config: &Config) -> Result<Self> {
        let root = std::fs::canonicalize(project)
            .with_context(|| format!("Project directory not found: {}", project))?;
        let db_path = config.database_path(&root);
        let store = GraphStore::open_with_pool_size(&db_path, config.storage.pool_size)
            .with_context(|| format!("Failed to open graph store at {}", db_path.display()))?;
        let repo = Repository::for_path(&root);

        Ok(Self {
            root,
            db_path,
            store,
            repo,
        })
    }
}

fn config_label(config: &Config) -> &'static str {
    if config.project.name != "unnamed-project" {
        "loaded"
    } else {
        "default"
    }
}
