//! Temporal knowledge graph of a repository: code elements, their versions
//! commit by commit, the developers behind them and the decisions attached.

pub mod cache;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod history;
pub mod ingest;
pub mod memory;
pub mod parser;
pub mod query;
pub mod store;

pub use error::{Result, TkgError};
pub use store::db::GraphStore;
