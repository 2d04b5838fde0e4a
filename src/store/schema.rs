use rusqlite::{Connection, Result};
use tracing::{debug, info};

/// SQLite schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    info!("Initializing graph schema v{}", SCHEMA_VERSION);

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    debug!("Current schema version: {}", current_version);

    if current_version < SCHEMA_VERSION {
        info!("Upgrading schema from v{} to v{}", current_version, SCHEMA_VERSION);
        apply_migrations(conn, current_version)?;
    }

    Ok(())
}

/// Apply migrations from current version to latest
fn apply_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration v{}", version);
        if version == 1 {
            create_v1_schema(conn)?;
        }

        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    }

    Ok(())
}

/// Create v1 schema (initial schema)
fn create_v1_schema(conn: &Connection) -> Result<()> {
    info!("Creating v1 schema tables");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS repositories (
            repo_id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS developers (
            dev_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS commits (
            commit_hash TEXT PRIMARY KEY,
            repo_id TEXT NOT NULL REFERENCES repositories(repo_id),
            message TEXT NOT NULL,
            commit_timestamp INTEGER NOT NULL,
            author_dev_id TEXT NOT NULL REFERENCES developers(dev_id),
            committer_dev_id TEXT NOT NULL REFERENCES developers(dev_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_commits_repo_timestamp
         ON commits(repo_id, commit_timestamp)",
        [],
    )?;

    // Parents may never be ingested (merges, partial ranges), so only the
    // child side carries a foreign key.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS commit_parents (
            commit_hash TEXT NOT NULL REFERENCES commits(commit_hash),
            parent_hash TEXT NOT NULL,
            PRIMARY KEY (commit_hash, parent_hash)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_commit_parents_parent
         ON commit_parents(parent_hash)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS code_elements (
            element_id TEXT PRIMARY KEY,
            repo_id TEXT NOT NULL REFERENCES repositories(repo_id),
            type TEXT NOT NULL CHECK (type IN ('file', 'class', 'function')),
            stable_identifier TEXT NOT NULL,
            UNIQUE (repo_id, stable_identifier)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS code_element_versions (
            version_id TEXT PRIMARY KEY,
            element_id TEXT NOT NULL REFERENCES code_elements(element_id),
            commit_hash TEXT NOT NULL REFERENCES commits(commit_hash),
            name TEXT NOT NULL,
            start_line INTEGER,
            end_line INTEGER,
            previous_version_id TEXT REFERENCES code_element_versions(version_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_versions_element
         ON code_element_versions(element_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_versions_commit
         ON code_element_versions(commit_hash)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS decision_records (
            decision_id TEXT PRIMARY KEY,
            repo_id TEXT NOT NULL REFERENCES repositories(repo_id),
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            author_dev_id TEXT REFERENCES developers(dev_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_decisions_repo
         ON decision_records(repo_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS decision_references_code (
            decision_id TEXT NOT NULL REFERENCES decision_records(decision_id),
            version_id TEXT NOT NULL REFERENCES code_element_versions(version_id),
            PRIMARY KEY (decision_id, version_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_decision_refs_version
         ON decision_references_code(version_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS file_hashes (
            repo_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_hash TEXT NOT NULL,
            PRIMARY KEY (repo_id, file_path)
        )",
        [],
    )?;

    info!("v1 schema created successfully");

    Ok(())
}

/// Drop all tables (for rebuilding)
pub fn drop_schema(conn: &Connection) -> Result<()> {
    info!("Dropping all schema tables");

    conn.execute_batch(
        "DROP TABLE IF EXISTS decision_references_code;
         DROP TABLE IF EXISTS decision_records;
         DROP TABLE IF EXISTS code_element_versions;
         DROP TABLE IF EXISTS code_elements;
         DROP TABLE IF EXISTS commit_parents;
         DROP TABLE IF EXISTS commits;
         DROP TABLE IF EXISTS developers;
         DROP TABLE IF EXISTS repositories;
         DROP TABLE IF EXISTS file_hashes;
         DROP TABLE IF EXISTS schema_version;",
    )?;

    Ok(())
}
