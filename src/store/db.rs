use parking_lot::RwLock;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::schema::{drop_schema, init_schema};
use super::{
    CodeElement, CodeElementVersion, Commit, DecisionRecord, Developer, GraphStats, Repository,
};
use crate::error::{Result, TkgError};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

const DEFAULT_POOL_SIZE: u32 = 8;

/// Pooled handle to the graph database.
///
/// Cloning is cheap and every clone shares the same pool, so the store can be
/// handed to the ingestion pipeline and to query consumers at the same time.
#[derive(Clone)]
pub struct GraphStore {
    pool: Arc<RwLock<ConnectionPool>>,
    db_path: PathBuf,
    pool_size: u32,
}

impl GraphStore {
    /// Create or open a database
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_pool_size(db_path, DEFAULT_POOL_SIZE)
    }

    pub fn open_with_pool_size(db_path: impl AsRef<Path>, pool_size: u32) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        info!("Opening graph store at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TkgError::StoreUnavailable(format!("Failed to create directory {}: {}", parent.display(), e))
                })?;
            }
        }

        let pool = build_pool(&db_path, pool_size)?;

        {
            let conn = pool.get()?;
            init_schema(&conn)
                .map_err(|e| TkgError::StoreUnavailable(format!("Failed to initialize schema: {}", e)))?;
        }

        Ok(Self {
            pool: Arc::new(RwLock::new(pool)),
            db_path,
            pool_size,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        let pool = self.pool.read();
        pool.get().map_err(TkgError::from)
    }

    /// Run read-only work against a pooled connection.
    pub fn read<T>(&self, f: impl FnOnce(&GraphConn<'_>) -> Result<T>) -> Result<T> {
        let conn = self.get_conn()?;
        f(&GraphConn::new(&conn))
    }

    /// Run work inside one immediate transaction; commits only if `f` succeeds.
    pub fn write<T>(&self, f: impl FnOnce(&GraphConn<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&GraphConn::new(&tx))?;
        tx.commit()?;
        Ok(out)
    }

    /// Drop cached statements and ask SQLite to return free heap pages.
    pub fn release_memory(&self) -> Result<()> {
        let conn = self.get_conn()?;
        conn.flush_prepared_statement_cache();
        conn.execute_batch("PRAGMA shrink_memory;")?;
        debug!("Released store memory");
        Ok(())
    }

    /// Checkpoint the WAL, rebuild the file and refresh planner statistics.
    pub fn compact(&self) -> Result<()> {
        info!("Compacting graph store");
        let conn = self.get_conn()?;
        conn.flush_prepared_statement_cache();
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        conn.execute_batch("VACUUM; PRAGMA optimize;")?;
        Ok(())
    }

    /// Replace the connection pool with a fresh one.
    pub fn reopen(&self) -> Result<()> {
        info!("Reopening graph store connections");
        let fresh = build_pool(&self.db_path, self.pool_size)?;
        *self.pool.write() = fresh;
        Ok(())
    }

    /// Drop and recreate every table
    pub fn rebuild(&self) -> Result<()> {
        let conn = self.get_conn()?;
        drop_schema(&conn)?;
        init_schema(&conn)?;
        Ok(())
    }

    pub fn stats(&self) -> Result<GraphStats> {
        self.read(|g| g.stats())
    }
}

fn build_pool(db_path: &Path, pool_size: u32) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    });

    Pool::builder()
        .max_size(pool_size.max(1))
        .build(manager)
        .map_err(|e| TkgError::StoreUnavailable(format!("Failed to create connection pool: {}", e)))
}

/// Typed operations over a single connection or transaction.
///
/// Every write is an upsert keyed by a deterministic identity, so replaying the
/// same input never adds rows.
pub struct GraphConn<'c> {
    conn: &'c Connection,
}

impl<'c> GraphConn<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        self.conn
    }

    // --- repositories -----------------------------------------------------

    pub fn upsert_repository(&self, repo: &Repository) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO repositories (repo_id, path, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(repo_id) DO UPDATE SET path = excluded.path, name = excluded.name",
            )?
            .execute(params![repo.repo_id, repo.path, repo.name])?;
        Ok(())
    }

    pub fn get_repository(&self, repo_id: &str) -> Result<Option<Repository>> {
        let repo = self
            .conn
            .prepare_cached("SELECT repo_id, path, name FROM repositories WHERE repo_id = ?1")?
            .query_row([repo_id], row_to_repository)
            .optional()?;
        Ok(repo)
    }

    pub fn list_repositories(&self) -> Result<Vec<Repository>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT repo_id, path, name FROM repositories ORDER BY name")?;
        let repos = stmt
            .query_map([], row_to_repository)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(repos)
    }

    // --- developers -------------------------------------------------------

    pub fn upsert_developer(&self, dev: &Developer) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO developers (dev_id, name, email) VALUES (?1, ?2, ?3)
                 ON CONFLICT(dev_id) DO NOTHING",
            )?
            .execute(params![dev.dev_id, dev.name, dev.email])?;
        Ok(())
    }

    pub fn get_developer(&self, dev_id: &str) -> Result<Option<Developer>> {
        let dev = self
            .conn
            .prepare_cached("SELECT dev_id, name, email FROM developers WHERE dev_id = ?1")?
            .query_row([dev_id], row_to_developer)
            .optional()?;
        Ok(dev)
    }

    pub fn find_developer_by_email(&self, email: &str) -> Result<Option<Developer>> {
        let dev = self
            .conn
            .prepare_cached("SELECT dev_id, name, email FROM developers WHERE email = ?1")?
            .query_row([email], row_to_developer)
            .optional()?;
        Ok(dev)
    }

    // --- commits ----------------------------------------------------------

    /// Commits are immutable; a second insert of the same hash is ignored.
    pub fn insert_commit(&self, commit: &Commit) -> Result<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO commits (commit_hash, repo_id, message, commit_timestamp, author_dev_id, committer_dev_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(commit_hash) DO NOTHING",
            )?
            .execute(params![
                commit.commit_hash,
                commit.repo_id,
                commit.message,
                commit.timestamp_ms,
                commit.author_dev_id,
                commit.committer_dev_id,
            ])?;
        Ok(inserted > 0)
    }

    pub fn insert_commit_parent(&self, commit_hash: &str, parent_hash: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO commit_parents (commit_hash, parent_hash) VALUES (?1, ?2)
                 ON CONFLICT DO NOTHING",
            )?
            .execute(params![commit_hash, parent_hash])?;
        Ok(())
    }

    pub fn get_commit(&self, commit_hash: &str) -> Result<Option<Commit>> {
        let commit = self
            .conn
            .prepare_cached(&format!("SELECT {} FROM commits c WHERE c.commit_hash = ?1", COMMIT_COLUMNS))?
            .query_row([commit_hash], row_to_commit)
            .optional()?;
        Ok(commit)
    }

    pub fn commit_exists(&self, commit_hash: &str) -> Result<bool> {
        let exists = self
            .conn
            .prepare_cached("SELECT EXISTS(SELECT 1 FROM commits WHERE commit_hash = ?1)")?
            .query_row([commit_hash], |row| row.get(0))?;
        Ok(exists)
    }

    pub fn commit_timestamp(&self, commit_hash: &str) -> Result<Option<i64>> {
        let ts = self
            .conn
            .prepare_cached("SELECT commit_timestamp FROM commits WHERE commit_hash = ?1")?
            .query_row([commit_hash], |row| row.get(0))
            .optional()?;
        Ok(ts)
    }

    pub fn parents_of(&self, commit_hash: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT parent_hash FROM commit_parents WHERE commit_hash = ?1 ORDER BY parent_hash",
        )?;
        let parents = stmt
            .query_map([commit_hash], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(parents)
    }

    pub fn children_of(&self, commit_hash: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT commit_hash FROM commit_parents WHERE parent_hash = ?1 ORDER BY commit_hash",
        )?;
        let children = stmt
            .query_map([commit_hash], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(children)
    }

    /// Commits of a repository, newest first
    pub fn list_commits(&self, repo_id: &str) -> Result<Vec<Commit>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM commits c WHERE c.repo_id = ?1 ORDER BY c.commit_timestamp DESC, c.rowid DESC",
            COMMIT_COLUMNS
        ))?;
        let commits = stmt
            .query_map([repo_id], row_to_commit)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(commits)
    }

    // --- code elements ----------------------------------------------------

    /// Write-if-absent; returns whether a row was created.
    pub fn insert_element(&self, element: &CodeElement) -> Result<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO code_elements (element_id, repo_id, type, stable_identifier)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT DO NOTHING",
            )?
            .execute(params![
                element.element_id,
                element.repo_id,
                element.element_type,
                element.stable_identifier,
            ])?;
        Ok(inserted > 0)
    }

    pub fn get_element(&self, element_id: &str) -> Result<Option<CodeElement>> {
        let element = self
            .conn
            .prepare_cached(
                "SELECT element_id, repo_id, type, stable_identifier FROM code_elements WHERE element_id = ?1",
            )?
            .query_row([element_id], row_to_element)
            .optional()?;
        Ok(element)
    }

    pub fn find_element(&self, repo_id: &str, stable_identifier: &str) -> Result<Option<CodeElement>> {
        let element = self
            .conn
            .prepare_cached(
                "SELECT element_id, repo_id, type, stable_identifier FROM code_elements
                 WHERE repo_id = ?1 AND stable_identifier = ?2",
            )?
            .query_row(params![repo_id, stable_identifier], row_to_element)
            .optional()?;
        Ok(element)
    }

    pub fn list_elements(&self, repo_id: &str) -> Result<Vec<CodeElement>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT element_id, repo_id, type, stable_identifier FROM code_elements
             WHERE repo_id = ?1 ORDER BY stable_identifier",
        )?;
        let elements = stmt
            .query_map([repo_id], row_to_element)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(elements)
    }

    /// Elements that received a version in the given commit
    pub fn elements_for_commit(&self, commit_hash: &str) -> Result<Vec<CodeElement>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT e.element_id, e.repo_id, e.type, e.stable_identifier
             FROM code_elements e
             JOIN code_element_versions v ON v.element_id = e.element_id
             WHERE v.commit_hash = ?1
             ORDER BY e.stable_identifier",
        )?;
        let elements = stmt
            .query_map([commit_hash], row_to_element)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(elements)
    }

    // --- versions ---------------------------------------------------------

    /// Insert unless the version id already exists; an existing row is never
    /// rewritten, so its chain link stays as first recorded.
    pub fn insert_version(&self, version: &CodeElementVersion) -> Result<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO code_element_versions
                    (version_id, element_id, commit_hash, name, start_line, end_line, previous_version_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(version_id) DO NOTHING",
            )?
            .execute(params![
                version.version_id,
                version.element_id,
                version.commit_hash,
                version.name,
                version.start_line,
                version.end_line,
                version.previous_version_id,
            ])?;
        Ok(inserted > 0)
    }

    pub fn get_version(&self, version_id: &str) -> Result<Option<CodeElementVersion>> {
        let version = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM code_element_versions v WHERE v.version_id = ?1",
                VERSION_COLUMNS
            ))?
            .query_row([version_id], row_to_version)
            .optional()?;
        Ok(version)
    }

    /// Version with the greatest commit timestamp strictly below `timestamp_ms`
    pub fn latest_version_before(&self, element_id: &str, timestamp_ms: i64) -> Result<Option<CodeElementVersion>> {
        let version = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM code_element_versions v
                 JOIN commits c ON c.commit_hash = v.commit_hash
                 WHERE v.element_id = ?1 AND c.commit_timestamp < ?2
                 ORDER BY c.commit_timestamp DESC, v.rowid DESC
                 LIMIT 1",
                VERSION_COLUMNS
            ))?
            .query_row(params![element_id, timestamp_ms], row_to_version)
            .optional()?;
        Ok(version)
    }

    pub fn has_version_after(&self, element_id: &str, timestamp_ms: i64) -> Result<bool> {
        let exists = self
            .conn
            .prepare_cached(
                "SELECT EXISTS(
                    SELECT 1 FROM code_element_versions v
                    JOIN commits c ON c.commit_hash = v.commit_hash
                    WHERE v.element_id = ?1 AND c.commit_timestamp > ?2
                 )",
            )?
            .query_row(params![element_id, timestamp_ms], |row| row.get(0))?;
        Ok(exists)
    }

    /// Version whose commit has the maximum timestamp
    pub fn latest_version(&self, element_id: &str) -> Result<Option<CodeElementVersion>> {
        let version = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM code_element_versions v
                 JOIN commits c ON c.commit_hash = v.commit_hash
                 WHERE v.element_id = ?1
                 ORDER BY c.commit_timestamp DESC, v.rowid DESC
                 LIMIT 1",
                VERSION_COLUMNS
            ))?
            .query_row([element_id], row_to_version)
            .optional()?;
        Ok(version)
    }

    pub fn versions_for_element(&self, element_id: &str) -> Result<Vec<CodeElementVersion>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM code_element_versions v
             JOIN commits c ON c.commit_hash = v.commit_hash
             WHERE v.element_id = ?1
             ORDER BY c.commit_timestamp DESC, v.rowid DESC",
            VERSION_COLUMNS
        ))?;
        let versions = stmt
            .query_map([element_id], row_to_version)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    /// Commits that produced a version of the element, newest first
    pub fn commit_history(&self, element_id: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM commits c
             JOIN code_element_versions v ON v.commit_hash = c.commit_hash
             WHERE v.element_id = ?1
             ORDER BY c.commit_timestamp DESC, v.rowid DESC
             LIMIT ?2",
            COMMIT_COLUMNS
        ))?;
        let commits = stmt
            .query_map(params![element_id, limit], row_to_commit)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(commits)
    }

    // --- decisions --------------------------------------------------------

    /// Write-if-absent; an existing record with the same id is left untouched.
    pub fn insert_decision(&self, decision: &DecisionRecord) -> Result<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO decision_records (decision_id, repo_id, title, content, created_at, author_dev_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(decision_id) DO NOTHING",
            )?
            .execute(params![
                decision.decision_id,
                decision.repo_id,
                decision.title,
                decision.content,
                decision.created_at_ms,
                decision.author_dev_id,
            ])?;
        Ok(inserted > 0)
    }

    pub fn get_decision(&self, decision_id: &str) -> Result<Option<DecisionRecord>> {
        let decision = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM decision_records d WHERE d.decision_id = ?1",
                DECISION_COLUMNS
            ))?
            .query_row([decision_id], row_to_decision)
            .optional()?;
        Ok(decision)
    }

    pub fn list_decisions(&self, repo_id: &str) -> Result<Vec<DecisionRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM decision_records d WHERE d.repo_id = ?1 ORDER BY d.created_at, d.title",
            DECISION_COLUMNS
        ))?;
        let decisions = stmt
            .query_map([repo_id], row_to_decision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    pub fn link_decision(&self, decision_id: &str, version_id: &str) -> Result<bool> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT INTO decision_references_code (decision_id, version_id) VALUES (?1, ?2)
                 ON CONFLICT DO NOTHING",
            )?
            .execute(params![decision_id, version_id])?;
        Ok(inserted > 0)
    }

    pub fn decisions_for_version(&self, version_id: &str) -> Result<Vec<DecisionRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM decision_records d
             JOIN decision_references_code r ON r.decision_id = d.decision_id
             WHERE r.version_id = ?1
             ORDER BY d.created_at, d.title",
            DECISION_COLUMNS
        ))?;
        let decisions = stmt
            .query_map([version_id], row_to_decision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    /// Decisions linked to any version of the element
    pub fn decisions_for_element(&self, element_id: &str) -> Result<Vec<DecisionRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT DISTINCT {} FROM decision_records d
             JOIN decision_references_code r ON r.decision_id = d.decision_id
             JOIN code_element_versions v ON v.version_id = r.version_id
             WHERE v.element_id = ?1
             ORDER BY d.created_at, d.title",
            DECISION_COLUMNS
        ))?;
        let decisions = stmt
            .query_map([element_id], row_to_decision)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    /// Ids of elements in the repository with at least one linked decision
    pub fn elements_with_decisions(&self, repo_id: &str) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT v.element_id
             FROM decision_references_code r
             JOIN code_element_versions v ON v.version_id = r.version_id
             JOIN code_elements e ON e.element_id = v.element_id
             WHERE e.repo_id = ?1",
        )?;
        let ids = stmt
            .query_map([repo_id], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<String>, _>>()?;
        Ok(ids)
    }

    // --- change cache -----------------------------------------------------

    pub fn get_file_hash(&self, repo_id: &str, file_path: &str) -> Result<Option<String>> {
        let hash = self
            .conn
            .prepare_cached("SELECT file_hash FROM file_hashes WHERE repo_id = ?1 AND file_path = ?2")?
            .query_row(params![repo_id, file_path], |row| row.get(0))
            .optional()?;
        Ok(hash)
    }

    pub fn set_file_hash(&self, repo_id: &str, file_path: &str, file_hash: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO file_hashes (repo_id, file_path, file_hash) VALUES (?1, ?2, ?3)
                 ON CONFLICT(repo_id, file_path) DO UPDATE SET file_hash = excluded.file_hash",
            )?
            .execute(params![repo_id, file_path, file_hash])?;
        Ok(())
    }

    // --- statistics -------------------------------------------------------

    pub fn stats(&self) -> Result<GraphStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(GraphStats {
            repositories: count("repositories")?,
            developers: count("developers")?,
            commits: count("commits")?,
            elements: count("code_elements")?,
            versions: count("code_element_versions")?,
            decisions: count("decision_records")?,
            decision_links: count("decision_references_code")?,
            file_hashes: count("file_hashes")?,
        })
    }
}

const COMMIT_COLUMNS: &str =
    "c.commit_hash, c.repo_id, c.message, c.commit_timestamp, c.author_dev_id, c.committer_dev_id";

const VERSION_COLUMNS: &str =
    "v.version_id, v.element_id, v.commit_hash, v.name, v.start_line, v.end_line, v.previous_version_id";

const DECISION_COLUMNS: &str =
    "d.decision_id, d.repo_id, d.title, d.content, d.created_at, d.author_dev_id";

fn row_to_repository(row: &Row) -> rusqlite::Result<Repository> {
    Ok(Repository {
        repo_id: row.get(0)?,
        path: row.get(1)?,
        name: row.get(2)?,
    })
}

fn row_to_developer(row: &Row) -> rusqlite::Result<Developer> {
    Ok(Developer {
        dev_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

fn row_to_commit(row: &Row) -> rusqlite::Result<Commit> {
    Ok(Commit {
        commit_hash: row.get(0)?,
        repo_id: row.get(1)?,
        message: row.get(2)?,
        timestamp_ms: row.get(3)?,
        author_dev_id: row.get(4)?,
        committer_dev_id: row.get(5)?,
    })
}

fn row_to_element(row: &Row) -> rusqlite::Result<CodeElement> {
    Ok(CodeElement {
        element_id: row.get(0)?,
        repo_id: row.get(1)?,
        element_type: row.get(2)?,
        stable_identifier: row.get(3)?,
    })
}

fn row_to_version(row: &Row) -> rusqlite::Result<CodeElementVersion> {
    Ok(CodeElementVersion {
        version_id: row.get(0)?,
        element_id: row.get(1)?,
        commit_hash: row.get(2)?,
        name: row.get(3)?,
        start_line: row.get(4)?,
        end_line: row.get(5)?,
        previous_version_id: row.get(6)?,
    })
}

fn row_to_decision(row: &Row) -> rusqlite::Result<DecisionRecord> {
    Ok(DecisionRecord {
        decision_id: row.get(0)?,
        repo_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at_ms: row.get(4)?,
        author_dev_id: row.get(5)?,
    })
}
