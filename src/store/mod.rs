// Graph entities, identities and storage

pub mod db;
pub mod schema;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An indexed workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub repo_id: String,
    pub path: String,
    pub name: String,
}

impl Repository {
    /// Build the repository record for a workspace path.
    ///
    /// The path should already be absolute; the id is derived from it verbatim.
    pub fn for_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy().to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path_str.clone());

        Self {
            repo_id: repository_id(&path_str),
            path: path_str,
            name,
        }
    }
}

/// A commit author, committer or decision author, keyed by email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    pub dev_id: String,
    pub name: String,
    pub email: String,
}

impl Developer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            dev_id: developer_id(&email),
            name: name.into(),
            email,
        }
    }
}

/// An ingested commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub commit_hash: String,
    pub repo_id: String,
    pub message: String,
    pub timestamp_ms: i64,
    pub author_dev_id: String,
    pub committer_dev_id: String,
}

/// Structural kind of a code element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    File,
    Class,
    Function,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::File => "file",
            ElementType::Class => "class",
            ElementType::Function => "function",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(ElementType::File),
            "class" => Some(ElementType::Class),
            "function" => Some(ElementType::Function),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for ElementType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ElementType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        ElementType::parse(s).ok_or_else(|| FromSqlError::Other(format!("Unknown element type: {}", s).into()))
    }
}

/// A file, class or function, independent of any particular version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeElement {
    pub element_id: String,
    pub repo_id: String,
    pub element_type: ElementType,
    pub stable_identifier: String,
}

impl CodeElement {
    pub fn new(repo_id: &str, element_type: ElementType, stable_identifier: &str) -> Self {
        Self {
            element_id: element_id(repo_id, element_type, stable_identifier),
            repo_id: repo_id.to_string(),
            element_type,
            stable_identifier: stable_identifier.to_string(),
        }
    }

    /// Path of the file this element lives in.
    pub fn file_path(&self) -> &str {
        file_of(&self.stable_identifier)
    }
}

/// The state of one element as of one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeElementVersion {
    pub version_id: String,
    pub element_id: String,
    pub commit_hash: String,
    pub name: String,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub previous_version_id: Option<String>,
}

/// A human decision that can be attached to code versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub repo_id: String,
    pub title: String,
    pub content: String,
    pub created_at_ms: i64,
    pub author_dev_id: Option<String>,
}

/// Row counts across the graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub repositories: usize,
    pub developers: usize,
    pub commits: usize,
    pub elements: usize,
    pub versions: usize,
    pub decisions: usize,
    pub decision_links: usize,
    pub file_hashes: usize,
}

fn hash_parts(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        // separator keeps ("ab","c") and ("a","bc") apart
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

pub fn repository_id(absolute_path: &str) -> String {
    hash_parts(&["repo", absolute_path])
}

pub fn developer_id(email: &str) -> String {
    hash_parts(&["dev", email])
}

pub fn element_id(repo_id: &str, element_type: ElementType, stable_identifier: &str) -> String {
    hash_parts(&["element", repo_id, element_type.as_str(), stable_identifier])
}

pub fn version_id(element_id: &str, commit_hash: &str) -> String {
    hash_parts(&["version", element_id, commit_hash])
}

pub fn decision_id(repo_id: &str, title: &str) -> String {
    hash_parts(&["decision", repo_id, title])
}

/// Content hash used by the change cache
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

const SEGMENT_MARKERS: [&str; 3] = [":class:", ":function:", ":method:"];

/// File path prefix of a stable identifier.
pub fn file_of(stable_identifier: &str) -> &str {
    let cut = SEGMENT_MARKERS
        .iter()
        .filter_map(|marker| stable_identifier.find(marker))
        .min();

    match cut {
        Some(idx) => &stable_identifier[..idx],
        None => stable_identifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_deterministic() {
        let a = element_id("r1", ElementType::Class, "a.ts:class:Foo");
        let b = element_id("r1", ElementType::Class, "a.ts:class:Foo");
        assert_eq!(a, b);
        assert_ne!(a, element_id("r2", ElementType::Class, "a.ts:class:Foo"));
        assert_ne!(a, element_id("r1", ElementType::Function, "a.ts:class:Foo"));
        assert_eq!(version_id(&a, "c1"), version_id(&a, "c1"));
        assert_ne!(version_id(&a, "c1"), version_id(&a, "c2"));
    }

    #[test]
    fn test_hash_parts_separates_fields() {
        assert_ne!(hash_parts(&["ab", "c"]), hash_parts(&["a", "bc"]));
    }

    #[test]
    fn test_developer_keyed_by_email() {
        let a = Developer::new("Ada", "ada@example.com");
        let b = Developer::new("Ada L.", "ada@example.com");
        assert_eq!(a.dev_id, b.dev_id);
    }

    #[test]
    fn test_file_of() {
        assert_eq!(file_of("src/a.ts"), "src/a.ts");
        assert_eq!(file_of("src/a.ts:class:Foo"), "src/a.ts");
        assert_eq!(file_of("src/a.ts:class:Foo:method:bar"), "src/a.ts");
        assert_eq!(file_of("lib/util.py:function:load"), "lib/util.py");
    }

    #[test]
    fn test_repository_for_path() {
        let repo = Repository::for_path(Path::new("/work/projects/demo"));
        assert_eq!(repo.name, "demo");
        assert_eq!(repo.repo_id, repository_id("/work/projects/demo"));
    }

    #[test]
    fn test_element_type_round_trip() {
        for ty in [ElementType::File, ElementType::Class, ElementType::Function] {
            assert_eq!(ElementType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(ElementType::parse("module"), None);
    }
}
