// Configuration management for tkgraph

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project configuration file
pub const CONFIG_FILE: &str = ".tkgraph.toml";

/// Languages with a structural parser
pub const SUPPORTED_LANGUAGES: [&str; 5] = ["python", "rust", "go", "java", "typescript"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub languages: LanguagesConfig,
    pub indexing: IndexingConfig,
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesConfig {
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    /// Commits per batch between yield points
    pub batch_size: usize,
    /// Files larger than this (bytes) are never parsed
    pub max_file_size: usize,
    /// Per-call timeout for VCS commands, in seconds
    pub vcs_timeout_secs: u64,
    /// Timeout for listing the full commit log, in seconds
    pub log_timeout_secs: u64,
    /// Disable to force a full re-parse
    pub use_change_cache: bool,
    /// Request a cache clear every N batches
    pub compact_every_batches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file, relative to the project root
    pub database: String,
    pub pool_size: u32,
}

/// Resident-memory thresholds in megabytes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub warning_mb: u64,
    pub high_mb: u64,
    pub critical_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when neither `--debug` nor `--verbose` is given
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            languages: LanguagesConfig::default(),
            indexing: IndexingConfig::default(),
            storage: StorageConfig::default(),
            memory: MemoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "unnamed-project".to_string(),
        }
    }
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            enabled: SUPPORTED_LANGUAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "target/".to_string(),
                "node_modules/".to_string(),
                "*.min.js".to_string(),
                "**/__snapshots__/**".to_string(),
                ".tkgraph.db".to_string(),
            ],
            include: vec![],
            batch_size: 10,
            max_file_size: 1024 * 1024,
            vcs_timeout_secs: 10,
            log_timeout_secs: 300,
            use_change_cache: true,
            compact_every_batches: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: ".tkgraph.db".to_string(),
            pool_size: 8,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            warning_mb: 512,
            high_mb: 1024,
            critical_mb: 1536,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from project directory
    /// Looks for .tkgraph.toml in the project root
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE);

        match Self::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                tracing::debug!("Could not load config from {}: {}", config_path.display(), e);
                tracing::info!("Using default configuration");
                Self::default()
            }
        }
    }

    /// Database location for a project
    pub fn database_path<P: AsRef<Path>>(&self, project_dir: P) -> PathBuf {
        let db = Path::new(&self.storage.database);
        if db.is_absolute() {
            db.to_path_buf()
        } else {
            project_dir.as_ref().join(db)
        }
    }

    /// Check if a file path should be indexed based on include/exclude patterns
    pub fn should_index_file(&self, file_path: &str) -> bool {
        for pattern in &self.indexing.exclude {
            if self.matches_pattern(file_path, pattern) {
                return false;
            }
        }

        if !self.indexing.include.is_empty() {
            return self
                .indexing
                .include
                .iter()
                .any(|pattern| self.matches_pattern(file_path, pattern));
        }

        true
    }

    /// Simple pattern matching (supports glob-style patterns)
    fn matches_pattern(&self, file_path: &str, pattern: &str) -> bool {
        if pattern.ends_with('/') {
            // Directory pattern
            file_path.starts_with(pattern)
                || file_path.contains(&format!("/{}", pattern))
        } else if let Some(suffix) = pattern.strip_prefix("*.") {
            file_path.ends_with(&format!(".{}", suffix))
        } else if let Some(inner) = pattern.strip_prefix("**/").and_then(|p| p.strip_suffix("/**")) {
            // Any directory component, e.g. **/__snapshots__/**
            file_path.starts_with(&format!("{}/", inner))
                || file_path.contains(&format!("/{}/", inner))
        } else {
            file_path == pattern || file_path.ends_with(&format!("/{}", pattern))
        }
    }

    /// Get enabled languages, filtered by what's actually supported
    pub fn get_enabled_languages(&self) -> Vec<String> {
        self.languages
            .enabled
            .iter()
            .filter(|lang| SUPPORTED_LANGUAGES.contains(&lang.as_str()))
            .cloned()
            .collect()
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.name.is_empty() {
            return Err(anyhow::anyhow!("Project name cannot be empty"));
        }

        for lang in &self.languages.enabled {
            if !SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
                return Err(anyhow::anyhow!("Unsupported language: {}", lang));
            }
        }

        if self.indexing.batch_size == 0 {
            return Err(anyhow::anyhow!("Batch size must be greater than 0"));
        }
        if self.indexing.max_file_size == 0 {
            return Err(anyhow::anyhow!("Max file size must be greater than 0"));
        }
        if self.indexing.vcs_timeout_secs == 0 || self.indexing.log_timeout_secs == 0 {
            return Err(anyhow::anyhow!("VCS timeouts must be greater than 0"));
        }
        if self.indexing.compact_every_batches == 0 {
            return Err(anyhow::anyhow!("Compaction interval must be greater than 0"));
        }

        if self.storage.database.is_empty() {
            return Err(anyhow::anyhow!("Database path cannot be empty"));
        }
        if self.storage.pool_size == 0 {
            return Err(anyhow::anyhow!("Pool size must be greater than 0"));
        }

        let m = &self.memory;
        if !(m.warning_mb < m.high_mb && m.high_mb < m.critical_mb) {
            return Err(anyhow::anyhow!(
                "Memory thresholds must increase: warning {} < high {} < critical {}",
                m.warning_mb,
                m.high_mb,
                m.critical_mb
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!("Invalid log level: {}", self.logging.level));
        }
        let valid_formats = ["compact", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!("Invalid log format: {}", self.logging.format));
        }

        Ok(())
    }
}
