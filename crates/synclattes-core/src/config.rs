use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Root application configuration, loaded from `~/.config/synclattes/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub dedup: DedupConfig,
    pub election: ElectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Thresholds of the duplicate detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Character n-gram size of the title index.
    pub title_ngram: usize,
    /// Minimum Jaccard similarity between two titles.
    pub title_threshold: f64,
    /// Maximum author-set distance between two duplicates.
    pub author_threshold: f64,
    /// Require the same publication year.
    pub same_year: bool,
    pub batch_size: usize,
}

/// Points used to elect the main revision of a duplicate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    pub role_scores: BTreeMap<String, i64>,
    pub doi_score: i64,
    pub per_author_with_authority: i64,
    pub relevance_flag_score: i64,
    pub per_metadata_key: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for DatabaseConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("synclattes");

        Self {
            path: data_dir.join("synclattes.db").to_string_lossy().to_string(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_ngram: 5,
            title_threshold: 0.7,
            author_threshold: 0.9,
            same_year: true,
            batch_size: 1024,
        }
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        let role_scores = [
            ("Professor Ensino Superior", 1000),
            ("Técnico-Administrativo", 1000),
            ("Aposentado", 1000),
            ("Procurador", 1000),
            ("Professor Ensino Superior Substituto/Temporário/Visitante", 900),
            ("Pesquisador - Pós-Doutorado", 900),
            ("Aluno de Pós-Graduação - Doutorado", 200),
            ("Aluno de Pós-Graduação - Mestrado", 100),
        ]
        .into_iter()
        .map(|(role, score)| (role.to_string(), score))
        .collect();

        Self {
            role_scores,
            doi_score: 500,
            per_author_with_authority: 50,
            relevance_flag_score: 10,
            per_metadata_key: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/synclattes/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SYNCLATTES_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("synclattes")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let dedup = &self.dedup;
        if dedup.title_ngram == 0 {
            return Err(SyncError::ConfigError("dedup.title_ngram must be at least 1".into()));
        }
        if !(dedup.title_threshold > 0.0 && dedup.title_threshold <= 1.0) {
            return Err(SyncError::ConfigError(
                "dedup.title_threshold must be in (0, 1]".into(),
            ));
        }
        if dedup.author_threshold < 0.0 {
            return Err(SyncError::ConfigError(
                "dedup.author_threshold must not be negative".into(),
            ));
        }
        if dedup.batch_size == 0 {
            return Err(SyncError::ConfigError("dedup.batch_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database.path)
    }
}
