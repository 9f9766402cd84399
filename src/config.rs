//! Configuration management for the skill fit matcher

use crate::error::{Result, SkillFitError};
use serde::{Deserialize, Serialize};
use log::info;
use std::path::{Path, PathBuf};

/// Ontology shipped with the binary, installed on first run
const BUNDLED_ONTOLOGY: &str = include_str!("../data/skill_ontology.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub normalizer: NormalizerConfig,
    pub scoring: ScoringConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// HuggingFace repo id or local folder, used by the Model2Vec backend
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingBackend {
    Hashing,
    Model2Vec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub max_connections: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub ontology_path: PathBuf,
    pub similarity_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weight_semantic: f32,
    pub weight_graph: f32,
    pub weight_experience: f32,
    /// Minimum alignment similarity for a job skill to count as matched
    pub match_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub detailed: bool,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl Default for Config {
    fn default() -> Self {
        let ontology_path = Self::default_ontology_path();

        Self {
            embedding: EmbeddingConfig {
                backend: EmbeddingBackend::Hashing,
                model: "minishlab/potion-base-8M".to_string(),
                dimension: 384,
                batch_size: 32,
            },
            index: IndexConfig {
                max_connections: 32,
                ef_construction: 200,
                ef_search: 64,
                seed: 42,
            },
            normalizer: NormalizerConfig {
                ontology_path,
                similarity_threshold: 0.75,
            },
            scoring: ScoringConfig {
                weight_semantic: 0.50,
                weight_graph: 0.30,
                weight_experience: 0.20,
                match_threshold: 0.5,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                detailed: false,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SkillFitError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SkillFitError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make the index or the scoring meaningless
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(SkillFitError::Configuration(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }
        if self.index.max_connections < 2 {
            return Err(SkillFitError::Configuration(
                "index.max_connections must be at least 2".to_string(),
            ));
        }
        if self.index.ef_construction == 0 || self.index.ef_search == 0 {
            return Err(SkillFitError::Configuration(
                "index.ef_construction and index.ef_search must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("normalizer.similarity_threshold", self.normalizer.similarity_threshold),
            ("scoring.match_threshold", self.scoring.match_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SkillFitError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("skill-fit")
            .join("config.toml")
    }

    pub fn default_ontology_path() -> PathBuf {
        Self::data_dir().join("ontology").join("skill_ontology.json")
    }

    /// Install the bundled ontology when the default path is configured and
    /// nothing is there yet. Custom paths are left alone.
    pub fn ensure_default_ontology(&self) -> Result<()> {
        if self.normalizer.ontology_path == Self::default_ontology_path() {
            install_bundled_ontology(&self.normalizer.ontology_path)?;
        }
        Ok(())
    }

    fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("data"))
            .join("skill-fit")
    }
}

/// Write the bundled ontology to `path` unless a file exists there.
/// Returns whether it was written.
pub fn install_bundled_ontology(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, BUNDLED_ONTOLOGY)?;
    info!("Installed bundled skill ontology at {}", path.display());
    Ok(true)
}
