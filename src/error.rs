//! Error handling for the skill fit matcher

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillFitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding generation error: {0}")]
    Embedding(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding/label count mismatch: {vectors} vs {labels}")]
    LabelCountMismatch { vectors: usize, labels: usize },

    #[error("Index not built: call build() before searching")]
    IndexNotBuilt,

    #[error("Ontology is empty: no skills to index")]
    EmptyOntology,

    #[error("Failed to load ontology: {0}")]
    Ontology(String),

    #[error("Resume not found: {0}")]
    ResumeNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

impl SkillFitError {
    /// Per-request lookup failures; everything else points at configuration
    /// or corrupt data and is fatal for the caller.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SkillFitError::ResumeNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SkillFitError>;

/// Convert anyhow errors to our custom error type
impl From<anyhow::Error> for SkillFitError {
    fn from(err: anyhow::Error) -> Self {
        SkillFitError::Processing(err.to_string())
    }
}
