//! Skill ontology: canonical skills, their aliases and categories

use crate::error::{Result, SkillFitError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const UNKNOWN_CATEGORY: &str = "Unknown";

fn unknown_category() -> String {
    UNKNOWN_CATEGORY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSkillEntry {
    #[serde(rename = "canonical")]
    pub canonical_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "unknown_category")]
    pub category: String,
}

impl CanonicalSkillEntry {
    pub fn new(canonical_name: &str, aliases: &[&str], category: &str) -> Self {
        Self {
            canonical_name: canonical_name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            category: category.to_string(),
        }
    }
}

/// One string to embed, pointing back at the canonical skill it resolves to
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTerm {
    pub text: String,
    pub canonical_name: String,
}

#[derive(Debug, Deserialize)]
struct OntologyDocument {
    #[serde(default)]
    skills: Vec<CanonicalSkillEntry>,
}

/// Where the normalizer reads its ontology from
#[derive(Debug, Clone)]
pub enum OntologySource {
    File(PathBuf),
    Entries(Vec<CanonicalSkillEntry>),
}

/// Immutable, validated set of canonical skills
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    entries: Vec<CanonicalSkillEntry>,
    categories: HashMap<String, String>,
}

impl Ontology {
    pub fn load(source: &OntologySource) -> Result<Self> {
        match source {
            OntologySource::File(path) => Self::from_file(path),
            OntologySource::Entries(entries) => Ok(Self::from_entries(entries.clone())),
        }
    }

    /// A missing file yields an empty ontology; a malformed one is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Ontology file not found at {} - using empty ontology",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SkillFitError::Ontology(format!("{}: {}", path.display(), e)))?;
        let document: OntologyDocument = serde_json::from_str(&content)
            .map_err(|e| SkillFitError::Ontology(format!("{}: {}", path.display(), e)))?;

        info!(
            "Loaded ontology from {} ({} skills)",
            path.display(),
            document.skills.len()
        );
        Ok(Self::from_entries(document.skills))
    }

    /// Entries with a blank canonical name are dropped, later duplicates of a
    /// canonical name are merged into the first, and aliases keep their first
    /// occurrence only.
    pub fn from_entries(raw_entries: Vec<CanonicalSkillEntry>) -> Self {
        let mut entries: Vec<CanonicalSkillEntry> = Vec::with_capacity(raw_entries.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for entry in raw_entries {
            let canonical = entry.canonical_name.trim().to_string();
            if canonical.is_empty() {
                warn!("Skipping ontology entry with empty canonical name");
                continue;
            }

            let position = *positions.entry(canonical.clone()).or_insert_with(|| {
                entries.push(CanonicalSkillEntry {
                    canonical_name: canonical.clone(),
                    aliases: Vec::new(),
                    category: entry.category.clone(),
                });
                entries.len() - 1
            });

            entries[position].aliases.extend(
                entry
                    .aliases
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty()),
            );
        }

        for entry in &mut entries {
            let mut seen = HashSet::new();
            entry.aliases.retain(|alias| seen.insert(alias.clone()));
        }

        let categories = entries
            .iter()
            .map(|e| (e.canonical_name.clone(), e.category.clone()))
            .collect();

        Self { entries, categories }
    }

    /// Every canonical name followed by its aliases, in ontology order
    pub fn indexed_terms(&self) -> Vec<IndexedTerm> {
        self.entries
            .iter()
            .flat_map(|entry| {
                std::iter::once(entry.canonical_name.clone())
                    .chain(entry.aliases.iter().cloned())
                    .map(move |text| IndexedTerm {
                        text,
                        canonical_name: entry.canonical_name.clone(),
                    })
            })
            .collect()
    }

    pub fn entries(&self) -> &[CanonicalSkillEntry] {
        &self.entries
    }

    pub fn canonical_skills(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.canonical_name.clone()).collect()
    }

    pub fn category(&self, canonical_name: &str) -> Option<&str> {
        self.categories.get(canonical_name).map(|c| c.as_str())
    }

    pub fn contains(&self, canonical_name: &str) -> bool {
        self.categories.contains_key(canonical_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
