//! Skill extraction from free text

use crate::error::{Result, SkillFitError};
use crate::processing::ontology::Ontology;
use aho_corasick::{AhoCorasick, MatchKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const LEXICON_CONFIDENCE: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Lexicon,
    Ner,
    Manual,
}

/// A skill mention found in text, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCandidate {
    pub text: String,
    pub confidence: f32,
    pub source: CandidateSource,
}

pub trait SkillExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<SkillCandidate>;
}

/// Dictionary matcher over known skill terms.
///
/// Matching is ASCII case-insensitive, prefers the longest term at each
/// position and only accepts hits on word boundaries.
pub struct LexiconSkillExtractor {
    matcher: AhoCorasick,
    terms: Vec<String>,
}

impl LexiconSkillExtractor {
    pub fn new(terms: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
            .collect();

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&terms)
            .map_err(|e| {
                SkillFitError::Processing(format!("Failed to build skill lexicon: {}", e))
            })?;

        Ok(Self { matcher, terms })
    }

    /// Every canonical name and alias of the ontology becomes a term
    pub fn from_ontology(ontology: &Ontology) -> Result<Self> {
        Self::new(
            ontology
                .indexed_terms()
                .into_iter()
                .map(|term| term.text)
                .collect(),
        )
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

impl SkillExtractor for LexiconSkillExtractor {
    fn extract(&self, text: &str) -> Vec<SkillCandidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for mat in self.matcher.find_iter(text) {
            if !on_word_boundary(text, mat.start(), mat.end()) {
                continue;
            }
            let surface = &text[mat.start()..mat.end()];
            if seen.insert(surface.to_lowercase()) {
                candidates.push(SkillCandidate {
                    text: surface.to_string(),
                    confidence: LEXICON_CONFIDENCE,
                    source: CandidateSource::Lexicon,
                });
            }
        }

        debug!("Lexicon extractor found {} skills", candidates.len());
        candidates
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ontology::CanonicalSkillEntry;

    fn extractor(terms: &[&str]) -> LexiconSkillExtractor {
        LexiconSkillExtractor::new(terms.iter().map(|t| t.to_string()).collect()).unwrap()
    }

    fn texts(candidates: &[SkillCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_extracts_known_terms_case_insensitively() {
        let extractor = extractor(&["Python", "Docker", "SQL"]);
        let found = extractor.extract("Built python services, shipped with docker and SQL.");

        assert_eq!(texts(&found), vec!["python", "docker", "SQL"]);
        assert!(found
            .iter()
            .all(|c| c.confidence == 0.85 && c.source == CandidateSource::Lexicon));
    }

    #[test]
    fn test_prefers_longest_term_and_respects_word_boundaries() {
        let extractor = extractor(&["Java", "JavaScript", "Go"]);
        let found = extractor.extract("JavaScript and Java, but not Google or Golang");
        assert_eq!(texts(&found), vec!["JavaScript", "Java"]);
    }

    #[test]
    fn test_repeated_mentions_reported_once() {
        let extractor = extractor(&["Rust"]);
        let found = extractor.extract("Rust, rust and RUST");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "Rust");
    }

    #[test]
    fn test_from_ontology_includes_aliases() {
        let ontology = Ontology::from_entries(vec![CanonicalSkillEntry::new(
            "Kubernetes",
            &["k8s"],
            "DevOps",
        )]);
        let extractor = LexiconSkillExtractor::from_ontology(&ontology).unwrap();
        assert_eq!(extractor.term_count(), 2);
        assert_eq!(texts(&extractor.extract("Ran k8s clusters")), vec!["k8s"]);
    }

    #[test]
    fn test_no_matches() {
        let extractor = extractor(&["Haskell"]);
        assert!(extractor.extract("Plain prose without skills").is_empty());
        assert!(extractor.extract("").is_empty());
    }
}
