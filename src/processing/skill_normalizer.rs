//! Skill normalization: map noisy skill strings onto canonical ontology names
//!
//! Every canonical name and every alias is embedded and indexed separately,
//! all labelled with the canonical name. Synonyms, abbreviations and typos then
//! resolve through nearest-neighbour search instead of an exact alias table.

use crate::error::{Result, SkillFitError};
use crate::processing::embeddings::EmbeddingProvider;
use crate::processing::ontology::{Ontology, OntologySource, UNKNOWN_CATEGORY};
use crate::processing::vector_index::{IndexParams, VectorIndex};
use log::{debug, info};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSkill {
    pub raw: String,
    pub canonical: String,
    pub similarity: f32,
    pub category: String,
    pub matched: bool,
}

/// Ontology plus the index built from it; created once, then read-only
struct NormalizerState {
    ontology: Ontology,
    index: VectorIndex,
    term_count: usize,
}

pub struct SkillNormalizer {
    source: OntologySource,
    embedder: Arc<dyn EmbeddingProvider>,
    index_params: IndexParams,
    threshold: f32,
    state: OnceCell<NormalizerState>,
}

impl SkillNormalizer {
    pub fn new(
        source: OntologySource,
        embedder: Arc<dyn EmbeddingProvider>,
        index_params: IndexParams,
        threshold: f32,
    ) -> Self {
        Self {
            source,
            embedder,
            index_params,
            threshold: threshold.clamp(0.0, 1.0),
            state: OnceCell::new(),
        }
    }

    /// Load the ontology, embed all terms and build the index.
    ///
    /// Runs the build at most once. Concurrent callers block until the first
    /// build finishes; a failed build leaves the normalizer uninitialized.
    pub fn initialize(&self) -> Result<()> {
        self.state().map(|_| ())
    }

    fn state(&self) -> Result<&NormalizerState> {
        self.state.get_or_try_init(|| self.build_state())
    }

    fn build_state(&self) -> Result<NormalizerState> {
        let ontology = Ontology::load(&self.source)?;
        let terms = ontology.indexed_terms();
        if terms.is_empty() {
            return Err(SkillFitError::EmptyOntology);
        }

        info!(
            "Embedding {} skill terms ({} canonical)",
            terms.len(),
            ontology.len()
        );
        let (texts, labels): (Vec<String>, Vec<String>) = terms
            .into_iter()
            .map(|t| (t.text, t.canonical_name))
            .unzip();
        let embeddings = self.embedder.encode_batch(&texts)?;

        let mut index = VectorIndex::new(self.index_params.clone());
        index.build(embeddings, labels)?;

        info!(
            "Skill normalizer initialized with {} canonical skills",
            ontology.len()
        );
        Ok(NormalizerState {
            term_count: texts.len(),
            ontology,
            index,
        })
    }

    /// Normalize a batch of raw skill strings, one result per input, in order.
    ///
    /// Initializes lazily on first use.
    pub fn normalize(&self, raw_skills: &[String], top_k: usize) -> Result<Vec<NormalizedSkill>> {
        let state = self.state()?;
        if raw_skills.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.encode_batch(raw_skills)?;
        let results = state.index.search(&embeddings, top_k.max(1))?;

        let normalized: Vec<NormalizedSkill> = raw_skills
            .iter()
            .zip(results)
            .map(|(raw, candidates)| match candidates.first() {
                Some(best) if best.similarity >= self.threshold => NormalizedSkill {
                    raw: raw.clone(),
                    canonical: best.label.clone(),
                    similarity: round4(best.similarity.clamp(0.0, 1.0)),
                    category: state
                        .ontology
                        .category(&best.label)
                        .unwrap_or(UNKNOWN_CATEGORY)
                        .to_string(),
                    matched: true,
                },
                best => NormalizedSkill {
                    raw: raw.clone(),
                    canonical: raw.clone(),
                    similarity: round4(best.map(|b| b.similarity).unwrap_or(0.0).clamp(0.0, 1.0)),
                    category: UNKNOWN_CATEGORY.to_string(),
                    matched: false,
                },
            })
            .collect();

        let matched = normalized.iter().filter(|n| n.matched).count();
        info!(
            "Normalized {}/{} skills above threshold {:.2}",
            matched,
            normalized.len(),
            self.threshold
        );
        for skill in normalized.iter().filter(|n| !n.matched) {
            debug!("No canonical skill for '{}' (best {:.3})", skill.raw, skill.similarity);
        }
        Ok(normalized)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    pub fn canonical_skills(&self) -> Result<Vec<String>> {
        Ok(self.state()?.ontology.canonical_skills())
    }

    /// Category of a canonical skill, `None` before initialization or when unknown
    pub fn category(&self, canonical_skill: &str) -> Option<String> {
        self.state
            .get()
            .and_then(|s| s.ontology.category(canonical_skill))
            .map(|c| c.to_string())
    }

    pub fn ontology(&self) -> Result<&Ontology> {
        Ok(&self.state()?.ontology)
    }

    pub fn term_count(&self) -> usize {
        self.state.get().map(|s| s.term_count).unwrap_or(0)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

pub(crate) fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::embeddings::HashingEmbedder;
    use crate::processing::ontology::CanonicalSkillEntry;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder with hand-placed vectors, counting how often it is called
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(entries: &[(&str, [f32; 3])]) -> Self {
            let table = entries
                .iter()
                .map(|(text, v)| {
                    let mut v = v.to_vec();
                    crate::processing::embeddings::l2_normalize(&mut v);
                    (text.to_string(), v)
                })
                .collect();
            Self {
                table,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingProvider for TableEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
                .collect())
        }
    }

    fn params() -> IndexParams {
        IndexParams {
            dimension: 3,
            max_connections: 4,
            ef_construction: 16,
            ef_search: 8,
            seed: 1,
        }
    }

    fn python_ontology() -> OntologySource {
        OntologySource::Entries(vec![
            CanonicalSkillEntry::new("Python", &["py", "python3"], "Programming Language"),
            CanonicalSkillEntry::new("Docker", &[], "DevOps"),
        ])
    }

    fn table_embedder() -> Arc<TableEmbedder> {
        Arc::new(TableEmbedder::new(&[
            ("Python", [1.0, 0.0, 0.0]),
            ("py", [0.9, 0.1, 0.0]),
            ("python3", [0.95, 0.05, 0.0]),
            ("Docker", [0.0, 1.0, 0.0]),
            ("pyhton", [0.85, 0.2, 0.0]),
            ("basket weaving", [0.0, 0.3, 1.0]),
        ]))
    }

    #[test]
    fn test_alias_resolves_to_canonical() {
        let normalizer = SkillNormalizer::new(python_ontology(), table_embedder(), params(), 0.75);
        let result = normalizer.normalize(&["py".to_string()], 1).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].raw, "py");
        assert_eq!(result[0].canonical, "Python");
        assert_eq!(result[0].category, "Programming Language");
        assert!(result[0].matched);
        assert!(result[0].similarity >= 0.99);
    }

    #[test]
    fn test_below_threshold_passes_through() {
        let normalizer = SkillNormalizer::new(python_ontology(), table_embedder(), params(), 0.75);
        let result = normalizer
            .normalize(&["basket weaving".to_string()], 1)
            .unwrap();

        assert!(!result[0].matched);
        assert_eq!(result[0].canonical, "basket weaving");
        assert_eq!(result[0].category, UNKNOWN_CATEGORY);
        assert!(result[0].similarity < 0.75);
    }

    #[test]
    fn test_output_order_matches_input() {
        let normalizer = SkillNormalizer::new(python_ontology(), table_embedder(), params(), 0.75);
        let raw: Vec<String> = ["Docker", "basket weaving", "pyhton"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = normalizer.normalize(&raw, 3).unwrap();

        let raws: Vec<&str> = result.iter().map(|n| n.raw.as_str()).collect();
        assert_eq!(raws, vec!["Docker", "basket weaving", "pyhton"]);
        assert_eq!(result[0].canonical, "Docker");
        assert_eq!(result[2].canonical, "Python");
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let embedder = table_embedder();
        let normalizer =
            SkillNormalizer::new(python_ontology(), embedder.clone(), params(), 0.75);

        normalizer.initialize().unwrap();
        normalizer.initialize().unwrap();
        assert!(normalizer.is_initialized());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(normalizer.term_count(), 4);
    }

    #[test]
    fn test_concurrent_initialize_builds_once() {
        let embedder = table_embedder();
        let normalizer = Arc::new(SkillNormalizer::new(
            python_ontology(),
            embedder.clone(),
            params(),
            0.75,
        ));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let normalizer = Arc::clone(&normalizer);
                scope.spawn(move || normalizer.initialize().unwrap());
            }
        });

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let normalizer = SkillNormalizer::new(
            python_ontology(),
            Arc::new(HashingEmbedder::new(64)),
            IndexParams {
                dimension: 64,
                ..params()
            },
            0.75,
        );
        let raw = vec!["python".to_string(), "Docker Compose".to_string()];

        let first = normalizer.normalize(&raw, 1).unwrap();
        let second = normalizer.normalize(&raw, 1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].canonical, "Python");
    }

    #[test]
    fn test_empty_ontology_fails() {
        let normalizer = SkillNormalizer::new(
            OntologySource::Entries(Vec::new()),
            table_embedder(),
            params(),
            0.75,
        );

        assert!(matches!(normalizer.initialize(), Err(SkillFitError::EmptyOntology)));
        assert!(!normalizer.is_initialized());
        assert!(normalizer.normalize(&["py".to_string()], 1).is_err());
    }

    #[test]
    fn test_missing_ontology_file_fails_as_empty() {
        let normalizer = SkillNormalizer::new(
            OntologySource::File("/no/such/ontology.json".into()),
            table_embedder(),
            params(),
            0.75,
        );
        assert!(matches!(normalizer.initialize(), Err(SkillFitError::EmptyOntology)));
    }

    #[test]
    fn test_dimension_mismatch_surfaces() {
        let normalizer = SkillNormalizer::new(
            python_ontology(),
            table_embedder(),
            IndexParams {
                dimension: 8,
                ..params()
            },
            0.75,
        );
        assert!(matches!(
            normalizer.initialize(),
            Err(SkillFitError::DimensionMismatch { expected: 8, actual: 3 })
        ));
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let normalizer = SkillNormalizer::new(python_ontology(), table_embedder(), params(), 0.75);
        assert!(normalizer.normalize(&[], 1).unwrap().is_empty());
        assert!(normalizer.is_initialized());
        assert_eq!(normalizer.category("Docker").as_deref(), Some("DevOps"));
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }
}
