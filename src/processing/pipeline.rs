//! Resume to job matching pipeline
//!
//! One request runs a fixed sequence: collect skill names, embed both sides,
//! semantic score, skill graph and graph score, experience score, fusion and
//! explanation. The pipeline holds no per-request state and can be shared
//! across threads.

use crate::error::{Result, SkillFitError};
use crate::processing::embeddings::EmbeddingProvider;
use crate::processing::explainer::MatchExplainer;
use crate::processing::ontology::UNKNOWN_CATEGORY;
use crate::processing::scoring::{MatchScore, MatchedSkill, ScoringEngine, ScoringWeights};
use crate::processing::skill_extractor::{CandidateSource, SkillExtractor};
use crate::processing::skill_graph::{GraphSink, SkillGraphBuilder};
use crate::processing::skill_normalizer::{round4, NormalizedSkill, SkillNormalizer};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const NO_JOB_SKILLS_MESSAGE: &str = "No job skills specified for matching.";
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeSkill {
    pub raw: String,
    pub canonical: String,
    pub category: String,
    pub confidence: f32,
    pub source: CandidateSource,
}

impl ResumeSkill {
    pub fn from_normalized(skill: NormalizedSkill, confidence: f32, source: CandidateSource) -> Self {
        Self {
            raw: skill.raw,
            canonical: skill.canonical,
            category: skill.category,
            confidence,
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub resume_id: String,
    pub skills: Vec<ResumeSkill>,
    #[serde(default)]
    pub experience_years: Option<f32>,
}

impl ResumeProfile {
    pub fn canonical_skills(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.canonical.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub min_experience_years: Option<f32>,
}

impl JobDescription {
    /// Required then preferred skills, first spelling kept for
    /// case-insensitive duplicates
    pub fn all_skills(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.required_skills
            .iter()
            .chain(self.preferred_skills.iter())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
            .map(|s| s.to_string())
            .collect()
    }
}

/// A normalized skill that came out of text extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSkill {
    #[serde(flatten)]
    pub skill: NormalizedSkill,
    pub source: CandidateSource,
    pub extraction_confidence: f32,
}

pub struct MatchingPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    normalizer: Option<Arc<SkillNormalizer>>,
    extractor: Option<Arc<dyn SkillExtractor>>,
    graph_sink: Option<Arc<dyn GraphSink>>,
    graph_builder: SkillGraphBuilder,
    scoring: ScoringEngine,
    explainer: MatchExplainer,
    match_threshold: f32,
    top_k: usize,
}

impl MatchingPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, scoring: ScoringEngine) -> Self {
        Self {
            embedder,
            normalizer: None,
            extractor: None,
            graph_sink: None,
            graph_builder: SkillGraphBuilder::new(),
            scoring,
            explainer: MatchExplainer::new(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<SkillNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn SkillExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_graph_sink(mut self, sink: Arc<dyn GraphSink>) -> Self {
        self.graph_sink = Some(sink);
        self
    }

    pub fn with_match_threshold(mut self, threshold: f32) -> Self {
        self.match_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn normalizer(&self) -> Option<&Arc<SkillNormalizer>> {
        self.normalizer.as_ref()
    }

    pub fn weights(&self) -> ScoringWeights {
        self.scoring.weights()
    }

    pub fn explainer(&self) -> &MatchExplainer {
        &self.explainer
    }

    /// Extract skill mentions from text and normalize them against the ontology
    pub fn extract_and_normalize_skills(&self, text: &str) -> Result<Vec<ExtractedSkill>> {
        let extractor = self.extractor.as_ref().ok_or_else(|| {
            SkillFitError::Configuration("No skill extractor configured".to_string())
        })?;
        let normalizer = self.require_normalizer()?;

        let candidates = extractor.extract(text);
        if candidates.is_empty() {
            warn!("No skills extracted from text");
            return Ok(Vec::new());
        }

        let raw: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let normalized = normalizer.normalize(&raw, self.top_k)?;

        Ok(normalized
            .into_iter()
            .zip(candidates)
            .map(|(skill, candidate)| ExtractedSkill {
                skill,
                source: candidate.source,
                extraction_confidence: candidate.confidence,
            })
            .collect())
    }

    /// Normalize free-standing skill names, keeping the raw string for
    /// anything below the similarity threshold
    pub fn normalize_skill_names(&self, skills: &[String]) -> Result<Vec<NormalizedSkill>> {
        self.require_normalizer()?.normalize(skills, self.top_k)
    }

    /// Score one resume against one job. The returned score carries its
    /// explanation.
    pub fn match_pair(&self, resume: &ResumeProfile, job: &JobDescription) -> Result<MatchScore> {
        let resume_skills = resume.canonical_skills();
        let job_skills = job.all_skills();

        info!(
            "Starting match: resume={} ({} skills) -> job={} ({} required + {} preferred skills)",
            resume.resume_id,
            resume_skills.len(),
            job.title,
            job.required_skills.len(),
            job.preferred_skills.len()
        );

        if job_skills.is_empty() {
            warn!("No job skills provided, returning zero score");
            return Ok(MatchScore::empty(NO_JOB_SKILLS_MESSAGE));
        }

        // Semantic
        let resume_embeddings = if resume_skills.is_empty() {
            Vec::new()
        } else {
            self.embedder.encode_batch(&resume_skills)?
        };
        let job_embeddings = self.embedder.encode_batch(&job_skills)?;
        let (semantic_score, alignments) = self
            .scoring
            .compute_semantic_score(&resume_embeddings, &job_embeddings);

        let matched_skills: Vec<MatchedSkill> = alignments
            .iter()
            .filter(|a| a.similarity >= self.match_threshold)
            .map(|a| MatchedSkill {
                skill: job_skills[a.job_index].clone(),
                similarity: round4(a.similarity.min(1.0)),
            })
            .collect();
        debug!(
            "{} of {} job skills matched at threshold {:.2}",
            matched_skills.len(),
            job_skills.len(),
            self.match_threshold
        );

        // Graph
        let categories = self.skill_categories(resume, &job_skills);
        let graph = self
            .graph_builder
            .build_skill_graph(&resume_skills, &job_skills, Some(&categories));
        let graph_score =
            self.graph_builder
                .compute_graph_similarity(&graph, &resume_skills, &job_skills);
        if let Some(sink) = &self.graph_sink {
            sink.materialize(&graph);
        }

        // Experience
        let experience_score = self
            .scoring
            .compute_experience_score(resume.experience_years, job.min_experience_years);

        let score = self.scoring.compute_overall(
            semantic_score,
            graph_score,
            experience_score,
            matched_skills,
            &job_skills,
        );
        let explanation = self.explainer.explain(
            &score,
            &resume_skills,
            &job_skills,
            &job.title,
            &self.scoring.weights(),
        );

        info!(
            "Match complete: {} -> {}: {:.4} ({})",
            resume.resume_id, job.title, score.overall, score.fit_label
        );
        Ok(score.with_explanation(explanation))
    }

    /// Resume skills keep their normalized category; job skills take the
    /// ontology category when the normalizer knows them.
    fn skill_categories(
        &self,
        resume: &ResumeProfile,
        job_skills: &[String],
    ) -> HashMap<String, String> {
        let mut categories: HashMap<String, String> = resume
            .skills
            .iter()
            .map(|s| (s.canonical.clone(), s.category.clone()))
            .collect();

        for skill in job_skills {
            if categories.contains_key(skill) {
                continue;
            }
            let category = self
                .normalizer
                .as_ref()
                .and_then(|n| n.category(skill))
                .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
            categories.insert(skill.clone(), category);
        }
        categories
    }

    fn require_normalizer(&self) -> Result<&SkillNormalizer> {
        self.normalizer
            .as_deref()
            .ok_or_else(|| SkillFitError::Configuration("No skill normalizer configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::embeddings::HashingEmbedder;
    use crate::processing::ontology::{CanonicalSkillEntry, OntologySource};
    use crate::processing::scoring::FitLabel;
    use crate::processing::skill_extractor::LexiconSkillExtractor;
    use crate::processing::skill_graph::InMemoryGraphSink;
    use crate::processing::vector_index::IndexParams;

    const DIM: usize = 256;

    fn resume(skills: &[(&str, &str)], years: Option<f32>) -> ResumeProfile {
        ResumeProfile {
            resume_id: "res_test".to_string(),
            skills: skills
                .iter()
                .map(|(name, category)| ResumeSkill {
                    raw: name.to_string(),
                    canonical: name.to_string(),
                    category: category.to_string(),
                    confidence: 1.0,
                    source: CandidateSource::Manual,
                })
                .collect(),
            experience_years: years,
        }
    }

    fn job(required: &[&str], preferred: &[&str], years: Option<f32>) -> JobDescription {
        JobDescription {
            title: "Backend Engineer".to_string(),
            description: String::new(),
            required_skills: required.iter().map(|s| s.to_string()).collect(),
            preferred_skills: preferred.iter().map(|s| s.to_string()).collect(),
            min_experience_years: years,
        }
    }

    fn pipeline() -> MatchingPipeline {
        MatchingPipeline::new(
            Arc::new(HashingEmbedder::new(DIM)),
            ScoringEngine::default(),
        )
    }

    fn normalizer() -> Arc<SkillNormalizer> {
        let entries = vec![
            CanonicalSkillEntry::new("Python", &["py", "python3"], "Programming Language"),
            CanonicalSkillEntry::new("Kubernetes", &["k8s"], "DevOps"),
            CanonicalSkillEntry::new("PostgreSQL", &["postgres"], "Database"),
        ];
        Arc::new(SkillNormalizer::new(
            OntologySource::Entries(entries),
            Arc::new(HashingEmbedder::new(DIM)),
            IndexParams {
                dimension: DIM,
                ..IndexParams::default()
            },
            0.75,
        ))
    }

    #[test]
    fn test_all_skills_dedup_keeps_order() {
        let job = job(&["Python", "SQL", "python"], &["Docker", "sql", " "], None);
        assert_eq!(job.all_skills(), vec!["Python", "SQL", "Docker"]);
    }

    #[test]
    fn test_empty_job_skills_zero_weak_fit() {
        let score = pipeline()
            .match_pair(&resume(&[("Python", "Unknown")], Some(5.0)), &job(&[], &[], None))
            .unwrap();

        assert_eq!(score.overall, 0.0);
        assert_eq!(score.fit_label, FitLabel::WeakFit);
        assert_eq!(score.explanation, NO_JOB_SKILLS_MESSAGE);
        assert!(score.matched_skills.is_empty() && score.missing_skills.is_empty());
    }

    #[test]
    fn test_identical_skill_sets_score_strong() {
        let skills = [("Python", "Programming Language"), ("Docker", "DevOps")];
        let score = pipeline()
            .match_pair(&resume(&skills, Some(6.0)), &job(&["Python", "Docker"], &[], Some(3.0)))
            .unwrap();

        assert!((score.semantic_score - 1.0).abs() < 1e-3);
        assert!((score.graph_score - 1.0).abs() < 1e-3);
        assert_eq!(score.experience_score, 1.0);
        assert_eq!(score.fit_label, FitLabel::StrongFit);
        assert_eq!(score.matched_skills.len(), 2);
        assert!(score.missing_skills.is_empty());
        assert!(score.explanation.starts_with("Match Analysis: Resume → Backend Engineer"));
    }

    #[test]
    fn test_missing_skills_and_sink() {
        let sink = Arc::new(InMemoryGraphSink::new(4));
        let pipeline = pipeline().with_graph_sink(sink.clone());
        let score = pipeline
            .match_pair(
                &resume(&[("Python", "Programming Language")], None),
                &job(&["Python"], &["Kubernetes"], Some(2.0)),
            )
            .unwrap();

        assert_eq!(score.missing_skills, vec!["Kubernetes"]);
        assert_eq!(score.matched_skills[0].skill, "Python");
        assert_eq!(score.experience_score, 0.3);
        assert!((0.0..=1.0).contains(&score.overall));

        let graph = sink.latest().unwrap();
        assert!(graph.node("skill:kubernetes").is_some());
        assert!(graph.node("category:programming language").is_some());
    }

    #[test]
    fn test_empty_resume_scores_low() {
        let score = pipeline()
            .match_pair(&resume(&[], None), &job(&["Rust", "Go"], &[], None))
            .unwrap();

        assert_eq!(score.semantic_score, 0.0);
        assert_eq!(score.graph_score, 0.0);
        assert_eq!(score.missing_skills, vec!["Rust", "Go"]);
        assert_eq!(score.fit_label, FitLabel::WeakFit);
    }

    #[test]
    fn test_job_categories_come_from_ontology() {
        let pipeline = pipeline().with_normalizer(normalizer());
        pipeline.normalize_skill_names(&["py".to_string()]).unwrap();

        let categories = pipeline.skill_categories(
            &resume(&[("Python", "Programming Language")], None),
            &["Kubernetes".to_string(), "Cobol".to_string()],
        );
        assert_eq!(categories["Python"], "Programming Language");
        assert_eq!(categories["Kubernetes"], "DevOps");
        assert_eq!(categories["Cobol"], UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_extract_and_normalize_skills() {
        let normalizer = normalizer();
        let extractor =
            LexiconSkillExtractor::from_ontology(normalizer.ontology().unwrap()).unwrap();
        let pipeline = pipeline()
            .with_normalizer(normalizer)
            .with_extractor(Arc::new(extractor));

        let skills = pipeline
            .extract_and_normalize_skills("Five years of python3 and k8s, some Postgres")
            .unwrap();
        let canonical: Vec<&str> = skills.iter().map(|s| s.skill.canonical.as_str()).collect();

        assert_eq!(canonical, vec!["Python", "Kubernetes", "PostgreSQL"]);
        assert!(skills.iter().all(|s| s.source == CandidateSource::Lexicon));
        assert!(skills.iter().all(|s| s.extraction_confidence == 0.85));

        assert!(pipeline
            .extract_and_normalize_skills("nothing relevant here")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_extract_without_extractor_is_configuration_error() {
        assert!(matches!(
            pipeline().extract_and_normalize_skills("python"),
            Err(SkillFitError::Configuration(_))
        ));
    }
}
