//! Request-level orchestration: resume store plus matching

use crate::config::Config;
use crate::error::{Result, SkillFitError};
use crate::processing::embeddings::provider_from_config;
use crate::processing::ontology::OntologySource;
use crate::processing::pipeline::{
    JobDescription, MatchingPipeline, ResumeProfile, ResumeSkill,
};
use crate::processing::scoring::{MatchScore, ScoringEngine, ScoringWeights};
use crate::processing::skill_extractor::LexiconSkillExtractor;
use crate::processing::skill_graph::GraphSink;
use crate::processing::skill_normalizer::SkillNormalizer;
use crate::processing::vector_index::IndexParams;
use log::info;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

pub struct MatchService {
    pipeline: Arc<MatchingPipeline>,
    resumes: RwLock<HashMap<String, ResumeProfile>>,
}

impl MatchService {
    pub fn new(pipeline: Arc<MatchingPipeline>) -> Self {
        Self {
            pipeline,
            resumes: RwLock::new(HashMap::new()),
        }
    }

    /// Wire embedder, normalizer, lexicon extractor and scoring from the
    /// configuration. The normalizer index is built here, so ontology
    /// problems surface at startup.
    pub fn from_config(config: &Config, graph_sink: Option<Arc<dyn GraphSink>>) -> Result<Self> {
        let embedder = provider_from_config(&config.embedding)?;
        let normalizer = Arc::new(SkillNormalizer::new(
            OntologySource::File(config.normalizer.ontology_path.clone()),
            embedder.clone(),
            IndexParams::from_config(embedder.dimension(), &config.index),
            config.normalizer.similarity_threshold,
        ));
        normalizer.initialize()?;

        let extractor = LexiconSkillExtractor::from_ontology(normalizer.ontology()?)?;
        let scoring = ScoringEngine::new(ScoringWeights::new(
            config.scoring.weight_semantic,
            config.scoring.weight_graph,
            config.scoring.weight_experience,
        ));

        let mut pipeline = MatchingPipeline::new(embedder, scoring)
            .with_normalizer(normalizer)
            .with_extractor(Arc::new(extractor))
            .with_match_threshold(config.scoring.match_threshold);
        if let Some(sink) = graph_sink {
            pipeline = pipeline.with_graph_sink(sink);
        }

        Ok(Self::new(Arc::new(pipeline)))
    }

    pub fn pipeline(&self) -> &MatchingPipeline {
        &self.pipeline
    }

    /// Store a profile as-is, replacing any profile with the same id
    pub fn register_resume(&self, profile: ResumeProfile) -> String {
        let id = profile.resume_id.clone();
        self.resumes.write().insert(id.clone(), profile);
        id
    }

    /// Extract and normalize skills from resume text and store the profile
    /// under a fresh id
    pub fn ingest_resume(
        &self,
        filename: &str,
        text: &str,
        experience_years: Option<f32>,
    ) -> Result<ResumeProfile> {
        if text.trim().is_empty() {
            return Err(SkillFitError::InvalidInput(format!(
                "Resume '{}' has no text",
                filename
            )));
        }

        let skills: Vec<ResumeSkill> = self
            .pipeline
            .extract_and_normalize_skills(text)?
            .into_iter()
            .map(|e| ResumeSkill::from_normalized(e.skill, e.extraction_confidence, e.source))
            .collect();

        let profile = ResumeProfile {
            resume_id: generate_resume_id(filename),
            skills,
            experience_years,
        };
        info!(
            "Ingested resume {} from '{}' with {} skills",
            profile.resume_id,
            filename,
            profile.skills.len()
        );

        self.register_resume(profile.clone());
        Ok(profile)
    }

    pub fn get_resume(&self, resume_id: &str) -> Result<ResumeProfile> {
        self.resumes
            .read()
            .get(resume_id)
            .cloned()
            .ok_or_else(|| SkillFitError::ResumeNotFound(resume_id.to_string()))
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.read().len()
    }

    /// Match a stored resume against a job. Job skills are normalized onto
    /// canonical names first so both sides speak the ontology's vocabulary.
    pub fn match_resume_to_job(&self, resume_id: &str, job: &JobDescription) -> Result<MatchScore> {
        let resume = self.get_resume(resume_id)?;
        let job = self.normalize_job(job)?;
        self.pipeline.match_pair(&resume, &job)
    }

    pub fn normalize_job(&self, job: &JobDescription) -> Result<JobDescription> {
        let canonical = |skills: &[String]| -> Result<Vec<String>> {
            Ok(self
                .pipeline
                .normalize_skill_names(skills)?
                .into_iter()
                .map(|s| s.canonical)
                .collect())
        };

        Ok(JobDescription {
            required_skills: canonical(&job.required_skills)?,
            preferred_skills: canonical(&job.preferred_skills)?,
            ..job.clone()
        })
    }
}

/// `res_<8 hex of the filename hash>_<8 hex of a random uuid>`
pub fn generate_resume_id(filename: &str) -> String {
    let mut hasher = DefaultHasher::new();
    filename.hash(&mut hasher);
    let name_hash = hasher.finish() as u32;
    let random = Uuid::new_v4().simple().to_string();
    format!("res_{:08x}_{}", name_hash, &random[..8])
}
