//! Multi-signal fit scoring
//!
//! Three dimensions are fused into one overall score:
//! - semantic: best embedding similarity per job skill, averaged
//! - graph: structural overlap from the skill graph
//! - experience: years of experience against the requirement

use crate::processing::skill_normalizer::round4;
use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const DEFAULT_WEIGHTS: (f32, f32, f32) = (0.50, 0.30, 0.20);
const MISSING_EXPERIENCE_SCORE: f32 = 0.3;
const EXPERIENCE_EXPONENT: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FitLabel {
    #[serde(rename = "Strong Fit")]
    StrongFit,
    #[serde(rename = "Moderate Fit")]
    ModerateFit,
    #[serde(rename = "Potential Fit")]
    PotentialFit,
    #[serde(rename = "Weak Fit")]
    WeakFit,
}

impl FitLabel {
    /// Half-open bands on the overall score; anything below zero or NaN is Weak
    pub fn from_score(score: f32) -> Self {
        if score >= 0.75 {
            FitLabel::StrongFit
        } else if score >= 0.50 {
            FitLabel::ModerateFit
        } else if score >= 0.25 {
            FitLabel::PotentialFit
        } else {
            FitLabel::WeakFit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FitLabel::StrongFit => "Strong Fit",
            FitLabel::ModerateFit => "Moderate Fit",
            FitLabel::PotentialFit => "Potential Fit",
            FitLabel::WeakFit => "Weak Fit",
        }
    }
}

impl fmt::Display for FitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fusion weights, always summing to 1 after construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub semantic: f32,
    pub graph: f32,
    pub experience: f32,
}

impl ScoringWeights {
    pub fn new(semantic: f32, graph: f32, experience: f32) -> Self {
        let total = semantic + graph + experience;
        if !total.is_finite() || total <= 0.0 {
            warn!(
                "Invalid scoring weights ({}, {}, {}), using defaults",
                semantic, graph, experience
            );
            return Self::default();
        }
        Self {
            semantic: semantic / total,
            graph: graph / total,
            experience: experience / total,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        let (semantic, graph, experience) = DEFAULT_WEIGHTS;
        Self {
            semantic,
            graph,
            experience,
        }
    }
}

/// Best resume skill for one job skill
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkillAlignment {
    pub job_index: usize,
    pub resume_index: usize,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub skill: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub overall: f32,
    pub semantic_score: f32,
    pub graph_score: f32,
    pub experience_score: f32,
    pub matched_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<String>,
    pub fit_label: FitLabel,
    pub explanation: String,
}

impl MatchScore {
    /// Zero scores across the board, labelled Weak Fit
    pub fn empty(explanation: &str) -> Self {
        Self {
            overall: 0.0,
            semantic_score: 0.0,
            graph_score: 0.0,
            experience_score: 0.0,
            matched_skills: Vec::new(),
            missing_skills: Vec::new(),
            fit_label: FitLabel::WeakFit,
            explanation: explanation.to_string(),
        }
    }

    pub fn with_explanation(mut self, explanation: String) -> Self {
        self.explanation = explanation;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights: ScoringWeights::new(weights.semantic, weights.graph, weights.experience),
        }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Mean over job skills of the best inner product against any resume
    /// skill, with the winning alignment per job skill (first index on ties).
    pub fn compute_semantic_score(
        &self,
        resume_embeddings: &[Vec<f32>],
        job_embeddings: &[Vec<f32>],
    ) -> (f32, Vec<SkillAlignment>) {
        if resume_embeddings.is_empty() || job_embeddings.is_empty() {
            return (0.0, Vec::new());
        }

        let dimension = job_embeddings[0].len();
        if job_embeddings
            .iter()
            .chain(resume_embeddings.iter())
            .any(|v| v.len() != dimension)
        {
            warn!("Inconsistent embedding lengths, semantic score set to 0");
            return (0.0, Vec::new());
        }

        let (jobs, resumes) = match (to_matrix(job_embeddings), to_matrix(resume_embeddings)) {
            (Some(jobs), Some(resumes)) => (jobs, resumes),
            _ => return (0.0, Vec::new()),
        };
        let similarity = jobs.dot(&resumes.t());

        let alignments: Vec<SkillAlignment> = similarity
            .rows()
            .into_iter()
            .enumerate()
            .map(|(job_index, row)| {
                let mut resume_index = 0;
                let mut best = f32::NEG_INFINITY;
                for (i, &value) in row.iter().enumerate() {
                    if value > best {
                        best = value;
                        resume_index = i;
                    }
                }
                SkillAlignment {
                    job_index,
                    resume_index,
                    similarity: best,
                }
            })
            .collect();

        let mean = alignments.iter().map(|a| a.similarity).sum::<f32>() / alignments.len() as f32;
        let score = if mean.is_finite() {
            mean.clamp(0.0, 1.0)
        } else {
            0.0
        };

        debug!(
            "Semantic score {:.3} over {} job skills",
            score,
            alignments.len()
        );
        (score, alignments)
    }

    pub fn compute_experience_score(
        &self,
        resume_years: Option<f32>,
        required_years: Option<f32>,
    ) -> f32 {
        let required = match required_years {
            Some(required) if required > 0.0 => required,
            _ => return 1.0,
        };
        let Some(years) = resume_years else {
            return MISSING_EXPERIENCE_SCORE;
        };
        if years >= required {
            return 1.0;
        }
        (years.max(0.0) / required)
            .powf(EXPERIENCE_EXPONENT)
            .clamp(0.0, 1.0)
    }

    /// Fuse the three dimensions. The label is taken from the clamped
    /// overall before rounding; rounding only affects the reported numbers.
    pub fn compute_overall(
        &self,
        semantic_score: f32,
        graph_score: f32,
        experience_score: f32,
        matched_skills: Vec<MatchedSkill>,
        job_skills: &[String],
    ) -> MatchScore {
        let weighted = self.weights.semantic * semantic_score
            + self.weights.graph * graph_score
            + self.weights.experience * experience_score;
        let clamped = if weighted.is_finite() {
            weighted.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let matched_names: HashSet<String> = matched_skills
            .iter()
            .map(|m| m.skill.to_lowercase())
            .collect();
        let mut seen = HashSet::new();
        let missing_skills = job_skills
            .iter()
            .filter(|skill| {
                let key = skill.to_lowercase();
                !matched_names.contains(&key) && seen.insert(key)
            })
            .cloned()
            .collect();

        MatchScore {
            overall: round4(clamped),
            semantic_score: round4(semantic_score),
            graph_score: round4(graph_score),
            experience_score: round4(experience_score),
            matched_skills,
            missing_skills,
            fit_label: FitLabel::from_score(clamped),
            explanation: String::new(),
        }
    }
}

fn to_matrix(vectors: &[Vec<f32>]) -> Option<Array2<f32>> {
    let cols = vectors.first().map(|v| v.len())?;
    let flat: Vec<f32> = vectors.iter().flatten().copied().collect();
    Array2::from_shape_vec((vectors.len(), cols), flat).ok()
}
