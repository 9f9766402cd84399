//! Match report structures shared by all output formats

use crate::processing::explainer::ScoreContribution;
use crate::processing::scoring::{FitLabel, MatchScore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a formatter needs to render one resume/job match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub summary: MatchSummary,

    /// Scores, matched and missing skills, plus the text explanation
    pub score: MatchScore,

    /// Per-dimension share of the overall score
    pub contributions: Vec<ScoreContribution>,

    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Overall score (0-100)
    pub overall_score_percentage: u8,
    pub fit_label: FitLabel,
    pub verdict: String,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub resume_id: String,
    pub job_title: String,
    pub resume_file: Option<String>,
    pub job_file: Option<String>,
    pub embedding_backend: String,
    pub processing_time_ms: u64,
}

impl ReportMetadata {
    pub fn new(resume_id: &str, job_title: &str, embedding_backend: &str) -> Self {
        Self {
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            resume_id: resume_id.to_string(),
            job_title: job_title.to_string(),
            resume_file: None,
            job_file: None,
            embedding_backend: embedding_backend.to_string(),
            processing_time_ms: 0,
        }
    }

    pub fn with_files(mut self, resume_file: &str, job_file: &str) -> Self {
        self.resume_file = Some(resume_file.to_string());
        self.job_file = Some(job_file.to_string());
        self
    }

    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

impl MatchReport {
    pub fn new(
        score: MatchScore,
        contributions: Vec<ScoreContribution>,
        metadata: ReportMetadata,
    ) -> Self {
        let summary = Self::create_summary(&score);
        Self {
            summary,
            score,
            contributions,
            metadata,
        }
    }

    fn create_summary(score: &MatchScore) -> MatchSummary {
        let overall_score_percentage = (score.overall * 100.0).round().clamp(0.0, 100.0) as u8;

        let mut strengths = Vec::new();
        if score.semantic_score > 0.7 {
            strengths.push("Skills closely match the job requirements by meaning".to_string());
        }
        if score.graph_score > 0.7 {
            strengths.push("Broad overlap with the required skills and categories".to_string());
        }
        if score.experience_score >= 1.0 {
            strengths.push("Experience meets the stated requirement".to_string());
        }

        let mut improvement_areas = Vec::new();
        if score.semantic_score < 0.5 {
            improvement_areas.push("Few skills are close to what the job asks for".to_string());
        }
        if score.graph_score < 0.5 {
            improvement_areas.push("Low structural overlap with the job's skill set".to_string());
        }
        if score.experience_score < 0.5 {
            improvement_areas.push("Experience falls short of the requirement".to_string());
        }
        if !score.missing_skills.is_empty() {
            improvement_areas.push(format!(
                "Missing {} job skill(s): {}",
                score.missing_skills.len(),
                score.missing_skills.join(", ")
            ));
        }

        let verdict = match score.fit_label {
            FitLabel::StrongFit => "Strong candidate for this role",
            FitLabel::ModerateFit => "Solid match with some gaps",
            FitLabel::PotentialFit => "Partial match, several gaps to close",
            FitLabel::WeakFit => "Poor match for this role",
        }
        .to_string();

        MatchSummary {
            overall_score_percentage,
            fit_label: score.fit_label,
            verdict,
            strengths,
            improvement_areas,
        }
    }
}
