//! Human-readable explanations for match results

use crate::processing::scoring::{MatchScore, MatchedSkill, ScoringWeights};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const BAR_CELLS: usize = 10;

/// One scoring dimension's share of the overall score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub dimension: String,
    pub raw_score: f32,
    pub weight: f32,
    pub weighted_contribution: f32,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct MatchExplainer;

impl MatchExplainer {
    pub fn new() -> Self {
        Self
    }

    /// Render the full explanation: header, score breakdown, matched skills,
    /// missing skills (when any) and a coverage summary, separated by blank lines.
    pub fn explain(
        &self,
        score: &MatchScore,
        resume_skills: &[String],
        job_skills: &[String],
        job_title: &str,
        weights: &ScoringWeights,
    ) -> String {
        let mut sections = vec![
            format!(
                "Match Analysis: Resume → {}\nOverall Score: {} ({})",
                job_title,
                percent(score.overall, 1),
                score.fit_label
            ),
            self.format_breakdown(score, weights),
            self.format_matched(&score.matched_skills),
        ];

        if !score.missing_skills.is_empty() {
            sections.push(self.format_missing(&score.missing_skills));
        }
        sections.push(self.format_coverage(resume_skills, job_skills, score));

        sections.join("\n\n")
    }

    pub fn score_contributions(
        &self,
        score: &MatchScore,
        weights: &ScoringWeights,
    ) -> Vec<ScoreContribution> {
        dimensions(score, weights)
            .into_iter()
            .map(|(dimension, raw_score, weight, description)| ScoreContribution {
                dimension: dimension.to_string(),
                raw_score,
                weight,
                weighted_contribution: raw_score * weight,
                description: description.to_string(),
            })
            .collect()
    }

    fn format_breakdown(&self, score: &MatchScore, weights: &ScoringWeights) -> String {
        let mut lines = vec!["Score Breakdown:".to_string()];
        for (dimension, raw, weight, _) in dimensions(score, weights) {
            lines.push(format!(
                "  {:<22}{}  (weight: {})  → contributes {}",
                format!("{}:", dimension),
                percent(raw, 1),
                percent(weight, 0),
                percent(raw * weight, 1)
            ));
        }
        lines.join("\n")
    }

    fn format_matched(&self, matched: &[MatchedSkill]) -> String {
        if matched.is_empty() {
            return "Matched Skills: None".to_string();
        }

        let mut sorted: Vec<&MatchedSkill> = matched.iter().collect();
        sorted.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.skill.cmp(&b.skill))
        });

        let mut lines = vec!["Matched Skills:".to_string()];
        for skill in sorted {
            let filled = ((skill.similarity * BAR_CELLS as f32) as usize).min(BAR_CELLS);
            lines.push(format!(
                "  [{}{}] {}  {}",
                "█".repeat(filled),
                "░".repeat(BAR_CELLS - filled),
                percent(skill.similarity, 1),
                skill.skill
            ));
        }
        lines.join("\n")
    }

    fn format_missing(&self, missing: &[String]) -> String {
        let mut sorted: Vec<&String> = missing.iter().collect();
        sorted.sort();

        let mut lines = vec![format!("Missing Skills ({}):", missing.len())];
        lines.extend(sorted.into_iter().map(|skill| format!("  ✗ {}", skill)));
        lines.join("\n")
    }

    fn format_coverage(
        &self,
        resume_skills: &[String],
        job_skills: &[String],
        score: &MatchScore,
    ) -> String {
        if job_skills.is_empty() {
            return "Coverage Summary: No job skills specified".to_string();
        }

        let matched = score.matched_skills.len();
        let job_set: HashSet<&String> = job_skills.iter().collect();
        let extra = resume_skills
            .iter()
            .collect::<HashSet<_>>()
            .difference(&job_set)
            .count();

        format!(
            "Coverage Summary:\n  Job requires {} skills\n  Resume matches {} ({} coverage)\n  Missing {} skills\n  Resume has {} additional skills not in JD",
            job_skills.len(),
            matched,
            percent(matched as f32 / job_skills.len() as f32, 0),
            score.missing_skills.len(),
            extra
        )
    }
}

fn dimensions(
    score: &MatchScore,
    weights: &ScoringWeights,
) -> [(&'static str, f32, f32, &'static str); 3] {
    [
        (
            "Semantic Similarity",
            score.semantic_score,
            weights.semantic,
            "How well resume skills match job requirements by meaning",
        ),
        (
            "Graph Structure",
            score.graph_score,
            weights.graph,
            "Structural overlap in skill categories and relationships",
        ),
        (
            "Experience Fit",
            score.experience_score,
            weights.experience,
            "How well candidate experience matches job requirements",
        ),
    ]
}

fn percent(value: f32, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::scoring::FitLabel;

    fn sample_score() -> MatchScore {
        MatchScore {
            overall: 0.6512,
            semantic_score: 0.8,
            graph_score: 0.4,
            experience_score: 0.6,
            matched_skills: vec![
                MatchedSkill {
                    skill: "SQL".to_string(),
                    similarity: 0.72,
                },
                MatchedSkill {
                    skill: "Python".to_string(),
                    similarity: 1.0,
                },
                MatchedSkill {
                    skill: "Docker".to_string(),
                    similarity: 0.72,
                },
            ],
            missing_skills: vec!["Kubernetes".to_string(), "AWS".to_string()],
            fit_label: FitLabel::ModerateFit,
            explanation: String::new(),
        }
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explanation_sections() {
        let explainer = MatchExplainer::new();
        let text = explainer.explain(
            &sample_score(),
            &strings(&["Python", "SQL", "Docker", "Excel"]),
            &strings(&["Python", "SQL", "Docker", "Kubernetes", "AWS"]),
            "Data Engineer",
            &ScoringWeights::default(),
        );

        assert!(text.starts_with("Match Analysis: Resume → Data Engineer\nOverall Score: 65.1% (Moderate Fit)"));
        assert!(text.contains("Semantic Similarity:  80.0%  (weight: 50%)  → contributes 40.0%"));
        assert!(text.contains("Missing Skills (2):\n  ✗ AWS\n  ✗ Kubernetes"));
        assert!(text.contains("Resume matches 3 (60% coverage)"));
        assert!(text.contains("Resume has 1 additional skills not in JD"));
        assert_eq!(text.split("\n\n").count(), 5);
    }

    #[test]
    fn test_matched_skills_sorted_with_bars() {
        let explainer = MatchExplainer::new();
        let block = explainer.format_matched(&sample_score().matched_skills);
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines[1], "  [██████████] 100.0%  Python");
        assert_eq!(lines[2], "  [███████░░░] 72.0%  Docker");
        assert_eq!(lines[3], "  [███████░░░] 72.0%  SQL");
    }

    #[test]
    fn test_empty_sections() {
        let explainer = MatchExplainer::new();
        let empty = MatchScore::empty("");
        let text = explainer.explain(&empty, &[], &[], "Anything", &ScoringWeights::default());

        assert!(text.contains("Matched Skills: None"));
        assert!(!text.contains("Missing Skills"));
        assert!(text.ends_with("Coverage Summary: No job skills specified"));
    }

    #[test]
    fn test_score_contributions_do_not_mutate_scores() {
        let explainer = MatchExplainer::new();
        let score = sample_score();
        let before = score.clone();
        let contributions = explainer.score_contributions(&score, &ScoringWeights::default());

        assert_eq!(score, before);
        assert_eq!(contributions.len(), 3);
        assert_eq!(contributions[0].dimension, "Semantic Similarity");
        assert!((contributions[0].weighted_contribution - 0.4).abs() < 1e-6);
        let total: f32 = contributions.iter().map(|c| c.weighted_contribution).sum();
        assert!((total - (0.4 + 0.12 + 0.12)).abs() < 1e-5);
    }
}
