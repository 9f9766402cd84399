//! Skill normalization and explainable resume/job fit scoring

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod processing;

pub use config::Config;
pub use error::{Result, SkillFitError};
pub use processing::pipeline::{JobDescription, MatchingPipeline, ResumeProfile, ResumeSkill};
pub use processing::scoring::{FitLabel, MatchScore};
pub use processing::service::MatchService;
pub use processing::skill_normalizer::{NormalizedSkill, SkillNormalizer};
