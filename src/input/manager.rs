//! Input manager for resume and job description files
//!
//! Resumes come either as a JSON skill list or as plain text / Markdown that
//! goes through skill extraction. Jobs are always JSON.

use crate::error::{Result, SkillFitError};
use crate::processing::pipeline::JobDescription;
use log::info;
use serde::Deserialize;
use std::path::Path;

/// Resume given directly as a skill list
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResumeSkillList {
    #[serde(default)]
    pub resume_id: Option<String>,
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeInput {
    Skills(ResumeSkillList),
    Text { filename: String, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    Json,
    Text,
    Unknown,
}

#[derive(Debug, Default)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    pub fn load_resume(&self, path: &Path) -> Result<ResumeInput> {
        let content = self.read(path)?;
        match self.detect_file_type(path) {
            FileType::Json => {
                info!("Reading resume skill list: {}", path.display());
                let skills: ResumeSkillList = serde_json::from_str(&content).map_err(|e| {
                    SkillFitError::InvalidInput(format!("{}: {}", path.display(), e))
                })?;
                Ok(ResumeInput::Skills(skills))
            }
            FileType::Text => {
                info!("Reading resume text: {}", path.display());
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                Ok(ResumeInput::Text {
                    filename,
                    text: content,
                })
            }
            FileType::Unknown => Err(SkillFitError::InvalidInput(format!(
                "Unsupported resume file type: {}",
                path.display()
            ))),
        }
    }

    pub fn load_job(&self, path: &Path) -> Result<JobDescription> {
        if self.detect_file_type(path) != FileType::Json {
            return Err(SkillFitError::InvalidInput(format!(
                "Job description must be a JSON file: {}",
                path.display()
            )));
        }
        let content = self.read(path)?;
        let job: JobDescription = serde_json::from_str(&content)
            .map_err(|e| SkillFitError::InvalidInput(format!("{}: {}", path.display(), e)))?;
        info!(
            "Loaded job '{}' ({} required, {} preferred skills)",
            job.title,
            job.required_skills.len(),
            job.preferred_skills.len()
        );
        Ok(job)
    }

    fn read(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(SkillFitError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn detect_file_type(&self, path: &Path) -> FileType {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("json") => FileType::Json,
            Some("txt") | Some("md") | Some("markdown") => FileType::Text,
            _ => FileType::Unknown,
        }
    }
}
