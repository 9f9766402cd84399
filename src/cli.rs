//! CLI interface for skill-fit

use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skill-fit")]
#[command(about = "Skill normalization and explainable resume/job fit scoring")]
#[command(long_about = "Normalize skills against an ontology with approximate nearest-neighbour search, then score resumes against jobs with semantic, graph and experience signals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a resume against a job description
    Match {
        /// Resume as a JSON skill list {"resume_id"?, "skills": [..], "experience_years"?}
        /// or as plain text / Markdown for skill extraction
        #[arg(short, long)]
        resume: PathBuf,

        /// Job JSON: {"title", "required_skills", "preferred_skills"?, "min_experience_years"?}
        #[arg(short, long)]
        job: PathBuf,

        /// Ontology JSON file, overrides the configured path (the bundled
        /// ontology is installed at the default path on first run)
        #[arg(long)]
        ontology: Option<PathBuf>,

        /// Output format: console, json, markdown
        #[arg(short, long)]
        output: Option<String>,

        /// Include the full text explanation in console output
        #[arg(short, long)]
        detailed: bool,

        /// Save output to file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Append the built skill graph to a JSON-lines file
        #[arg(long)]
        graph_out: Option<PathBuf>,
    },

    /// Map raw skill strings onto canonical ontology skills
    Normalize {
        /// Raw skill strings
        #[arg(required = true)]
        skills: Vec<String>,

        /// Ontology JSON file, overrides the configured path (the bundled
        /// ontology is installed at the default path on first run)
        #[arg(long)]
        ontology: Option<PathBuf>,

        /// Number of index candidates to consider per skill
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Reset configuration to defaults
    Reset,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json, markdown",
            format
        )),
    }
}
