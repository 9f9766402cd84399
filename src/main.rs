//! skill-fit: skill normalization and explainable resume/job fit scoring

use clap::Parser;
use colored::Colorize;
use log::{error, info};
use skill_fit::cli::{self, Cli, Commands, ConfigAction};
use skill_fit::config::Config;
use skill_fit::error::{Result, SkillFitError};
use skill_fit::input::manager::{InputManager, ResumeInput};
use skill_fit::output::formatter::{save_report_to_file, ReportGenerator};
use skill_fit::output::report::{MatchReport, ReportMetadata};
use skill_fit::processing::pipeline::{ResumeProfile, ResumeSkill};
use skill_fit::processing::service::{generate_resume_id, MatchService};
use skill_fit::processing::skill_extractor::CandidateSource;
use skill_fit::processing::skill_graph::{GraphSink, JsonLinesGraphSink};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, cli.config) {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn run_command(command: Commands, mut config: Config, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Match {
            resume,
            job,
            ontology,
            output,
            detailed,
            save,
            graph_out,
        } => {
            let start_time = Instant::now();
            let format = match output {
                Some(format) => {
                    cli::parse_output_format(&format).map_err(SkillFitError::InvalidInput)?
                }
                None => config.output.format,
            };
            if let Some(ontology) = ontology {
                config.normalizer.ontology_path = ontology;
            }
            config.ensure_default_ontology()?;

            let inputs = InputManager::new();
            let resume_input = inputs.load_resume(&resume)?;
            let job_description = inputs.load_job(&job)?;

            let graph_sink = graph_out
                .map(|path| Arc::new(JsonLinesGraphSink::new(path)) as Arc<dyn GraphSink>);
            let service = MatchService::from_config(&config, graph_sink)?;

            let profile = match resume_input {
                ResumeInput::Skills(list) => {
                    let skills = service
                        .pipeline()
                        .normalize_skill_names(&list.skills)?
                        .into_iter()
                        .map(|skill| ResumeSkill::from_normalized(skill, 1.0, CandidateSource::Manual))
                        .collect();
                    let resume_id = list.resume_id.unwrap_or_else(|| {
                        generate_resume_id(&resume.to_string_lossy())
                    });
                    let profile = ResumeProfile {
                        resume_id,
                        skills,
                        experience_years: list.experience_years,
                    };
                    service.register_resume(profile.clone());
                    profile
                }
                ResumeInput::Text { filename, text } => {
                    service.ingest_resume(&filename, &text, None)?
                }
            };

            let score = service.match_resume_to_job(&profile.resume_id, &job_description)?;
            let pipeline = service.pipeline();
            let contributions = pipeline
                .explainer()
                .score_contributions(&score, &pipeline.weights());

            let metadata = ReportMetadata::new(
                &profile.resume_id,
                &job_description.title,
                &format!("{:?}", config.embedding.backend).to_lowercase(),
            )
            .with_files(&resume.to_string_lossy(), &job.to_string_lossy())
            .with_processing_time(start_time.elapsed().as_millis() as u64);
            let report = MatchReport::new(score, contributions, metadata);

            let generator = ReportGenerator::with_options(
                config.output.color_output && save.is_none(),
                detailed || config.output.detailed,
                true,
                true,
            );
            let content = generator.generate_report(&report, &format)?;

            match save {
                Some(path) => {
                    save_report_to_file(&content, &path)?;
                    println!("{} Report saved to {}", "✓".green(), path.display());
                }
                None => println!("{}", content),
            }
            info!(
                "Match finished in {}ms",
                start_time.elapsed().as_millis()
            );
        }

        Commands::Normalize {
            skills,
            ontology,
            top_k,
            json,
        } => {
            if let Some(ontology) = ontology {
                config.normalizer.ontology_path = ontology;
            }
            config.ensure_default_ontology()?;
            let service = MatchService::from_config(&config, None)?;
            let normalizer = service.pipeline().normalizer().ok_or_else(|| {
                SkillFitError::Configuration("No skill normalizer configured".to_string())
            })?;
            let results = normalizer.normalize(&skills, top_k)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    let target = if result.matched {
                        format!("{} [{}]", result.canonical.green(), result.category)
                    } else {
                        "(no match)".yellow().to_string()
                    };
                    println!(
                        "{:<28} → {}  {:.1}%",
                        result.raw,
                        target,
                        result.similarity * 100.0
                    );
                }
            }
        }

        Commands::Config { action } => {
            let path = config_path.unwrap_or_else(Config::config_path);
            match action {
                Some(ConfigAction::Show) | None => {
                    println!("Current Configuration ({})\n", path.display());
                    println!(
                        "Embeddings: {:?} (dim {}, model {})",
                        config.embedding.backend, config.embedding.dimension, config.embedding.model
                    );
                    println!(
                        "Index: M={} ef_construction={} ef_search={} seed={}",
                        config.index.max_connections,
                        config.index.ef_construction,
                        config.index.ef_search,
                        config.index.seed
                    );
                    println!(
                        "Ontology: {} (threshold {:.2})",
                        config.normalizer.ontology_path.display(),
                        config.normalizer.similarity_threshold
                    );
                    println!("\nScoring Weights:");
                    println!("  Semantic: {:.1}%", config.scoring.weight_semantic * 100.0);
                    println!("  Graph: {:.1}%", config.scoring.weight_graph * 100.0);
                    println!("  Experience: {:.1}%", config.scoring.weight_experience * 100.0);
                    println!("  Match threshold: {:.2}", config.scoring.match_threshold);
                }

                Some(ConfigAction::Path) => {
                    println!("{}", path.display());
                }

                Some(ConfigAction::Reset) => {
                    Config::default().save_to(&path)?;
                    println!("{} Configuration reset: {}", "✓".green(), path.display());
                }
            }
        }
    }

    Ok(())
}
