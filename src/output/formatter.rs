//! Output formatters: console, JSON and Markdown renderings of a match report

use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::report::MatchReport;
use crate::processing::scoring::FitLabel;
use colored::{Color, Colorize};
use std::path::Path;

pub trait OutputFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Colored terminal output
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct MarkdownFormatter {
    include_metadata: bool,
}

/// Picks the formatter for a configured output format
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
}

fn fit_color(label: FitLabel) -> Color {
    match label {
        FitLabel::StrongFit => Color::Green,
        FitLabel::ModerateFit => Color::BrightGreen,
        FitLabel::PotentialFit => Color::Yellow,
        FitLabel::WeakFit => Color::Red,
    }
}

fn timestamp(report: &MatchReport) -> String {
    report
        .metadata
        .generated_at
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self {
            use_colors,
            detailed,
        }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let (prefix, color) = match level {
            1 => ("█", Color::Blue),
            2 => ("▓", Color::Green),
            _ => ("▒", Color::Yellow),
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_fit_badge(&self, label: FitLabel) -> String {
        let badge = label.as_str().to_uppercase();
        if self.use_colors {
            format!("[{}]", badge.color(fit_color(label)).bold())
        } else {
            format!("[{}]", badge)
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String> {
        let mut output = String::new();
        let score = &report.score;

        output.push_str(&self.format_header("SKILL FIT ANALYSIS", 1));
        output.push_str(&format!(
            "Resume: {} | Job: {}\nGenerated: {} | Processing time: {}ms\n",
            report.metadata.resume_id,
            report.metadata.job_title,
            timestamp(report),
            report.metadata.processing_time_ms
        ));

        output.push_str(&self.format_header("Summary", 2));
        output.push_str(&format!(
            "Overall Score: {}% {}\n",
            report.summary.overall_score_percentage,
            self.format_fit_badge(report.summary.fit_label)
        ));
        output.push_str(&format!(
            "Verdict: {}\n",
            self.colorize(&report.summary.verdict, Color::Cyan)
        ));

        output.push_str(&self.format_header("Score Breakdown", 3));
        for contribution in &report.contributions {
            output.push_str(&format!(
                "  {:<22}{:>5.1}%  (weight: {:.0}%)  → {:.1}%\n",
                format!("{}:", contribution.dimension),
                contribution.raw_score * 100.0,
                contribution.weight * 100.0,
                contribution.weighted_contribution * 100.0
            ));
        }

        output.push_str(&self.format_header("Matched Skills", 3));
        if score.matched_skills.is_empty() {
            output.push_str("  None\n");
        }
        for skill in &score.matched_skills {
            output.push_str(&format!(
                "  {} {} ({:.1}%)\n",
                self.colorize("✓", Color::Green),
                skill.skill,
                skill.similarity * 100.0
            ));
        }

        if !score.missing_skills.is_empty() {
            output.push_str(&self.format_header("Missing Skills", 3));
            for skill in &score.missing_skills {
                output.push_str(&format!("  {} {}\n", self.colorize("✗", Color::Red), skill));
            }
        }

        if !report.summary.strengths.is_empty() {
            output.push_str(&self.format_header("Strengths", 3));
            for strength in &report.summary.strengths {
                output.push_str(&format!("  + {}\n", strength));
            }
        }
        if !report.summary.improvement_areas.is_empty() {
            output.push_str(&self.format_header("Improvement Areas", 3));
            for area in &report.summary.improvement_areas {
                output.push_str(&format!("  - {}\n", area));
            }
        }

        if self.detailed && !score.explanation.is_empty() {
            output.push_str(&self.format_header("Explanation", 2));
            output.push_str(&score.explanation);
            output.push('\n');
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &MatchReport) -> Result<String> {
        let mut output = String::new();
        let score = &report.score;

        output.push_str(&format!(
            "# Skill Fit Report: {}\n\n",
            report.metadata.job_title
        ));

        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {} | **Processing Time:** {}ms\n",
                timestamp(report),
                report.metadata.processing_time_ms
            ));
            output.push_str(&format!(
                "**Resume:** `{}` | **Embeddings:** `{}`\n\n",
                report.metadata.resume_id, report.metadata.embedding_backend
            ));
        }

        output.push_str("## Summary\n\n");
        output.push_str(&format!(
            "**Overall Score:** {}% ({})\n\n",
            report.summary.overall_score_percentage, report.summary.fit_label
        ));
        output.push_str(&format!("**Verdict:** {}\n\n", report.summary.verdict));

        output.push_str("### Score Breakdown\n\n");
        output.push_str("| Dimension | Score | Weight | Contribution |\n");
        output.push_str("|-----------|-------|--------|--------------|\n");
        for contribution in &report.contributions {
            output.push_str(&format!(
                "| {} | {:.1}% | {:.0}% | {:.1}% |\n",
                contribution.dimension,
                contribution.raw_score * 100.0,
                contribution.weight * 100.0,
                contribution.weighted_contribution * 100.0
            ));
        }
        output.push('\n');

        output.push_str("## Matched Skills\n\n");
        if score.matched_skills.is_empty() {
            output.push_str("_None_\n");
        }
        for skill in &score.matched_skills {
            output.push_str(&format!("- {} ({:.1}%)\n", skill.skill, skill.similarity * 100.0));
        }
        output.push('\n');

        if !score.missing_skills.is_empty() {
            output.push_str("## Missing Skills\n\n");
            for skill in &score.missing_skills {
                output.push_str(&format!("- {}\n", skill));
            }
            output.push('\n');
        }

        if !score.explanation.is_empty() {
            output.push_str("## Explanation\n\n```text\n");
            output.push_str(&score.explanation);
            output.push_str("\n```\n");
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::with_options(true, false, true, true)
    }

    pub fn with_options(
        use_colors: bool,
        detailed: bool,
        pretty_json: bool,
        include_metadata: bool,
    ) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(pretty_json),
            markdown_formatter: MarkdownFormatter::new(include_metadata),
        }
    }

    pub fn generate_report(&self, report: &MatchReport, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
            OutputFormat::Markdown => self.markdown_formatter.format_report(report),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
}
