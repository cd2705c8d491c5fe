//! The `provasim run` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use provasim_core::engine::{AttemptEngine, EngineConfig};
use provasim_core::model::{AnswerSheet, ExamConfig, ExamKind};
use provasim_core::report::AttemptReport;
use provasim_core::scorer::ScoreOutcome;
use provasim_core::traits::ReferenceSource;
use provasim_data::{load_config_from, load_skill_catalog, FsReferenceSource, HttpReferenceSource};
use provasim_models::FsModelLoader;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    year: u16,
    exam: String,
    color: String,
    language: Option<String>,
    answers_path: PathBuf,
    data_dir: Option<PathBuf>,
    models_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    top: Option<usize>,
    allow_missing_data: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = models_dir {
        config.models_dir = dir;
    }
    if let Some(dir) = output {
        config.output_dir = dir;
    }
    if let Some(top) = top {
        config.top_findings = top;
    }

    // Unsupported kind codes deliberately fall back instead of failing.
    let kind = ExamKind::parse_lenient(&exam);
    let exam_config = ExamConfig {
        year,
        kind,
        color: color
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{e}"))?,
        language: language
            .map(|l| l.parse().map_err(|e: String| anyhow::anyhow!("{e}")))
            .transpose()?,
    };

    let content = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answer sheet: {}", answers_path.display()))?;
    let answers: AnswerSheet = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answer sheet: {}", answers_path.display()))?;

    let reference: Arc<dyn ReferenceSource> = match &config.reference_url {
        Some(url) => Arc::new(HttpReferenceSource::new(url.clone())),
        None => Arc::new(FsReferenceSource::new(&config.data_dir)),
    };
    let models = Arc::new(FsModelLoader::new(&config.models_dir));
    let catalog = load_skill_catalog(config.skill_catalog.as_deref()).await;

    let engine = AttemptEngine::new(
        reference,
        models,
        catalog,
        EngineConfig {
            fallback_depth: config.fallback_depth,
            top_findings: Some(config.top_findings),
            allow_missing_reference: allow_missing_data,
        },
    );

    eprintln!(
        "provasim v0.1.0 — {} {} ({}), {} answers",
        year,
        kind,
        exam_config.color,
        answers.len()
    );

    let report = engine.run(&exam_config, &answers).await?;

    print_summary(&report);

    std::fs::create_dir_all(&config.output_dir)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = config.output_dir.join(format!("attempt-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Report saved to: {}", path.display());

    Ok(())
}

fn print_summary(report: &AttemptReport) {
    let mut table = Table::new();
    table.set_header(vec![
        "Subject",
        "Total",
        "Correct",
        "Wrong",
        "Blank",
        "Nullified",
        "Accuracy",
    ]);

    for (subject, stats) in &report.subjects {
        table.add_row(vec![
            Cell::new(subject.display_name()),
            Cell::new(stats.total),
            Cell::new(stats.correct),
            Cell::new(stats.wrong),
            Cell::new(stats.blank),
            Cell::new(stats.nullified_answered + stats.nullified_blank),
            Cell::new(format!("{:.1}%", stats.accuracy)),
        ]);
    }
    let overall = &report.statistics;
    table.add_row(vec![
        Cell::new("Overall"),
        Cell::new(overall.total),
        Cell::new(overall.correct),
        Cell::new(overall.wrong),
        Cell::new(overall.blank),
        Cell::new(overall.nullified_answered + overall.nullified_blank),
        Cell::new(format!("{:.1}%", overall.accuracy)),
    ]);

    eprintln!("\n{table}");

    match &report.score.outcome {
        ScoreOutcome::Scored {
            score, model_id, ..
        } => {
            eprintln!("\nAbility score: {score} (model {model_id})");
        }
        ScoreOutcome::Failed { error } => {
            eprintln!("\nNo ability score: {error}");
        }
    }

    if !report.consistency.is_empty() {
        let mut findings = Table::new();
        findings.set_header(vec!["Question", "Predicted", "Outcome", "Verdict"]);
        for finding in &report.consistency {
            findings.add_row(vec![
                Cell::new(finding.position),
                Cell::new(format!("{:.1}%", finding.probability * 100.0)),
                Cell::new(if finding.is_correct { "correct" } else { "wrong" }),
                Cell::new(format!("{:?}", finding.verdict)),
            ]);
        }
        eprintln!("\nMost surprising outcomes:\n{findings}");
    }
}
