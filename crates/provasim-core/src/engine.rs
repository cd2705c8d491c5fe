//! Attempt orchestrator.
//!
//! Loads the two reference tables once, generates the question list,
//! and runs statistics, skills, scoring, and the consistency check in
//! their dependency order. Everything after the loads is synchronous
//! over the resolved in-memory data; the consistency analysis waits on
//! the scorer's result.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::analyzer::{analyze_sequences, option_frequency, temporal_chunks, ResultsAnalyzer};
use crate::consistency;
use crate::error::ReferenceDataError;
use crate::generator::QuestionGenerator;
use crate::model::{AnswerSheet, ExamConfig};
use crate::report::AttemptReport;
use crate::scorer::{AbilityScorer, ScoreOutcome};
use crate::skills::{SkillCatalog, SkillsAnalyzer};
use crate::tables::ReferenceData;
use crate::traits::{ModelLoader, ReferenceSource};

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many preceding years model resolution may fall back to.
    pub fallback_depth: u16,
    /// Truncate consistency findings to the most surprising N.
    pub top_findings: Option<usize>,
    /// Substitute empty reference tables when loading fails instead of
    /// surfacing the error. Every question generates nullified;
    /// statistics still compute.
    pub allow_missing_reference: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_depth: 3,
            top_findings: Some(10),
            allow_missing_reference: false,
        }
    }
}

/// Runs complete attempts against a reference source and a model
/// loader. The model cache inside the scorer is shared across the
/// engine's lifetime.
pub struct AttemptEngine {
    reference: Arc<dyn ReferenceSource>,
    scorer: AbilityScorer,
    catalog: SkillCatalog,
    config: EngineConfig,
}

impl AttemptEngine {
    pub fn new(
        reference: Arc<dyn ReferenceSource>,
        models: Arc<dyn ModelLoader>,
        catalog: SkillCatalog,
        config: EngineConfig,
    ) -> Self {
        let scorer = AbilityScorer::new(models).with_fallback_depth(config.fallback_depth);
        Self {
            reference,
            scorer,
            catalog,
            config,
        }
    }

    /// Run one attempt end to end.
    pub async fn run(
        &self,
        exam: &ExamConfig,
        answers: &AnswerSheet,
    ) -> Result<AttemptReport, ReferenceDataError> {
        let start = Instant::now();

        let data = match self.reference.load_all().await {
            Ok(data) => data,
            Err(err) if self.config.allow_missing_reference => {
                tracing::warn!("reference data unavailable, running degraded: {err}");
                ReferenceData::empty()
            }
            Err(err) => return Err(err),
        };

        let generator = QuestionGenerator::new(&data);
        let questions = generator.generate(exam);

        let analyzer = ResultsAnalyzer::new(&data);
        let statistics = analyzer.calculate(exam.year, &questions, answers);
        let subjects = analyzer.by_subject(exam.year, &questions, answers);
        let patterns = analyzer.patterns(exam.year, &questions, answers);
        let sequences = analyze_sequences(&patterns.exam_order);
        let chunks = temporal_chunks(&patterns.exam_order);
        let options = option_frequency(&questions, answers);

        let skills =
            SkillsAnalyzer::new(&data).calculate(exam.year, &questions, answers, &self.catalog);

        let score = self
            .scorer
            .calculate_score(&data, exam, &questions, answers)
            .await;

        // Consistency needs the score; a failed score leaves the
        // statistics intact and the findings empty.
        let findings = match &score.outcome {
            ScoreOutcome::Scored { score: value, .. } => consistency::analyze(
                &data,
                exam.year,
                &questions,
                answers,
                *value,
                self.config.top_findings,
            ),
            ScoreOutcome::Failed { error } => {
                tracing::warn!("skipping consistency analysis: {error}");
                Vec::new()
            }
        };

        Ok(AttemptReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            exam: exam.clone(),
            questions,
            statistics,
            subjects,
            skills,
            patterns,
            sequences,
            chunks,
            option_frequency: options,
            score,
            consistency: findings,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
