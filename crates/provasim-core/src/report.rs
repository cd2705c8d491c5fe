//! Attempt report with JSON persistence.
//!
//! The report is the collaborator-facing bundle of everything one
//! attempt produced: plain serializable data, no behavior beyond
//! persistence.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analyzer::{
    OptionFrequency, ResponsePatterns, SequenceSummary, Statistics, TemporalChunk,
};
use crate::consistency::ConsistencyFinding;
use crate::model::{ExamConfig, Question, Subject};
use crate::scorer::ScoreReport;
use crate::skills::SkillsReport;

/// Everything computed for one exam attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Unique attempt identifier.
    pub id: Uuid,
    /// When the report was produced.
    pub created_at: DateTime<Utc>,
    /// The configuration the attempt ran under.
    pub exam: ExamConfig,
    /// The generated question list, nullification included.
    pub questions: Vec<Question>,
    /// Aggregate statistics over all questions.
    pub statistics: Statistics,
    /// The same statistics grouped by subject.
    pub subjects: BTreeMap<Subject, Statistics>,
    /// Per-skill competency breakdown.
    pub skills: SkillsReport,
    /// Diagnostic pattern encodings.
    pub patterns: ResponsePatterns,
    /// Streak summary over the exam-order pattern.
    pub sequences: SequenceSummary,
    /// Fixed-size pacing chunks.
    pub chunks: Vec<TemporalChunk>,
    /// Chosen-option distribution.
    pub option_frequency: OptionFrequency,
    /// Ability score, or the structured reason there is none.
    pub score: ScoreReport,
    /// Outcomes diverging from the 3PL prediction, most surprising
    /// first. Empty when scoring failed.
    pub consistency: Vec<ConsistencyFinding>,
    /// Wall-clock duration of the attempt computation.
    pub duration_ms: u64,
}

impl AttemptReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}
