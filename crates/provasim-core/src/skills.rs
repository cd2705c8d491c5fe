//! Per-skill competency breakdown.
//!
//! Only non-nullified questions participate: a nullified item has no
//! answer-key entry and therefore no skill code by construction.
//! Missing metadata for a mapped position is logged and skipped, never
//! fatal.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::mapper::PositionMapper;
use crate::model::{AnswerSheet, Question, Subject};
use crate::tables::ReferenceData;

/// Performance band for a skill percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    Poor,
}

impl Default for PerformanceLevel {
    fn default() -> Self {
        PerformanceLevel::Poor
    }
}

impl PerformanceLevel {
    pub fn from_percentage(percentage: u8) -> Self {
        if percentage >= 80 {
            PerformanceLevel::Excellent
        } else if percentage >= 65 {
            PerformanceLevel::Good
        } else if percentage >= 50 {
            PerformanceLevel::Average
        } else {
            PerformanceLevel::Poor
        }
    }
}

/// Counts for one (subject, skill) group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillStats {
    pub total: u32,
    pub correct: u32,
    pub wrong: u32,
    pub blank: u32,
    /// Percentage of correct answers over the skill's total item
    /// count; blanks count against it.
    pub percentage: u8,
    pub level: PerformanceLevel,
    /// Human-readable description from the catalog, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Skill statistics grouped by subject, then skill code.
pub type SkillsReport = BTreeMap<Subject, BTreeMap<u8, SkillStats>>;

/// Catalog of skill descriptions, keyed `"{subject}_H{skill}"`.
///
/// Owned explicitly by whoever runs the report rather than living in a
/// process-wide global; `provasim-data` loads the override file and
/// falls back to [`SkillCatalog::default_descriptions`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillCatalog {
    descriptions: HashMap<String, String>,
}

impl SkillCatalog {
    pub fn new(descriptions: HashMap<String, String>) -> Self {
        Self { descriptions }
    }

    /// Built-in descriptions covering the first skills of each
    /// subject, used when no catalog file is available.
    pub fn default_descriptions() -> Self {
        let mut descriptions = HashMap::new();
        for (key, text) in [
            ("MT_H1", "Construct meanings for natural and real numbers."),
            ("MT_H2", "Apply geometric knowledge to real-world measures."),
            ("CH_H1", "Interpret cultural elements across historical periods."),
            ("CH_H2", "Analyze transformations of geographic space."),
            ("CN_H1", "Recognize characteristics and properties of matter."),
            ("CN_H2", "Relate technology use to natural phenomena."),
            ("LC0_H1", "Apply communication technologies in English contexts."),
            ("LC0_H2", "Interpret texts written in modern English."),
            ("LC1_H1", "Apply communication technologies in Spanish contexts."),
            ("LC1_H2", "Interpret texts written in modern Spanish."),
        ] {
            descriptions.insert(key.to_string(), text.to_string());
        }
        Self { descriptions }
    }

    pub fn description(&self, subject: Subject, skill: u8) -> Option<&str> {
        self.descriptions
            .get(&format!("{}_H{skill}", subject.code()))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

/// Builds the per-skill breakdown for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct SkillsAnalyzer<'a> {
    data: &'a ReferenceData,
    mapper: PositionMapper<'a>,
}

impl<'a> SkillsAnalyzer<'a> {
    pub fn new(data: &'a ReferenceData) -> Self {
        Self {
            data,
            mapper: PositionMapper::new(data),
        }
    }

    pub fn calculate(
        &self,
        year: u16,
        questions: &[Question],
        answers: &AnswerSheet,
        catalog: &SkillCatalog,
    ) -> SkillsReport {
        let mut report: SkillsReport = BTreeMap::new();

        for question in questions {
            if question.nullified {
                continue;
            }

            let Some(canonical) = question.canonical_position else {
                continue;
            };
            let Some(entry) = self.data.answer_keys.entry(year, question.subject, canonical)
            else {
                tracing::warn!(
                    "no metadata for {} canonical {canonical}, skipping in skills report",
                    question.subject
                );
                continue;
            };
            let Some(skill) = entry.skill else {
                tracing::warn!(
                    "no skill code for {} canonical {canonical}, skipping in skills report",
                    question.subject
                );
                continue;
            };

            let stats = report
                .entry(question.subject)
                .or_default()
                .entry(skill)
                .or_default();
            stats.total += 1;

            let response = answers.answer(question.position);
            match response {
                None => stats.blank += 1,
                Some(_) => {
                    if self.mapper.check_answer(question, year, response).is_correct {
                        stats.correct += 1;
                    } else {
                        stats.wrong += 1;
                    }
                }
            }
        }

        for (subject, skills) in report.iter_mut() {
            for (&skill, stats) in skills.iter_mut() {
                let percentage = if stats.total > 0 {
                    (f64::from(stats.correct) / f64::from(stats.total) * 100.0).round() as u8
                } else {
                    0
                };
                stats.percentage = percentage;
                stats.level = PerformanceLevel::from_percentage(percentage);
                stats.description = catalog.description(*subject, skill).map(str::to_string);
            }
        }

        report
    }
}
