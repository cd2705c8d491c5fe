//! Builds the ordered question list for an exam configuration.

use crate::mapper::PositionMapper;
use crate::model::{ExamConfig, ExamKind, Question, Subject};
use crate::tables::ReferenceData;

/// Generates the ordered question list for one attempt, delegating
/// per-item resolution to [`PositionMapper`].
#[derive(Debug, Clone, Copy)]
pub struct QuestionGenerator<'a> {
    mapper: PositionMapper<'a>,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(data: &'a ReferenceData) -> Self {
        Self {
            mapper: PositionMapper::new(data),
        }
    }

    pub fn mapper(&self) -> PositionMapper<'a> {
        self.mapper
    }

    /// The subjects active for a configuration. Day 1 swaps the
    /// default language slot for the configured language choice.
    pub fn active_subjects(config: &ExamConfig) -> Vec<Subject> {
        match config.kind {
            ExamKind::Day1 => vec![config.language_subject(), Subject::Ch],
            ExamKind::Day2 => vec![Subject::Cn, Subject::Mt],
            kind => kind.default_subjects().to_vec(),
        }
    }

    /// Generate all questions for the configuration, ascending by
    /// variant position.
    pub fn generate(&self, config: &ExamConfig) -> Vec<Question> {
        let subjects = Self::active_subjects(config);
        tracing::debug!(
            "generating {} questions for {} with subjects {subjects:?}",
            config.kind.positions().count(),
            config.kind
        );

        let mut questions: Vec<Question> = config
            .kind
            .positions()
            .filter_map(|position| {
                let subject = Self::subject_for_position(position, &subjects, config)?;
                Some(
                    self.mapper
                        .create_question(position, subject, config.color, config.year),
                )
            })
            .collect();

        // Range iteration already yields ascending order; the sort
        // guards future range reordering.
        questions.sort_by_key(|q| q.position);

        let nullified = questions.iter().filter(|q| q.nullified).count();
        tracing::info!(
            "generated {} questions ({nullified} nullified) for {} {} {}",
            questions.len(),
            config.year,
            config.kind,
            config.color
        );

        questions
    }

    /// Resolve which subject a variant position belongs to, or `None`
    /// when that subject is not part of the active set.
    fn subject_for_position(
        position: u16,
        subjects: &[Subject],
        config: &ExamConfig,
    ) -> Option<Subject> {
        let candidate = match position {
            1..=45 => {
                // The whole languages range carries the chosen
                // language; fall back to whichever variant the active
                // set includes.
                let chosen = config.language_subject();
                if subjects.contains(&chosen) {
                    chosen
                } else if subjects.contains(&Subject::Lc0) {
                    Subject::Lc0
                } else if subjects.contains(&Subject::Lc1) {
                    Subject::Lc1
                } else {
                    return None;
                }
            }
            46..=90 => Subject::Ch,
            91..=135 => Subject::Cn,
            136..=180 => Subject::Mt,
            _ => return None,
        };

        if subjects.contains(&candidate) {
            Some(candidate)
        } else {
            tracing::debug!("position {position} rejected: {candidate} not in active set");
            None
        }
    }
}
