//! Position reconciliation between booklet color variants and the
//! canonical answer key, and the nullification rules built on it.
//!
//! A question is nullified iff its variant position has no canonical
//! mapping, or the mapping resolves to a canonical position with no
//! answer-key entry. Nullification is absorbed into the `Question`
//! itself and never aborts generation or statistics.

use crate::error::{MappingError, NullificationReason};
use crate::model::{ExamColor, OptionLetter, Question, Subject};
use crate::tables::ReferenceData;

/// Outcome of the nullification check for one variant position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionStatus {
    /// Mapped and present in the answer key.
    Valid { canonical: u16 },
    /// Excluded from canonical scoring. `canonical` is kept when the
    /// mapping itself succeeded but the answer key had no entry.
    Nullified {
        canonical: Option<u16>,
        reason: NullificationReason,
    },
}

/// Result of checking a user's response against one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCheck {
    pub is_correct: bool,
    pub explanation: String,
}

/// Translates variant positions to canonical positions and classifies
/// nullified items against the loaded reference tables.
#[derive(Debug, Clone, Copy)]
pub struct PositionMapper<'a> {
    data: &'a ReferenceData,
}

impl<'a> PositionMapper<'a> {
    pub fn new(data: &'a ReferenceData) -> Self {
        Self { data }
    }

    /// Map a position in the chosen color variant to the canonical
    /// position the answer key uses.
    pub fn map_to_canonical(
        &self,
        position: u16,
        subject: Subject,
        color: ExamColor,
        year: u16,
    ) -> Result<u16, MappingError> {
        let canonical = self
            .data
            .positions
            .variant_to_canonical(year, subject, color, position)?;
        tracing::debug!("mapped {subject} {color} position {position} to canonical {canonical}");
        Ok(canonical)
    }

    /// Decide whether the question at this variant position is
    /// nullified: unmapped positions and mapped positions without an
    /// answer-key entry both are.
    pub fn check_nullified(
        &self,
        position: u16,
        subject: Subject,
        color: ExamColor,
        year: u16,
    ) -> QuestionStatus {
        let canonical = match self.map_to_canonical(position, subject, color, year) {
            Ok(canonical) => canonical,
            Err(err) => {
                return QuestionStatus::Nullified {
                    canonical: None,
                    reason: err.into(),
                }
            }
        };

        if self.data.answer_keys.entry(year, subject, canonical).is_none() {
            return QuestionStatus::Nullified {
                canonical: Some(canonical),
                reason: NullificationReason::NoAnswerKey { canonical },
            };
        }

        QuestionStatus::Valid { canonical }
    }

    /// The correct option for a question, or `None` when nullified.
    ///
    /// An answer-key entry whose answer field is empty resolves to the
    /// letter at `canonical % 5`. This is a data-quality quirk carried
    /// over from the published keys, not a general guarantee; tests pin
    /// it byte-for-byte.
    pub fn correct_answer(&self, question: &Question, year: u16) -> Option<OptionLetter> {
        if question.nullified {
            return None;
        }

        let canonical = question.canonical_or_position();
        let entry = self
            .data
            .answer_keys
            .entry(year, question.subject, canonical)?;

        match entry.answer {
            Some(letter) => Some(letter),
            None => {
                tracing::warn!(
                    "answer key entry for {} canonical {canonical} has no answer, using positional fallback",
                    question.subject
                );
                Some(OptionLetter::from_index(canonical as usize))
            }
        }
    }

    /// Check a user's response against the question.
    ///
    /// Nullified items credit any non-blank response and fail a blank
    /// one; valid items are exact-match against [`Self::correct_answer`].
    pub fn check_answer(
        &self,
        question: &Question,
        year: u16,
        response: Option<OptionLetter>,
    ) -> AnswerCheck {
        if question.nullified {
            return match response {
                Some(_) => AnswerCheck {
                    is_correct: true,
                    explanation: "nullified question, any response counts as correct".into(),
                },
                None => AnswerCheck {
                    is_correct: false,
                    explanation: "nullified question, not answered".into(),
                },
            };
        }

        let Some(correct) = self.correct_answer(question, year) else {
            return AnswerCheck {
                is_correct: false,
                explanation: "no answer available".into(),
            };
        };

        match response {
            None => AnswerCheck {
                is_correct: false,
                explanation: "not answered".into(),
            },
            Some(given) if given == correct => AnswerCheck {
                is_correct: true,
                explanation: format!("correct: {given}"),
            },
            Some(given) => AnswerCheck {
                is_correct: false,
                explanation: format!("incorrect: {given}, expected {correct}"),
            },
        }
    }

    /// Compose the mapping and nullification checks into one question
    /// object, the unit handed upward to the generator.
    pub fn create_question(
        &self,
        position: u16,
        subject: Subject,
        color: ExamColor,
        year: u16,
    ) -> Question {
        match self.check_nullified(position, subject, color, year) {
            QuestionStatus::Valid { canonical } => Question {
                position,
                canonical_position: Some(canonical),
                subject,
                nullified: false,
                nullified_reason: None,
                color,
            },
            QuestionStatus::Nullified { canonical, reason } => Question {
                position,
                canonical_position: canonical,
                subject,
                nullified: true,
                nullified_reason: Some(reason),
                color,
            },
        }
    }
}
