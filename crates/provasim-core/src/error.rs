//! Error taxonomy for the scoring core.
//!
//! Data-sparsity failures (missing mappings or answer-key entries) are
//! domain state, not errors: they become a question's nullified reason
//! and are serialized into reports. Scoring-pipeline failures are
//! returned as values inside [`crate::scorer::ScoreReport`] so callers
//! can still show statistics when the score is unavailable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ExamColor, ExamKind, ModelSubject, Subject};

/// Why a variant position could not be mapped to a canonical position.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingError {
    /// The position table has no data for the requested year.
    #[error("no position data for year {year}")]
    UnknownYear { year: u16 },

    /// The year exists but the subject table is absent.
    #[error("subject {subject} not present in year {year}")]
    UnknownSubject { year: u16, subject: Subject },

    /// A color name outside the known booklet set was requested.
    #[error("'{color}' is not a known booklet color")]
    UnknownColor { color: String },

    /// No canonical entry lists this variant position for the color.
    #[error("position {position} has no {color} mapping in {subject} {year}")]
    NoMatch {
        position: u16,
        subject: Subject,
        color: ExamColor,
        year: u16,
    },
}

/// Why a question was excluded from canonical scoring.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NullificationReason {
    /// The variant position never mapped to a canonical position.
    #[error("no mapping: {0}")]
    Unmapped(#[from] MappingError),

    /// The mapping resolved, but the answer key has no entry there.
    #[error("no answer key entry at canonical position {canonical}")]
    NoAnswerKey { canonical: u16 },
}

/// Why an ability score could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ScoreError {
    /// Composite day configurations cover more than one scoring
    /// subject and are not scored as a single attempt.
    #[error("{kind} spans multiple subjects and cannot be scored as one attempt")]
    CompositeKind { kind: ExamKind },

    /// The attempt has no questions for the target subject.
    #[error("no {subject} questions available to score")]
    NoQuestions { subject: ModelSubject },

    /// No model resolved for the requested year or any fallback year.
    #[error("no ability model for {subject} year {year} (fallbacks exhausted)")]
    ModelNotFound { subject: ModelSubject, year: u16 },

    /// A model artifact was found but failed its self-test probe.
    #[error("ability model for {subject} year {year} is corrupted or incompatible")]
    ModelInvalid { subject: ModelSubject, year: u16 },
}

/// Failure loading a single model artifact. Any variant is treated as
/// "not usable" by the fallback chain.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// No artifact exists for the key's file name.
    #[error("model artifact not found: {path}")]
    NotFound { path: String },

    /// The artifact exists but could not be read.
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The artifact exists but is not a valid model definition.
    #[error("failed to parse model artifact {path}: {message}")]
    Parse { path: String, message: String },

    /// The model loaded but returned a non-finite probe score.
    #[error("model {id} failed its self-test probe")]
    FailedProbe { id: String },
}

impl ModelLoadError {
    /// True when the artifact was present but unusable, as opposed to
    /// simply missing.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ModelLoadError::Parse { .. } | ModelLoadError::FailedProbe { .. }
        )
    }
}

/// Failure fetching or decoding one of the two reference tables.
/// Fatal to starting an attempt; callers may substitute
/// [`crate::tables::ReferenceData::empty`] to run degraded.
#[derive(Debug, Error)]
pub enum ReferenceDataError {
    /// The table could not be fetched or read.
    #[error("failed to load {table} from {location}: {reason}")]
    Load {
        table: &'static str,
        location: String,
        reason: String,
    },

    /// The table was fetched but is not valid JSON of the expected
    /// shape.
    #[error("failed to parse {table} from {location}: {reason}")]
    Parse {
        table: &'static str,
        location: String,
        reason: String,
    },
}
