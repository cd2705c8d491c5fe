//! Core trait definitions for reference-data sources and ability
//! models.
//!
//! These async traits are implemented by the `provasim-data` and
//! `provasim-models` crates respectively; the core only consumes them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ModelLoadError, ReferenceDataError};
use crate::model::{Language, ModelSubject};
use crate::tables::{AnswerKeyTable, PositionTable, ReferenceData};

// ---------------------------------------------------------------------------
// Reference data source
// ---------------------------------------------------------------------------

/// One-shot asynchronous source of the two reference tables.
///
/// Loading happens once at attempt start; everything downstream runs
/// synchronously over the resolved in-memory tables.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Load the position table.
    async fn load_positions(&self) -> Result<PositionTable, ReferenceDataError>;

    /// Load the answer-key table.
    async fn load_answer_keys(&self) -> Result<AnswerKeyTable, ReferenceDataError>;

    /// Load both tables concurrently.
    async fn load_all(&self) -> Result<ReferenceData, ReferenceDataError> {
        let (positions, answer_keys) =
            futures::try_join!(self.load_positions(), self.load_answer_keys())?;
        Ok(ReferenceData::new(positions, answer_keys))
    }
}

// ---------------------------------------------------------------------------
// Ability models
// ---------------------------------------------------------------------------

/// Cache and lookup key for one predictive model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub year: u16,
    pub subject: ModelSubject,
    pub language: Option<Language>,
}

impl ModelKey {
    pub fn new(year: u16, subject: ModelSubject, language: Option<Language>) -> Self {
        Self {
            year,
            subject,
            language,
        }
    }

    /// The same key pointed at a different year. Used by the fallback
    /// chain.
    pub fn with_year(self, year: u16) -> Self {
        Self { year, ..self }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.language {
            Some(lang) => write!(f, "{}-{}-{}", self.year, self.subject, lang.model_code()),
            None => write!(f, "{}-{}", self.year, self.subject),
        }
    }
}

/// A resolved predictive model: a pure function from a 45-length
/// binary response pattern to a numeric score.
pub trait AbilityModel: Send + Sync + fmt::Debug {
    /// Stable identifier, typically the artifact file stem.
    fn identifier(&self) -> &str;

    /// Predict a score for a difficulty-ordered binary pattern.
    ///
    /// Callers guarantee `pattern.len()` equals
    /// [`crate::scorer::PATTERN_LEN`].
    fn predict(&self, pattern: &[u8]) -> f64;
}

/// Loader for model artifacts, one per [`ModelKey`].
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the model for exactly this key. Fallback across years is
    /// the scorer's job, not the loader's.
    async fn load(&self, key: &ModelKey) -> Result<Arc<dyn AbilityModel>, ModelLoadError>;
}
