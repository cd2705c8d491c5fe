//! Filesystem reference source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use provasim_core::error::ReferenceDataError;
use provasim_core::skills::SkillCatalog;
use provasim_core::tables::{AnswerKeyTable, PositionTable};
use provasim_core::traits::ReferenceSource;

use crate::{ANSWER_KEYS_FILE, POSITIONS_FILE};

/// Loads the two reference tables from JSON files in a data
/// directory.
#[derive(Debug, Clone)]
pub struct FsReferenceSource {
    positions_path: PathBuf,
    answer_keys_path: PathBuf,
}

impl FsReferenceSource {
    /// Source reading `positions.json` and `meta.json` from `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            positions_path: dir.join(POSITIONS_FILE),
            answer_keys_path: dir.join(ANSWER_KEYS_FILE),
        }
    }

    /// Source with explicit file paths.
    pub fn with_paths(positions: impl Into<PathBuf>, answer_keys: impl Into<PathBuf>) -> Self {
        Self {
            positions_path: positions.into(),
            answer_keys_path: answer_keys.into(),
        }
    }

    async fn load_table<T: DeserializeOwned>(
        path: &Path,
        table: &'static str,
    ) -> Result<T, ReferenceDataError> {
        let location = path.display().to_string();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|err| ReferenceDataError::Load {
                    table,
                    location: location.clone(),
                    reason: err.to_string(),
                })?;
        tracing::debug!("loaded {table} from {location} ({} bytes)", content.len());

        serde_json::from_str(&content).map_err(|err| ReferenceDataError::Parse {
            table,
            location,
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl ReferenceSource for FsReferenceSource {
    async fn load_positions(&self) -> Result<PositionTable, ReferenceDataError> {
        Self::load_table(&self.positions_path, "positions").await
    }

    async fn load_answer_keys(&self) -> Result<AnswerKeyTable, ReferenceDataError> {
        Self::load_table(&self.answer_keys_path, "answer keys").await
    }
}

/// Load the skill-description catalog from a JSON file, falling back
/// to the built-in defaults when the file is absent or unreadable.
pub async fn load_skill_catalog(path: Option<&Path>) -> SkillCatalog {
    let Some(path) = path else {
        return SkillCatalog::default_descriptions();
    };

    match tokio::fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(
                    "invalid skill catalog {}: {err}, using defaults",
                    path.display()
                );
                SkillCatalog::default_descriptions()
            }
        },
        Err(err) => {
            tracing::warn!(
                "could not read skill catalog {}: {err}, using defaults",
                path.display()
            );
            SkillCatalog::default_descriptions()
        }
    }
}
