//! Filesystem model loader and the artifact naming convention.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use provasim_core::error::ModelLoadError;
use provasim_core::traits::{AbilityModel, ModelKey, ModelLoader};

use crate::artifact::{GbtAbilityModel, ModelArtifact};

/// Deterministic artifact file name for a model key.
///
/// `ability-model-{year}-{subject}.json`, with the language digit
/// appended for the shared languages family:
/// `ability-model-2023-LC-0.json`.
pub fn artifact_file_name(key: &ModelKey) -> String {
    match key.language {
        Some(language) => format!(
            "ability-model-{}-{}-{}.json",
            key.year,
            key.subject.code(),
            language.model_code()
        ),
        None => format!("ability-model-{}-{}.json", key.year, key.subject.code()),
    }
}

/// Loads model artifacts from a directory, one JSON file per key.
#[derive(Debug, Clone)]
pub struct FsModelLoader {
    root: PathBuf,
}

impl FsModelLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path for a key's artifact.
    pub fn artifact_path(&self, key: &ModelKey) -> PathBuf {
        self.root.join(artifact_file_name(key))
    }
}

#[async_trait]
impl ModelLoader for FsModelLoader {
    async fn load(&self, key: &ModelKey) -> Result<Arc<dyn AbilityModel>, ModelLoadError> {
        let path = self.artifact_path(key);
        let content = tokio::fs::read_to_string(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ModelLoadError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ModelLoadError::Io {
                    path: path.display().to_string(),
                    source: err,
                }
            }
        })?;

        let artifact: ModelArtifact =
            serde_json::from_str(&content).map_err(|err| ModelLoadError::Parse {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        artifact.validate().map_err(|message| ModelLoadError::Parse {
            path: path.display().to_string(),
            message,
        })?;

        let id = file_stem(&path);
        tracing::debug!("loaded model artifact {id} ({} trees)", artifact.trees.len());
        Ok(Arc::new(GbtAbilityModel::new(artifact, id)))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
