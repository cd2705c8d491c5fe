//! provasim-models — ability-model artifacts.
//!
//! Models are gradient-boosted-tree ensembles serialized as JSON in
//! the flattened array layout tree dumps use. Each artifact covers one
//! (year, subject, language) key and is discovered by a deterministic
//! file name derived from that key.

pub mod artifact;
pub mod loader;

pub use artifact::{GbtAbilityModel, ModelArtifact, Tree};
pub use loader::{artifact_file_name, FsModelLoader};
