//! provasim-data — reference-data sources and configuration.
//!
//! Implements the core's [`provasim_core::traits::ReferenceSource`]
//! over the filesystem and HTTP, loads the skill-description catalog,
//! and provides the `provasim.toml` configuration layer.

pub mod config;
pub mod fs;
pub mod http;

pub use config::{load_config, load_config_from, ProvasimConfig};
pub use fs::{load_skill_catalog, FsReferenceSource};
pub use http::HttpReferenceSource;

/// File name of the position table inside a data directory or under a
/// base URL.
pub const POSITIONS_FILE: &str = "positions.json";

/// File name of the answer-key table.
pub const ANSWER_KEYS_FILE: &str = "meta.json";
