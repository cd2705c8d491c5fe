//! The `provasim validate` command.

use std::path::PathBuf;

use anyhow::Result;

use provasim_core::traits::ReferenceSource;
use provasim_core::validate::validate_reference;
use provasim_data::{load_config_from, FsReferenceSource};

pub async fn execute(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }

    let source = FsReferenceSource::new(&config.data_dir);
    let data = source.load_all().await?;

    let mut years: Vec<u16> = data.positions.years().collect();
    years.sort_unstable();
    println!(
        "Reference data: {} year(s) of positions ({:?})",
        years.len(),
        years
    );

    let warnings = validate_reference(&data);
    for w in &warnings {
        println!("  [{}] WARNING: {}", w.context, w.message);
    }

    if warnings.is_empty() {
        println!("Reference data valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
