//! The `provasim init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("provasim.toml").exists() {
        println!("provasim.toml already exists, skipping.");
    } else {
        std::fs::write("provasim.toml", SAMPLE_CONFIG)?;
        println!("Created provasim.toml");
    }

    std::fs::create_dir_all("answers")?;
    let example_path = std::path::Path::new("answers/example.json");
    if example_path.exists() {
        println!("answers/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_ANSWERS)?;
        println!("Created answers/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Put positions.json and meta.json in ./data");
    println!("  2. Run: provasim validate");
    println!("  3. Run: provasim run --year 2023 --exam MT --answers answers/example.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# provasim configuration

# Directory holding positions.json and meta.json
data_dir = "./data"

# Directory holding ability-model artifacts
models_dir = "./models"

# Where attempt reports are written
output_dir = "./provasim-results"

# How many preceding years model resolution may fall back to
fallback_depth = 3

# Consistency findings shown per attempt
top_findings = 10

# Fetch reference data over HTTP instead of data_dir:
# reference_url = "https://example.org/exam-data"
"#;

const EXAMPLE_ANSWERS: &str = r#"{
  "136": "A",
  "137": "B",
  "138": "C",
  "139": "D",
  "140": "E"
}
"#;
