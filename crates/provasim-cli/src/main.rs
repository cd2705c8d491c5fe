//! provasim CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "provasim", version, about = "Simulated admission-exam scoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an attempt from an answer sheet
    Run {
        /// Exam edition year
        #[arg(long)]
        year: u16,

        /// Exam kind: LC0, LC1, CH, CN, MT, day1, day2
        #[arg(long)]
        exam: String,

        /// Booklet color: azul, amarela, branca, rosa, verde, cinza
        #[arg(long, default_value = "azul")]
        color: String,

        /// Foreign language for the languages range: english, spanish
        #[arg(long)]
        language: Option<String>,

        /// Path to the answer sheet JSON ({"1": "A", ...})
        #[arg(long)]
        answers: PathBuf,

        /// Directory with positions.json and meta.json
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory with model artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Output directory for the attempt report
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show the N most surprising consistency findings
        #[arg(long)]
        top: Option<usize>,

        /// Run with empty tables when reference data is missing
        #[arg(long)]
        allow_missing_data: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate reference data files
    Validate {
        /// Directory with positions.json and meta.json
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and an example answer sheet
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("provasim=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            year,
            exam,
            color,
            language,
            answers,
            data_dir,
            models_dir,
            output,
            top,
            allow_missing_data,
            config,
        } => {
            commands::run::execute(
                year,
                exam,
                color,
                language,
                answers,
                data_dir,
                models_dir,
                output,
                top,
                allow_missing_data,
                config,
            )
            .await
        }
        Commands::Validate { data_dir, config } => {
            commands::validate::execute(data_dir, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
