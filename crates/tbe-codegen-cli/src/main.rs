use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

/// Top-level CLI argument parser for the `tbe-codegen` command
#[derive(Parser)]
#[command(
    name = "tbe-codegen",
    about = "tbe-codegen — embedding backward kernel source generator",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands for the `tbe-codegen` CLI
#[derive(Subcommand)]
enum Commands {
    /// Render every planned artifact into the output directory
    Generate {
        /// Path to the optimizer catalogue YAML
        #[arg(long, default_value = "codegen/catalogue.yaml")]
        catalogue: PathBuf,
        /// Template root directory
        #[arg(long, default_value = "templates")]
        templates: PathBuf,
        /// Output directory for generated files
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,
    },
    /// List every planned output without rendering
    Plan {
        /// Path to the optimizer catalogue YAML
        #[arg(long, default_value = "codegen/catalogue.yaml")]
        catalogue: PathBuf,
        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Validate the optimizer catalogue
    Validate {
        /// Path to the optimizer catalogue YAML
        #[arg(long, default_value = "codegen/catalogue.yaml")]
        catalogue: PathBuf,
    },
    /// Print both auxiliary-argument schema forms
    Schema {
        /// Path to the optimizer catalogue YAML
        #[arg(long, default_value = "codegen/catalogue.yaml")]
        catalogue: PathBuf,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Self::Generate {
            catalogue: PathBuf::from("codegen/catalogue.yaml"),
            templates: PathBuf::from("templates"),
            output: PathBuf::from("generated"),
        }
    }
}

/// Dispatch a parsed CLI subcommand to its handler
fn run_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Generate {
            catalogue,
            templates,
            output,
        } => commands::generate::run(&catalogue, &templates, &output),
        Commands::Plan { catalogue, format } => commands::plan::run(&catalogue, &format),
        Commands::Validate { catalogue } => commands::validate::run(&catalogue),
        Commands::Schema { catalogue } => commands::schema::run(&catalogue),
    }
}

/// Entry point: parse CLI arguments and run the selected subcommand
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_command(cli.command.unwrap_or_default()) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
