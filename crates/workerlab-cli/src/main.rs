//! workerlab CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "workerlab",
    version,
    about = "Sandboxed runner and grader for fetch-handler exercises"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP run/grade API
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        listen: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a module once against a single request
    Run {
        /// Path to the module source
        #[arg(long)]
        code: PathBuf,

        /// HTTP method (default: GET)
        #[arg(long)]
        method: Option<String>,

        /// Request path, including any query string
        #[arg(long, default_value = "/")]
        path: String,

        /// Request body
        #[arg(long)]
        body: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Grade a submission against an exercise's tests
    Check {
        /// Path to an exercise .toml file or directory
        #[arg(long)]
        exercise: PathBuf,

        /// Submission to grade (default: the exercise's solution)
        #[arg(long)]
        code: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate exercise TOML files
    Validate {
        /// Path to an exercise file or directory
        #[arg(long)]
        exercise: PathBuf,
    },

    /// Create starter config and an example exercise
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("workerlab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { listen, config } => commands::serve::execute(listen, config).await,
        Commands::Run {
            code,
            method,
            path,
            body,
            config,
        } => commands::run::execute(code, method, path, body, config).await,
        Commands::Check {
            exercise,
            code,
            config,
        } => commands::check::execute(exercise, code, config).await,
        Commands::Validate { exercise } => commands::validate::execute(exercise),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
