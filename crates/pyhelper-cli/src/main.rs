use clap::{Parser, Subcommand};
use pyhelper_core::{ConfigManager, HelperConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "pyhelper")]
#[command(about = "pyhelper - Python code analysis and safe auto-fixing")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to discovery of pyhelper.toml)
    #[arg(long, global = true, env = "PYHELPER_CONFIG")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report issues found in a Python file
    Analyze {
        #[arg(help = "Python file to analyze")]
        file: PathBuf,
    },

    /// Insert missing docstrings
    Fix {
        #[arg(help = "Python file to fix")]
        file: PathBuf,

        /// Print the patched text instead of writing it
        #[arg(long)]
        dry_run: bool,

        /// Restrict fixing to these rules (code or name)
        #[arg(long, value_name = "RULE", num_args = 1..)]
        only: Vec<String>,
    },

    /// Count issues by severity
    Stats {
        #[arg(help = "Python file to analyze")]
        file: PathBuf,
    },

    /// List the rule table
    Rules,

    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
}

fn init_logging(config: &HelperConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let json = config.logging.json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path).await?,
        None => ConfigManager::auto_discover().await?,
    };
    let config = manager.get_config().await;
    init_logging(&config);

    let output = commands::Output { json: cli.json };

    match cli.command {
        Commands::Analyze { file } => commands::analyze(config, &file, output).await,
        Commands::Fix {
            file,
            dry_run,
            only,
        } => commands::fix(config, &file, dry_run, &only, output).await,
        Commands::Stats { file } => commands::stats(config, &file, output).await,
        Commands::Rules => commands::rules(&config, output),
        Commands::Config(ConfigCommands::Show) => commands::show_config(&config, output),
    }
}
