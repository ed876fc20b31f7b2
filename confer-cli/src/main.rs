//! Confer CLI - Command line interface for Confer
//!
//! Multi-agent conversation over a research paper index and a code repository.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use confer_core::{CliOverrides, Config, Strategy};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ChatArgs, ServeArgs, SummariesArgs};

/// Confer: a supervisor that delegates to research and code agents
#[derive(Parser, Debug)]
#[command(name = "confer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/confer/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model endpoint base address (overrides config and env)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Key for the model endpoint (overrides config and env)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model to use (overrides config and env)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Durable store address, `sqlite://...` or a file path
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Never use the durable store
    #[arg(long, global = true)]
    no_database: bool,

    /// Directory for the flat-file summary cache
    #[arg(long, global = true)]
    summary_cache_dir: Option<PathBuf>,

    /// Controller design: supervisor, structured or router
    #[arg(long, global = true)]
    strategy: Option<Strategy>,

    /// Controller evaluations allowed per turn
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Root directory the file and git tools may read
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            api_base: self.api_base.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            database_url: self.database_url.clone(),
            no_database: self.no_database,
            summary_cache_dir: self.summary_cache_dir.clone(),
            strategy: self.strategy,
            max_iterations: self.max_iterations,
            workspace_root: self.workspace.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Chat interactively in the terminal
    #[command(visible_alias = "c")]
    Chat(ChatArgs),

    /// Serve the HTTP API
    #[command(visible_alias = "s")]
    Serve(ServeArgs),

    /// List cached file summaries
    Summaries(SummariesArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so the chat loop owns stdout
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = Config::load_with_overrides(cli.config.as_deref(), cli.overrides())?;

    if cli.verbose {
        tracing::info!(
            model = %config.llm.model,
            api_base = %config.llm.api_base,
            strategy = %config.orchestrator.strategy,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("confer {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Chat(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Serve(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Summaries(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("Confer - Multi-agent conversation over papers and code");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    println!("Confer Configuration");
    println!("====================");
    println!();
    println!("Model:");
    println!("  api_base: {}", config.llm.api_base);
    println!("  model: {}", config.llm.model);
    println!(
        "  api_key: {}",
        if config.llm.api_key.is_some() { "(set)" } else { "(not set)" }
    );
    println!();
    println!("Storage:");
    println!(
        "  database_url: {}",
        config.storage.database_url.as_deref().unwrap_or("(none)")
    );
    println!("  use_database: {}", config.storage.use_database);
    println!(
        "  summary_cache_dir: {}",
        config.storage.summary_cache_dir.display()
    );
    println!();
    println!("Orchestrator:");
    println!("  strategy: {}", config.orchestrator.strategy);
    println!("  max_iterations: {}", config.orchestrator.max_iterations);
    println!("  max_tool_rounds: {}", config.orchestrator.max_tool_rounds);
    println!(
        "  workspace_root: {}",
        config.orchestrator.workspace_root.display()
    );
    println!();
    println!("Server:");
    println!("  bind: {}", config.server.bind);
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
