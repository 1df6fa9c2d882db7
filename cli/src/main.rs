use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_core::{AgentError, AgentLoop, Provider, ToolRegistry, config, providers, tools};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod input;
mod onboard;
mod render;

#[derive(Parser)]
#[command(name = "relay", version)]
#[command(about = "relay - chat with a model that can read, edit and commit your files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure provider, API key and model
    Onboard,
    /// Start an interactive session
    Chat {
        /// Directory the tools operate in (defaults to the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn has_env_api_key() -> bool {
    ["ANTHROPIC_API_KEY", "RELAY_ANTHROPIC_API_KEY"]
        .iter()
        .any(|var| std::env::var(var).is_ok_and(|v| !v.trim().is_empty()))
}

async fn chat(workspace: Option<PathBuf>) -> Result<()> {
    let mut config = config::Config::load_or_init()?;
    config.workspace_dir = match workspace {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };

    let provider: Arc<dyn Provider> = Arc::from(providers::create_provider(&config)?);
    tracing::debug!(
        provider = provider.name(),
        workspace = %config.workspace_dir.display(),
        "starting chat"
    );

    let mut registry = ToolRegistry::new();
    registry.register_all(tools::default_tools(&config.workspace_dir))?;

    let mut agent = AgentLoop::new(provider, Arc::new(registry))
        .with_observer(Arc::new(render::ConsoleObserver));

    println!("Relay version {}", env!("CARGO_PKG_VERSION"));
    println!("Chat with Claude (press Ctrl+C to exit)");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut input = input::ReadlineInput::spawn(render::user_prompt());

    match agent.run(&mut input, &cancel).await {
        Ok(()) => {
            println!("\nGoodbye!");
            Ok(())
        }
        Err(AgentError::Cancelled) => {
            println!("\nCancelled.");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Chat session ended")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or_else(|| {
        if config::config_exists() || has_env_api_key() {
            Commands::Chat { workspace: None }
        } else {
            Commands::Onboard
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().context("Onboarding failed")?;
            config::save_config(&onboard_config)?;
        }
        Commands::Chat { workspace } => chat(workspace).await?,
    }

    Ok(())
}
