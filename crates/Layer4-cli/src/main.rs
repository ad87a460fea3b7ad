//! Thot CLI - Main entry point

mod cli;
mod codegen;
mod logging;
mod shell;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use thot_core::PluginRegistry;
use thot_foundation::{ConfigStore, ModelConfigManager, WorkerPool};
use thot_provider::Gateway;

/// Thot - AI assistant for the terminal
#[derive(Parser, Debug)]
#[command(name = "thot")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file to use instead of the global one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider to use for this run (openai, anthropic, groq, gemini)
    #[arg(long)]
    provider: Option<String>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short, long)]
    prompt: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known models per provider
    Models {
        /// Only show this provider
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Discover plugins and show their status
    Plugins,
}

/// Shared application state built once at startup
pub struct App {
    pub store: Arc<ConfigStore>,
    pub gateway: Arc<Gateway>,
    pub plugins: PluginRegistry,
    pub workers: WorkerPool,
}

impl App {
    fn new(store: Arc<ConfigStore>) -> Self {
        let models = Arc::new(ModelConfigManager::new(Arc::clone(&store)));
        let gateway = Arc::new(Gateway::from_store(Arc::clone(&store), models));
        let plugins = PluginRegistry::from_store(Arc::clone(&store)).with_builtins();
        Self {
            store,
            gateway,
            plugins,
            workers: WorkerPool::default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration (creates defaults on first run)
    let store = match &args.config {
        Some(path) => ConfigStore::open(path)?,
        None => ConfigStore::global()?,
    };
    let store = Arc::new(store);

    // Initialize logging
    logging::init(&store, args.debug)?;
    if let Some(path) = store.path() {
        tracing::debug!("Using config {}", path.display());
    }

    let app = App::new(store);

    if let Some(provider) = &args.provider {
        // Fail early on a typo instead of on the first request
        app.gateway.get_provider(provider)?;
        tracing::info!("Using provider: {}", provider);
    }

    // Handle subcommands first
    if let Some(command) = args.command {
        match command {
            Command::Models { provider } => {
                cli::print_models(&app, provider.as_deref());
                return Ok(());
            }
            Command::Plugins => {
                app.plugins.discover_all().await;
                cli::print_plugins(&app).await;
                return Ok(());
            }
        }
    }

    // Run based on mode
    if let Some(prompt) = args.prompt {
        // Non-interactive mode
        cli::run_once(&app, args.provider.as_deref(), &prompt).await?;
    } else {
        let loaded = app.plugins.discover_all().await;
        tracing::info!("{} plugin(s) loaded", loaded);
        shell::run(&app, args.provider).await?;
    }

    Ok(())
}
