mod cli;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::{Result, WrapErr};
use lmchat::{AppConfig, ConversationManager, OpenAiClient};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::ChatContext;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Send one message and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Model to use (overrides LMCHAT_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature between 0.0 and 2.0 (overrides LMCHAT_TEMPERATURE)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// System instruction (overrides LMCHAT_SYSTEM_MESSAGE)
    #[arg(short, long)]
    system: Option<String>,

    /// Wait for whole replies instead of streaming them
    #[arg(long)]
    no_stream: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Send one message and exit
        #[arg(short, long)]
        input: Option<String>,
    },
    /// List the models the server provides
    Models,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).wrap_err("Failed to set tracing subscriber")?;

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Configuration error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Some(model) = cli.model {
        config.session.model = model;
    }
    if let Some(temperature) = cli.temperature {
        config.session.temperature = temperature;
    }
    if let Some(system) = cli.system {
        config.session.system_message = system;
    }
    let streaming = config.streaming && !cli.no_stream;

    info!("Starting lmchat against {}", config.base_url);

    let client = OpenAiClient::new(&config.api_key, &config.base_url, config.timeout)
        .wrap_err("Failed to initialize HTTP client")?;

    let input = match cli.command {
        Some(Commands::Models) => return list_models(&client).await,
        Some(Commands::Chat { input }) => input.or(cli.input),
        None => cli.input,
    };

    let catalog = config.catalog();
    let manager = ConversationManager::new(client, config.session, catalog)
        .wrap_err("Invalid session settings")?
        .with_context_window(config.context_window);

    let interactive = input.is_none();
    let mut chat_context = ChatContext::new(Box::new(io::stdout()), input, interactive, streaming, manager);
    chat_context.run().await
}

async fn list_models(client: &OpenAiClient) -> Result<ExitCode> {
    use lmchat::CompletionProvider;

    match client.list_models().await {
        Ok(models) if models.is_empty() => {
            println!("Connected to {}, but no models are loaded.", client.base_url());
            Ok(ExitCode::SUCCESS)
        }
        Ok(models) => {
            for model in models {
                println!("{}", model);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
