mod config_commands;

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    parley_common::ChatKey,
    parley_config::{ParleyConfig, Severity},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::config_commands::ConfigAction;

#[derive(Parser)]
#[command(name = "parley", about = "Parley: a Telegram chat bot for hosted text-generation models")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (skips discovery in ./ and ~/.config/parley/).
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server (default when no subcommand is provided).
    Serve,
    /// Send one message through the bot and print the reply.
    ///
    /// Without `--message`, reads messages from stdin line by line, keeping
    /// the conversation history between lines.
    Ask {
        /// Chat id the conversation is stored under.
        #[arg(long, default_value = "cli")]
        chat: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Initialise tracing: `RUST_LOG` wins over `--log-level`.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config file (explicit or discovered), then apply env and CLI
/// overrides.
fn load_effective_config(cli: &Cli) -> anyhow::Result<ParleyConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => load_explicit(path)?,
        None => parley_config::discover_and_load(),
    };
    parley_config::apply_env_overrides(&mut config);
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn load_explicit(path: &Path) -> anyhow::Result<ParleyConfig> {
    parley_config::load_config(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

async fn serve(config: ParleyConfig) -> anyhow::Result<()> {
    let result = parley_config::validate(&config);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `parley config check` for details",
            result.count(Severity::Error)
        );
    }

    parley_gateway::start_gateway(config).await
}

async fn ask(config: &ParleyConfig, chat: String, message: Option<String>) -> anyhow::Result<()> {
    let orchestrator = parley_gateway::build_orchestrator(config)?;
    let chat = ChatKey::from(chat);

    if let Some(message) = message {
        println!("{}", orchestrator.reply(&chat, &message).await);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        println!("{}", orchestrator.reply(&chat, &line).await);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "parley starting");

    let config = load_effective_config(&cli)?;

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Ask { chat, message }) => ask(&config, chat, message).await,
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
    }
}
