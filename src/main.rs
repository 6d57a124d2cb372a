//! quizchain command line entry point

use clap::{Parser, Subcommand};
use quizchain::chain::{ChainRunner, SubmitterIdentity};
use quizchain::config::{AppConfig, RuntimeSecrets};
use quizchain::fetch::build_page_fetcher;
use quizchain::llm::LlmProvider;
use quizchain::observability::{init_default_logging, init_logging, LogFormat};
use quizchain::server::{self, QuizService};
use quizchain::solvers::{SolverDeps, SolverRegistry};
use quizchain::submit::HttpSubmissionClient;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Level};

/// Solve server-driven quiz chains
#[derive(Parser)]
#[command(name = "quizchain")]
#[command(about = "Fetch, route, solve and submit quiz chains")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace); LOG_LEVEL wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve POST /solve, GET /health and GET /metrics
    Serve {
        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a single chain with the configured identity
    Run {
        /// First quiz page
        #[arg(long)]
        url: String,
    },
    /// Validate configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_observability(cli.verbose);

    info!("Starting quizchain v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Run { url } => run_once(config, &url).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn init_observability(verbose: u8) {
    if verbose == 0 || std::env::var("LOG_LEVEL").is_ok() {
        init_default_logging();
        return;
    }

    let level = if verbose > 1 { Level::TRACE } else { Level::DEBUG };
    let format = std::env::var("LOG_FORMAT")
        .map(|f| LogFormat::parse(&f))
        .unwrap_or(LogFormat::Compact);
    init_logging(level, format, false);
}

/// Wire production collaborators into a chain runner, also handing back the
/// LLM provider for health probing
fn build_runner(
    config: &AppConfig,
    secrets: &RuntimeSecrets,
) -> Result<(Arc<ChainRunner>, Option<Arc<dyn LlmProvider>>), Box<dyn std::error::Error>> {
    let fetcher = build_page_fetcher(&config.fetcher)?;
    info!(fetcher = fetcher.name(), "Page fetcher ready");

    let submitter = Arc::new(HttpSubmissionClient::new(&config.submit)?);
    let deps = SolverDeps::from_config(config, secrets, fetcher.clone())?;
    let registry = Arc::new(SolverRegistry::new(&deps));
    info!(solvers = ?registry.names(), "Solver registry ready");

    let runner = Arc::new(ChainRunner::new(fetcher, submitter, registry, &config.chain));
    Ok((runner, deps.llm))
}

async fn serve(config: AppConfig, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = config.resolve_secrets()?;
    let (runner, llm) = build_runner(&config, &secrets)?;
    let service = Arc::new(QuizService::new(runner, &secrets).with_llm_provider(llm));

    let host: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, port.unwrap_or(config.server.port));

    server::serve(service, addr, shutdown_signal()).await?;
    info!("Application shutdown complete");
    Ok(())
}

async fn run_once(config: AppConfig, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = config.resolve_secrets()?;
    let (runner, _) = build_runner(&config, &secrets)?;
    let identity: SubmitterIdentity = secrets.expected_identity.clone();

    let outcome = tokio::select! {
        outcome = runner.run_chain(url, &identity) => outcome,
        _ = shutdown_signal() => return Err("interrupted".into()),
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.is_success() {
        Ok(())
    } else {
        Err(format!("chain ended with {:?}", outcome.termination).into())
    }
}

fn handle_config_command(config: &AppConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    match config.resolve_secrets() {
        Ok(secrets) => info!(
            email = %secrets.expected_identity.email,
            llm_token = secrets.llm_token.is_some(),
            "Secrets resolved"
        ),
        Err(e) => info!(error = %e, "Secrets not resolvable in this environment"),
    }

    info!("Configuration validation complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl-C, shutting down gracefully...");
    }
}
