use anyhow::{Context, Result};
use calc_metrics::TracingService;
use calc_models::{Config, CONFIG_PATH_ENV};
use calculator_mcp::{healthcheck, local_health_url, run};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::warn;

#[derive(Parser)]
#[command(name = "calculator-mcp-server")]
#[command(about = "Calculator tools over the Model Context Protocol")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = CONFIG_PATH_ENV, global = true)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT and the config file)
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server (default)
    Serve,
    /// Probe a running server's /health endpoint; exit 0 when healthy
    Healthcheck {
        /// Full URL of the health endpoint
        #[arg(long)]
        url: Option<String>,
        /// Probe timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn runtime(config: &Config) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if config.server.worker_threads > 0 {
        builder.worker_threads(config.server.worker_threads);
    }
    builder
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

fn serve(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    TracingService::init(&config.logging)?;
    if let Some(path) = cli.config.as_deref().filter(|p| !p.exists()) {
        warn!("Config file {} not found, using defaults and environment", path.display());
    }
    TracingService::log_startup(&config);

    runtime(&config)?.block_on(run(config))
}

fn probe(cli: &Cli, url: Option<String>, timeout: u64) -> Result<()> {
    let config = load_config(cli)?;
    let url = url.unwrap_or_else(|| local_health_url(&config));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(healthcheck(&url, Duration::from_secs(timeout)))?;
    println!("{} {}: {}", report.server, report.version, report.status);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        None | Some(Commands::Serve) => serve(&cli),
        Some(Commands::Healthcheck { url, timeout }) => probe(&cli, url.clone(), *timeout),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("calculator-mcp-server: {e:#}");
            ExitCode::FAILURE
        }
    }
}
