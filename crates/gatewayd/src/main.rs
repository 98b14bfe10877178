//! gatewayd - skill provisioning gateway
//!
//! Main entry point for the gateway binary.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::path::PathBuf;

use clap::Parser;
use gateway_core::Config;
use gatewayd::Gateway;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "gatewayd", about = "Skill provisioning gateway", version)]
struct Cli {
    /// Path to polyxia-gateway.yaml (default: /etc/polyxia-gateway or the working directory)
    #[arg(short, long, env = "POLYXIA_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    addr: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// NLU service base URL
    #[arg(long)]
    nlu_api_endpoint: Option<String>,

    /// Function registry base URL
    #[arg(long)]
    registry_api_endpoint: Option<String>,

    /// Function controller base URL
    #[arg(long)]
    controller_api_endpoint: Option<String>,

    /// Downstream request timeout in seconds (0 = none)
    #[arg(long)]
    request_timeout_sec: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = &self.addr {
            config.addr.clone_from(addr);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(endpoint) = &self.nlu_api_endpoint {
            config.nlu_api_endpoint.clone_from(endpoint);
        }
        if let Some(endpoint) = &self.registry_api_endpoint {
            config.registry_api_endpoint.clone_from(endpoint);
        }
        if let Some(endpoint) = &self.controller_api_endpoint {
            config.controller_api_endpoint.clone_from(endpoint);
        }
        if let Some(timeout) = self.request_timeout_sec {
            config.request_timeout_sec = timeout;
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing.
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    runtime.block_on(async {
        let gateway = match Gateway::new(config) {
            Ok(gateway) => gateway,
            Err(e) => {
                error!("failed to initialize gateway: {}", e);
                std::process::exit(1);
            }
        };
        let grace = gateway.config().shutdown_grace();

        let run = gateway.run();
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => {
                if let Err(e) = result {
                    error!("gateway error: {}", e);
                    std::process::exit(1);
                }
                return;
            }
            () = shutdown_signal() => {}
        }

        gateway.shutdown();
        match tokio::time::timeout(grace, run).await {
            Ok(Ok(())) => info!("gateway stopped"),
            Ok(Err(e)) => {
                error!("gateway error during shutdown: {}", e);
                std::process::exit(1);
            }
            Err(_) => {
                error!("graceful shutdown timed out after {}s, forcing exit", grace.as_secs());
                std::process::exit(1);
            }
        }
    });
}

fn load_config(cli: &Cli) -> Result<Config, gateway_core::ConfigError> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.normalize()?;
    Ok(config)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");

        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT, initiating graceful shutdown"),
            _ = sigterm.recv() => info!("received SIGTERM, initiating graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received SIGINT, initiating graceful shutdown");
        }
    }
}
