use btc_ticker::cli::{Cli, Commands};
use btc_ticker::config::AppConfig;
use btc_ticker::{server, telemetry, Ticker};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(&cli.config)?.apply_env();

    // Initialize telemetry
    telemetry::init_logging(&config.telemetry)?;

    match cli.command() {
        Commands::Serve => {
            tracing::info!(config = %cli.config, "Starting ticker service");
            serve(config).await?;
        }
        Commands::Fetch => {
            let ticker = Ticker::new(config.ticker)?;
            let reading = ticker.refresh_now().await?;
            println!("{}", serde_json::to_string_pretty(&reading)?);
        }
        Commands::Config => {
            println!("Current configuration:");
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    let ticker = Arc::new(Ticker::new(config.ticker)?);
    let poller = ticker.spawn()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::serve(listener, ticker, shutdown_signal()).await?;

    tracing::info!("Server stopped, shutting down poller");
    poller.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
