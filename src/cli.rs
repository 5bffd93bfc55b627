//! CLI interface for btc-ticker
//!
//! Provides subcommands for:
//! - `serve`: Poll the source and serve the latest price over HTTP (default)
//! - `fetch`: Fetch one price and print it
//! - `config`: Show the effective configuration

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "btc-ticker")]
#[command(about = "Polls a public exchange API and serves the latest BTC price")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "btc-ticker.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Poll the price source and serve the latest reading over HTTP
    Serve,
    /// Fetch one price and print it as JSON
    Fetch,
    /// Show the effective configuration
    Config,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_the_default() {
        let cli = Cli::parse_from(["btc-ticker"]);
        assert_eq!(cli.command(), Commands::Serve);
        assert_eq!(cli.config, "btc-ticker.toml");
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["btc-ticker", "fetch", "--config", "/etc/ticker.toml"]);
        assert_eq!(cli.command(), Commands::Fetch);
        assert_eq!(cli.config, "/etc/ticker.toml");
    }
}
