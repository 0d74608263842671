//! Railyard server entry point
//!
//! Loads configuration, applies command-line overrides and serves until
//! interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use railyard::net::Server;
use railyard::{Pacing, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "railyard", version, about)]
struct Cli {
    /// JSON config file; missing fields keep their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind (127.0.0.1 for local only)
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Fixed RNG seed for every room
    #[arg(long)]
    seed: Option<u64>,

    /// realtime or as_fast_as_possible
    #[arg(long, value_parser = parse_pacing)]
    pacing: Option<Pacing>,

    /// Players per room
    #[arg(long)]
    capacity: Option<usize>,

    #[arg(long)]
    tick_rate: Option<u32>,
}

fn parse_pacing(s: &str) -> Result<Pacing, String> {
    Pacing::from_str(s).ok_or_else(|| format!("unknown pacing '{s}'"))
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, railyard::ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(seed) = self.seed {
            config.room.seed = Some(seed);
        }
        if let Some(pacing) = self.pacing {
            config.pacing = pacing;
        }
        if let Some(capacity) = self.capacity {
            config.room.room_capacity = capacity;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.room.tick_rate = tick_rate;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Railyard {} starting...", env!("CARGO_PKG_VERSION"));

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            log::error!("Failed to start server: {e}");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                log::error!("Server stopped: {e}");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutting down");
        }
    }
    ExitCode::SUCCESS
}
