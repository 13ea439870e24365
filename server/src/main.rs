use clap::Parser;
use log::{error, info};
use server::{RaceConfig, Server};
use shared::{AI_MOVE_MAX_MS, AI_MOVE_MIN_MS, COUNTDOWN_INTERVAL_MS, COUNTDOWN_START};
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Authoritative lane race server")]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,
    /// Delay between countdown ticks, in milliseconds
    #[clap(long, default_value_t = COUNTDOWN_INTERVAL_MS)]
    countdown_ms: u64,
    /// Shortest delay between AI moves, in milliseconds
    #[clap(long, default_value_t = AI_MOVE_MIN_MS)]
    ai_min_ms: u64,
    /// Longest delay between AI moves, in milliseconds
    #[clap(long, default_value_t = AI_MOVE_MAX_MS)]
    ai_max_ms: u64,
}

impl Args {
    fn race_config(&self) -> RaceConfig {
        RaceConfig {
            countdown_start: COUNTDOWN_START,
            countdown_interval: Duration::from_millis(self.countdown_ms),
            ai_move_min: Duration::from_millis(self.ai_min_ms),
            ai_move_max: Duration::from_millis(self.ai_max_ms),
        }
    }
}

/// Parses command-line arguments, then runs the server until it stops or Ctrl+C
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let args = Args::parse();
    let config = args.race_config();
    config.validate()?;

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(&address, config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
