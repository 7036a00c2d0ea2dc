//! Redis Copier Entry Point

use chrono::Utc;
use redis_copier::cli::Args;
use redis_copier::{ControlLoop, ProfileStore, StdConsole, TcpConnector};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};
use tracing_subscriber::EnvFilter;

struct ChronoUtc;

impl FormatTime for ChronoUtc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        // Format as RFC3339 UTC
        write!(w, "{}", Utc::now().to_rfc3339())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr and stay quiet unless RUST_LOG asks for more,
    // so they do not interleave with the interactive prompts.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoUtc)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::from_env();
    info!("Starting Redis Data Copier");

    let profiles = match &args.config {
        Some(path) => match ProfileStore::load(path) {
            Ok(profiles) => {
                println!("✓ External configuration loaded from: {}", path.display());
                profiles
            }
            Err(e) => {
                eprintln!("{}", e);
                error!("Startup configuration failed: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ProfileStore::default(),
    };

    let mut control = ControlLoop::new(profiles, TcpConnector, StdConsole, Args::help_text())
        .with_single_key(args.key);

    match control.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Control loop failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
