//! tty-bridge - Serial to WebSocket bridge
//!
//! Usage:
//!   tty-bridge --addr server:80 --port /dev/ttyUSB0   Bridge a real port
//!   tty-bridge --addr server:80 --sim                 Bridge generated data
//!   tty-bridge --config bridge.toml                   Use a config file

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tty_bridge::bridge::{Bridge, BridgeOptions, Shutdown, StopReason};
use tty_bridge::cli::Cli;
use tty_bridge::config::Config;
use tty_bridge::error::{BridgeError, Result};
use tty_bridge::{device, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::resolve(cli)?;

    let rt = tokio::runtime::Runtime::new().map_err(|source| BridgeError::Runtime { source })?;
    rt.block_on(run_bridge(config))
}

async fn run_bridge(config: Config) -> Result<()> {
    info!(
        "Starting Serial TTY bridge (ID: {}, Server: {})",
        config.bridge.device_id, config.bridge.server_addr
    );

    let device = device::open(&config.device)?;

    let mut bridge = Bridge::new(device, BridgeOptions::from(&config.bridge));
    bridge
        .connect(&config.bridge.server_addr, &config.bridge.device_id)
        .await?;

    spawn_signal_handler(bridge.shutdown_signal());

    info!("Connected. Forwarding data...");
    bridge.start().await?;
    Ok(())
}

/// Raise the bridge shutdown on SIGINT/SIGTERM (Ctrl-C on Windows)
fn spawn_signal_handler(shutdown: Shutdown) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        tokio::spawn(async move {
            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Cannot install signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            info!("Shutting down...");
            shutdown.raise(StopReason::Requested);
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down...");
                shutdown.raise(StopReason::Requested);
            }
        });
    }
}
