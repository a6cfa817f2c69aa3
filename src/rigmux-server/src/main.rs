// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rigmux_server::{config, logging, ControlPlane};
use tracing::{error, info, warn};

/// Multiplexing control plane for rigctl-speaking transceivers.
#[derive(Parser, Debug)]
#[command(name = "rigmuxd", version, about)]
struct Cli {
    /// Path to rigmuxd.toml. If omitted, the default search path is used
    /// (./rigmuxd.toml, then the XDG config dir, then /etc/rigmux).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref());

    let loaded = match &cli.config {
        Some(path) => config::load_from_file(path).map(|cfg| (cfg, path.clone())),
        None => match config::load_from_default_paths() {
            Ok(Some(found)) => Ok(found),
            Ok(None) => {
                error!("no configuration file found in the default search paths");
                return ExitCode::FAILURE;
            }
            Err(err) => Err(err),
        },
    };

    let (cfg, path) = match loaded {
        Ok(v) => v,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %path.display(), "loaded configuration");

    let plane = ControlPlane::new();
    if let Err(err) = plane.apply(cfg).await {
        error!(error = %err, "failed to apply configuration");
        return ExitCode::FAILURE;
    }
    if let Err(err) = plane.start().await {
        error!(error = %err, "failed to start control plane");
        return ExitCode::FAILURE;
    }

    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install ctrl-c handler, shutting down immediately");
    }
    plane.stop().await;
    ExitCode::SUCCESS
}
