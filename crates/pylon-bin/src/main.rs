// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `pylon` gateway binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use pylon_bin::cli::{Cli, Commands};
use pylon_bin::error::BinResult;
use pylon_bin::logging::init_logging;
use pylon_bin::runtime::GatewayRuntime;
use pylon_bin::shutdown::ShutdownCoordinator;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> BinResult<()> {
    match cli.command {
        Commands::Run(args) => {
            let config = pylon_config::load(&args.config)?;

            let shutdown = ShutdownCoordinator::new();
            let signals = shutdown.clone();
            tokio::spawn(async move { signals.wait_for_shutdown().await });

            GatewayRuntime::new(config).run(shutdown).await
        }
        Commands::Validate(args) => {
            let config = pylon_config::load(&args.config)?;
            println!(
                "{}: OK ({} buses, {} IOs)",
                args.config.display(),
                config.buses.len(),
                config.buses.iter().map(|b| b.ios.len()).sum::<usize>()
            );
            Ok(())
        }
    }
}
