// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// The pylon industrial IoT gateway.
#[derive(Parser, Debug)]
#[command(name = "pylon", version, about = "Industrial IoT gateway")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Gateway subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the gateway.
    Run(RunArgs),

    /// Validate a configuration file and exit.
    Validate(ValidateArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the gateway configuration file.
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Arguments for `validate`.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Path to the gateway configuration file.
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// JSON lines for log aggregation.
    Json,
    /// Minimal single-line output.
    Compact,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_parses() {
        let cli = Cli::try_parse_from(["pylon", "run", "--config", "gw.yaml"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.config, PathBuf::from("gw.yaml")),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "pylon",
            "validate",
            "--config",
            "gw.toml",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["pylon", "run"]).is_err());
    }
}
