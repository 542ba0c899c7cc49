// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Poolscale CLI
//!
//! Command-line interface for the Poolscale autoscaling controller.

use clap::{Parser, Subcommand};

mod commands;
mod metrics;

/// Poolscale - tick-driven autoscaler for per-kind instance pools
#[derive(Parser)]
#[command(name = "poolscale")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "poolscale.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// Show the growth policy and evaluate it for a group
    Policy {
        /// Mean trailing utilization of the group (0.0 - 1.0)
        #[arg(short, long)]
        utilization: Option<f64>,

        /// Current group size
        #[arg(short, long, default_value_t = 1)]
        size: usize,
    },

    /// Run the configured simulation against the controller
    Simulate {
        /// Pace ticks at the configured tick interval (Ctrl+C to stop)
        #[arg(short, long)]
        paced: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Serve Prometheus metrics on this port while running
        #[arg(long)]
        metrics_port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Validate { file } => commands::validate::execute(&file).await,
        Commands::Policy { utilization, size } => {
            commands::policy::execute(&cli.config, utilization, size).await
        }
        Commands::Simulate {
            paced,
            json,
            metrics_port,
        } => commands::simulate::execute(&cli.config, paced, json, metrics_port).await,
    }
}
