//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Porta using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Porta - data portability transfer worker
#[derive(Parser, Debug)]
#[command(name = "porta")]
#[command(version, about, long_about = None)]
#[command(author = "Porta Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "porta.toml", env = "PORTA_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PORTA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Claim and run transfer jobs until shut down
    Worker(commands::worker::WorkerArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the state of a job
    Status(commands::status::StatusArgs),

    /// Generate credential encryption key material
    Keygen(commands::keygen::KeygenArgs),
}
