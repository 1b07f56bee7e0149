//! Command-line arguments for the demo kiosk binary

use clap::Parser;
use std::path::PathBuf;

/// Front-desk queue kiosk demo
#[derive(Parser, Debug, Clone)]
#[command(name = "deskqueue")]
#[command(about = "Front-desk visitor queue kiosk")]
#[command(version)]
pub struct Args {
    /// Visitor names to submit, in arrival order
    #[arg(value_name = "VISITOR")]
    pub visitors: Vec<String>,

    /// Configuration file path
    #[arg(long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Run in admin mode instead of the configured mode
    #[arg(long = "admin")]
    pub admin: bool,

    /// Log level
    #[arg(long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", value_parser = ["text", "json"])]
    pub log_format: Option<String>,
}
