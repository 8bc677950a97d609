//! VAT Annotator - operator-facing binary of the Video Annotation Tool
//!
//! This crate provides:
//! - Command-line parsing and required option checks
//! - TOML configuration with command-line overrides
//! - Logging setup
//! - The startup sequence wiring frames, viewer, pipeline and session

pub mod cli;
pub mod config;
#[cfg(target_os = "linux")]
pub mod runner;

#[cfg(test)]
mod proptests;

pub use cli::{Cli, RequiredSettings, StartupError};
pub use config::{CliOverrides, Config};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit codes for the annotator process
///
/// - 0: Success - session ended normally after a successful attach
/// - 1: General error - missing options, attach failure or other fatal startup error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Session ended normally (exit code 0)
    Success = 0,
    /// Startup failed (exit code 1)
    GeneralError = 1,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    /// Get the exit code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
        }
    }

    /// Get a human-readable description of the exit code
    pub fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "Session ended normally",
            ExitCode::GeneralError => "Startup failed",
        }
    }
}

/// Install the global subscriber at the configured level
pub fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
