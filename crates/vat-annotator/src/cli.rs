//! Command-line definitions and startup settings resolution

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use thiserror::Error;

use crate::config::{CliOverrides, Config};

/// Shows frames from a shared-memory region and publishes the pixel the
/// operator drags over, stamped with the frame's sample time
#[derive(Parser, Debug, Default)]
#[command(name = "vat-annotator")]
#[command(version, about = "Video annotation tool")]
pub struct Cli {
    /// Numeric id of the message session
    #[arg(long)]
    pub cid: Option<u16>,

    /// Name of the shared memory region holding the frames
    #[arg(long)]
    pub name: Option<String>,

    /// Frame width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long)]
    pub debug: bool,

    /// Print each annotation as "(x;y)" on stdout
    #[arg(long, overrides_with = "no_echo")]
    pub echo: bool,

    /// Do not print annotations, even if the config file enables it
    #[arg(long)]
    pub no_echo: bool,

    /// UDP port of the message session
    #[arg(long)]
    pub port: Option<u16>,
}

/// Fatal startup conditions
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("missing required options: {}", flag_list(.0))]
    ConfigurationMissing(Vec<&'static str>),

    #[error("failed to attach to shared memory '{name}': {source}")]
    RegionUnavailable {
        name: String,
        #[source]
        source: vat_core::FrameError,
    },
}

fn flag_list(options: &[&str]) -> String {
    options
        .iter()
        .map(|option| format!("--{option}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The four required settings, all present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredSettings {
    pub cid: u16,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Cli {
    /// Check the required options, reporting every missing one at once
    pub fn required(&self) -> Result<RequiredSettings, StartupError> {
        let mut missing = Vec::new();
        if self.cid.is_none() {
            missing.push("cid");
        }
        if self.name.is_none() {
            missing.push("name");
        }
        if self.width.is_none() {
            missing.push("width");
        }
        if self.height.is_none() {
            missing.push("height");
        }

        match (self.cid, &self.name, self.width, self.height) {
            (Some(cid), Some(name), Some(width), Some(height)) => Ok(RequiredSettings {
                cid,
                name: name.clone(),
                width,
                height,
            }),
            _ => Err(StartupError::ConfigurationMissing(missing)),
        }
    }

    /// Flags that override config file values
    pub fn overrides(&self) -> CliOverrides {
        let echo = if self.echo {
            Some(true)
        } else if self.no_echo {
            Some(false)
        } else {
            None
        };

        CliOverrides {
            verbose: self.verbose.then_some(true),
            debug: self.debug.then_some(true),
            port: self.port,
            echo,
        }
    }

    /// Load the config file named on the command line (or the default one)
    /// and apply the command-line overrides.
    ///
    /// A broken config file is reported on stderr and defaults are used.
    pub fn resolve_config(&self) -> Config {
        let config = match Config::load_from(self.config.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Config error: {e}");
                eprintln!("Using default configuration.");
                Config::default()
            }
        };
        config.with_overrides(&self.overrides())
    }

    /// Usage text shown for a missing required option
    pub fn usage() -> String {
        let mut command = Cli::command();
        format!(
            "{}\n\nExample: vat-annotator --cid=111 --name=img.argb --width=640 --height=480 --verbose",
            command.render_usage()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vat-annotator").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_all_required_present() {
        let cli = parse(&["--cid", "111", "--name", "img.argb", "--width", "640", "--height", "480"]);
        let settings = cli.required().unwrap();
        assert_eq!(
            settings,
            RequiredSettings {
                cid: 111,
                name: "img.argb".to_string(),
                width: 640,
                height: 480,
            }
        );
    }

    #[test]
    fn test_equals_syntax() {
        let cli = parse(&["--cid=111", "--name=img.argb", "--width=640", "--height=480"]);
        assert!(cli.required().is_ok());
    }

    #[test]
    fn test_missing_options_reported_together() {
        let cli = parse(&["--cid", "111", "--width", "640"]);
        match cli.required() {
            Err(StartupError::ConfigurationMissing(missing)) => {
                assert_eq!(missing, vec!["name", "height"]);
            }
            other => panic!("expected ConfigurationMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_error_message() {
        let err = Cli::default().required().unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required options: --cid, --name, --width, --height"
        );
    }

    #[test]
    fn test_invalid_number_rejected_by_parser() {
        let result = Cli::try_parse_from(["vat-annotator", "--width", "wide"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&["-v", "--echo", "--port", "13000"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.verbose, Some(true));
        assert_eq!(overrides.debug, None);
        assert_eq!(overrides.echo, Some(true));
        assert_eq!(overrides.port, Some(13000));

        let overrides = parse(&["--no-echo"]).overrides();
        assert_eq!(overrides.echo, Some(false));
        assert_eq!(overrides.verbose, None);
    }

    #[test]
    fn test_resolve_config_prefers_flags() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("annotator.toml");
        std::fs::write(&path, "[session]\nport = 13000\n\n[pipeline]\necho = true\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let config = parse(&["--config", &path]).resolve_config();
        assert_eq!(config.session.port, 13000);
        assert!(config.pipeline.echo);

        let config = parse(&["--config", &path, "--port", "14000", "--no-echo"]).resolve_config();
        assert_eq!(config.session.port, 14000);
        assert!(!config.pipeline.echo);
    }

    #[test]
    fn test_resolve_config_falls_back_on_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("annotator.toml");
        std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let config = parse(&["--config", &path]).resolve_config();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_usage_mentions_options() {
        let usage = Cli::usage();
        assert!(usage.contains("vat-annotator"));
        assert!(usage.contains("--cid=111"));
    }
}
