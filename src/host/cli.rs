//! Command line and path resolution.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Default logging file name inside the config directory.
pub const DEFAULT_LOGGING_CONF: &str = "logging.json";

#[derive(Debug, Clone, Parser)]
#[command(name = "fill-postgresql")]
#[command(version, about = "Fills PostgreSQL from a chain state-history feed", long_about = None)]
pub struct Cli {
    /// Directory containing program runtime data
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory containing configuration files
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Configuration file name, relative to the config directory
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Logging configuration file, relative to the config directory
    #[arg(short, long, value_name = "FILE")]
    pub logging_conf: Option<PathBuf>,
}

/// Directories and files the service runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub logging_conf: PathBuf,
}

impl ResolvedPaths {
    /// Paths used when no argument overrides them.
    pub fn defaults(data_dir: &Path, config_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            config_dir: config_dir.to_path_buf(),
            config_file: config_dir.join("config.toml"),
            logging_conf: config_dir.join(DEFAULT_LOGGING_CONF),
        }
    }

    /// Apply command line overrides on top of the defaults.
    pub fn resolve(cli: &Cli, default_data_dir: &Path, default_config_dir: &Path) -> Self {
        let data_dir = cli.data_dir.clone().unwrap_or_else(|| default_data_dir.to_path_buf());
        let config_dir = cli
            .config_dir
            .clone()
            .unwrap_or_else(|| default_config_dir.to_path_buf());
        let config_file = config_dir.join(&cli.config);
        let logging_conf = match &cli.logging_conf {
            Some(path) => config_dir.join(path),
            None => config_dir.join(DEFAULT_LOGGING_CONF),
        };
        Self {
            data_dir,
            config_dir,
            config_file,
            logging_conf,
        }
    }
}
