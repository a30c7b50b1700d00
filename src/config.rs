use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::api::models::PACKAGE_PLACEHOLDER;
use crate::api::ApiConfig;
use crate::application::DownloadConfig;
use crate::ui::Matcher;

/// Pick a release file of a package from its index page and download it.
#[derive(Parser, Debug)]
#[command(name = "wheelgrab", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Index page template; `{PACKAGE}` is replaced by the package name.
    #[arg(long, global = true, env = "WHEELGRAB_INDEX_URL")]
    pub index_url: Option<String>,

    /// Where downloads are written. Defaults to `$HOME/Downloads`.
    #[arg(long, global = true, env = "WHEELGRAB_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Filter by plain substring instead of fuzzy matching.
    #[arg(long, global = true)]
    pub substring: bool,

    /// Refuse downloads whose size the server does not announce.
    #[arg(long, global = true)]
    pub require_length: bool,

    /// Log file. Defaults to the user cache directory.
    #[arg(long, global = true, env = "WHEELGRAB_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level, overridden by `RUST_LOG`.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the files available for a package and download the chosen one
    List {
        /// Package name as known to the index (e.g. requests)
        package: String,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Home directory not found; pass --download-dir")]
    HomeDirectoryNotFound,

    #[error("Index URL '{0}' has no {{PACKAGE}} placeholder")]
    InvalidIndexUrl(String),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `None` disables logging.
    pub file: Option<PathBuf>,
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub download: DownloadConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut api = ApiConfig::default();
        if let Some(index_url) = &cli.index_url {
            if !index_url.contains(PACKAGE_PLACEHOLDER) {
                return Err(ConfigError::InvalidIndexUrl(index_url.clone()));
            }
            api.index_url = index_url.clone();
        }

        let download_dir = match &cli.download_dir {
            Some(dir) => dir.clone(),
            None => default_download_dir()?,
        };

        let matcher = if cli.substring {
            Matcher::Substring
        } else {
            Matcher::Fuzzy
        };

        Ok(Self {
            api,
            download: DownloadConfig {
                download_dir,
                require_content_length: cli.require_length,
                matcher,
            },
            log: LogConfig {
                file: cli.log_file.clone().or_else(default_log_file),
                level: cli.log_level.clone(),
            },
        })
    }
}

fn default_download_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join("Downloads"))
        .ok_or(ConfigError::HomeDirectoryNotFound)
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("wheelgrab").join("wheelgrab.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_list_command_with_overrides() {
        let cli = parse(&[
            "wheelgrab",
            "list",
            "requests",
            "--download-dir",
            "/tmp/wheels",
            "--substring",
            "--require-length",
            "--log-file",
            "/tmp/wheelgrab.log",
        ]);
        let Commands::List { package } = &cli.command;
        assert_eq!(package, "requests");

        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(config.download.download_dir, PathBuf::from("/tmp/wheels"));
        assert_eq!(config.download.matcher, Matcher::Substring);
        assert!(config.download.require_content_length);
        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/wheelgrab.log")));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_custom_index_url() {
        let cli = parse(&[
            "wheelgrab",
            "--index-url",
            "https://mirror.example/simple/{PACKAGE}/",
            "--download-dir",
            "/tmp",
            "list",
            "numpy",
        ]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(
            config.api.listing_url("numpy"),
            "https://mirror.example/simple/numpy/"
        );
        assert_eq!(config.download.matcher, Matcher::Fuzzy);
    }

    #[test]
    fn test_index_url_needs_placeholder() {
        let cli = parse(&[
            "wheelgrab",
            "list",
            "numpy",
            "--index-url",
            "https://mirror.example/simple/",
            "--download-dir",
            "/tmp",
        ]);
        assert!(matches!(
            AppConfig::from_cli(&cli),
            Err(ConfigError::InvalidIndexUrl(_))
        ));
    }

    #[test]
    fn test_package_is_required() {
        assert!(Cli::try_parse_from(["wheelgrab", "list"]).is_err());
    }
}
