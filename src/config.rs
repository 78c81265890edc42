// Runtime configuration. Values are resolved once at startup from, in
// order of precedence: command-line flags / environment variables, the
// optional config file, then built-in defaults. The resulting `Config` is
// handed to every component by value and never mutated afterwards.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://bd.bangbang93.com/openbmclapi";
pub const DEFAULT_COOKIE_FILE: &str = "cookie.json";
pub const DEFAULT_WEB_PORT: u16 = 8080;
pub const DEFAULT_WEB_ROOT: &str = "web/dist";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const CONFIG_DIR: &str = "bmclapi";
const CONFIG_FILE: &str = "config.toml";

/// Diagnostic tier. `Basic` logs one line per request, `Verbose` adds
/// request/response bodies and response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum Verbosity {
    #[default]
    #[value(skip)]
    Off,
    #[value(name = "debug", alias = "debug-1")]
    Basic,
    #[value(name = "debug-2")]
    Verbose,
}

impl Verbosity {
    /// Filter directive for `tracing_subscriber::EnvFilter`.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Off => "warn",
            Verbosity::Basic => "warn,bmclapi_cli=info,bmclapi=info",
            Verbosity::Verbose => "warn,bmclapi_cli=debug,bmclapi=debug",
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(name = "bmclapi")]
#[command(about = "Manage OpenBMCLAPI nodes from the terminal", long_about = None)]
pub struct CliArgs {
    /// Diagnostic output: debug (or debug-1) for request lines, debug-2 for full payloads
    #[arg(value_enum)]
    pub debug: Option<Verbosity>,

    /// Remote API base URL
    #[arg(long, env = "BMCLAPI_BASE_URL")]
    pub base_url: Option<String>,

    /// Where the session cookies are stored
    #[arg(long, env = "BMCLAPI_COOKIE_FILE")]
    pub cookie_file: Option<PathBuf>,

    /// Port for the local web UI
    #[arg(long, env = "BMCLAPI_WEB_PORT")]
    pub port: Option<u16>,

    /// Directory holding the prebuilt web UI bundle
    #[arg(long, env = "BMCLAPI_WEB_ROOT")]
    pub web_root: Option<PathBuf>,
}

/// Shape of the optional `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub web_port: Option<u16>,
    pub web_root: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub cookie_path: PathBuf,
    pub web_port: u16,
    pub web_root: PathBuf,
    pub request_timeout: Duration,
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Config::resolve(FileConfig::default(), CliArgs::default())
    }
}

impl Config {
    /// Build the configuration from parsed arguments plus the config file
    /// in the user's config directory, when one exists.
    pub fn load(args: CliArgs) -> Result<Self> {
        let file = match Self::config_file_path() {
            Some(path) if path.exists() => FileConfig::read(&path)?,
            _ => FileConfig::default(),
        };
        Ok(Self::resolve(file, args))
    }

    pub fn resolve(file: FileConfig, args: CliArgs) -> Self {
        let base_url = args
            .base_url
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_path: args
                .cookie_file
                .or(file.cookie_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIE_FILE)),
            web_port: args.port.or(file.web_port).unwrap_or(DEFAULT_WEB_PORT),
            web_root: args
                .web_root
                .or(file.web_root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WEB_ROOT)),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            verbosity: args.debug.unwrap_or_default(),
        }
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cookie_path, PathBuf::from("cookie.json"));
        assert_eq!(config.web_port, 8080);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.verbosity, Verbosity::Off);
    }

    #[test]
    fn args_override_file_values() {
        let file: FileConfig = toml::from_str(
            r#"
            base_url = "http://file.example/api/"
            web_port = 9000
            request_timeout_secs = 5
            "#,
        )
        .unwrap();
        let args = CliArgs {
            port: Some(7000),
            ..Default::default()
        };

        let config = Config::resolve(file, args);
        assert_eq!(config.base_url, "http://file.example/api");
        assert_eq!(config.web_port, 7000);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn debug_argument_selects_verbosity() {
        for (arg, expected) in [
            ("debug", Verbosity::Basic),
            ("debug-1", Verbosity::Basic),
            ("debug-2", Verbosity::Verbose),
        ] {
            let args = CliArgs::try_parse_from(["bmclapi", arg]).unwrap();
            assert_eq!(args.debug, Some(expected), "argument {arg}");
        }
        assert!(CliArgs::try_parse_from(["bmclapi", "debug-3"]).is_err());
    }
}
