//! Command line and config file settings.

use clap::Parser;
use infinity_client::{ClientConfig, DEFAULT_HOST};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "infinity", about = "Terminal client for an Infinity-Core server")]
pub struct Args {
    /// Server host, with port
    #[arg(long, env = "INFINITY_HOST")]
    pub host: Option<String>,

    /// Connect over wss
    #[arg(long, env = "INFINITY_SECURE")]
    pub secure: bool,

    /// TOML config file
    #[arg(long, short, env = "INFINITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Delay before reconnecting after a drop
    #[arg(long, env = "INFINITY_RECONNECT_DELAY_MS")]
    pub reconnect_delay_ms: Option<u64>,

    /// Where synthesized audio is written
    #[arg(long, env = "INFINITY_AUDIO_DIR")]
    pub audio_dir: Option<PathBuf>,
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub secure: Option<bool>,
    pub reconnect_delay_ms: Option<u64>,
    pub audio_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Resolved settings. Command line values win over the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub client: ClientConfig,
    pub audio_dir: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(args, file))
    }

    fn merge(args: &Args, file: FileConfig) -> Self {
        let host = args
            .host
            .clone()
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let secure = args.secure || file.secure.unwrap_or(false);

        let mut client = ClientConfig::for_host(&host, secure);
        if let Some(ms) = args.reconnect_delay_ms.or(file.reconnect_delay_ms) {
            client = client.with_reconnect_delay(Duration::from_millis(ms));
        }

        Self {
            client,
            audio_dir: args.audio_dir.clone().or(file.audio_dir),
        }
    }
}
