//! Persistent configuration for the tcpchat CLI.
//!
//! Config file lives at `~/.config/tcpchat/cli.toml`. Every field is
//! optional; command-line flags win over the file, the file wins over the
//! built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default chat server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default chat server port.
pub const DEFAULT_PORT: u16 = 1300;

/// User configuration (persisted in cli.toml).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Server host name or IP address.
    pub host: Option<String>,
    /// Server TCP port.
    pub port: Option<u16>,
    /// Username to log in with right after connecting.
    pub username: Option<String>,
    /// Print events as JSON lines instead of text.
    pub json: Option<bool>,
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tcpchat")
        .join("cli.toml")
}

impl Config {
    /// Load from the default location. A missing file gives the defaults; a
    /// broken one is reported and ignored.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str(&s) {
                Ok(c) => return c,
                Err(e) => tracing::warn!("Bad config file {}: {e}", path.display()),
            },
            Err(e) => tracing::warn!("Can't read {}: {e}", path.display()),
        }
        Self::default()
    }
}

/// Effective settings after merging CLI args > config file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub json: bool,
}

impl Resolved {
    pub fn merge(cli: &super::Cli, config: &Config) -> Self {
        let host = cli
            .host
            .clone()
            .or_else(|| config.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(config.port).unwrap_or(DEFAULT_PORT);
        let username = cli
            .username
            .clone()
            .or_else(|| config.username.clone())
            .filter(|u| !u.is_empty());
        let json = cli.json || config.json.unwrap_or(false);

        Self {
            host,
            port,
            username,
            json,
        }
    }
}
