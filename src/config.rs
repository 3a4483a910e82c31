//! Server configuration: CLI arguments (port, password) take precedence
//! over an optional TOML file (teacher's `ServerConfig`/`NetworkConfig`/
//! `LimitsConfig` split); the file's absence is not an error, built-in
//! defaults apply.

use serde::Deserialize;
use std::path::Path;

use crate::errors::ConfigError;

pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_PASSWORD: &str = "42";
pub const DEFAULT_SERVER_NAME: &str = "ircserver";

pub const LINE_MAX: usize = 512;
pub const INBUF_CAP: usize = 8 * 1024;
pub const OUTBUF_SOFT_CAP: usize = 64 * 1024;
pub const LIVENESS_IDLE_SECS: u64 = 60;
pub const LIVENESS_PING_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            network: NetworkConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub motd: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: DEFAULT_SERVER_NAME.to_string(),
            motd: vec!["Welcome to the server.".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub port: u16,
    pub password: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            port: DEFAULT_PORT,
            password: Some(DEFAULT_PASSWORD.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub line_max: usize,
    pub inbuf_cap: usize,
    pub outbuf_soft_cap: usize,
    pub liveness_idle_secs: u64,
    pub liveness_ping_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            line_max: LINE_MAX,
            inbuf_cap: INBUF_CAP,
            outbuf_soft_cap: OUTBUF_SOFT_CAP,
            liveness_idle_secs: LIVENESS_IDLE_SECS,
            liveness_ping_timeout_secs: LIVENESS_PING_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        toml::from_str(&text).map_err(ConfigError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.network.port, 6667);
        assert_eq!(cfg.network.password.as_deref(), Some("42"));
        assert_eq!(cfg.limits.line_max, 512);
        assert_eq!(cfg.limits.inbuf_cap, 8 * 1024);
        assert_eq!(cfg.limits.outbuf_soft_cap, 64 * 1024);
    }

    #[test]
    fn loads_partial_toml_with_fallback_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ircd.toml");
        std::fs::write(&path, "[server]\nname = \"chat.example\"\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.server.name, "chat.example");
        assert_eq!(cfg.network.port, 6667);
    }
}
