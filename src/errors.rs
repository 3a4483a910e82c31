//! Server-level errors: the handful of things that can fail a running
//! server rather than a single command. Per-command failures are not
//! represented here — handlers report them directly to the client as
//! numeric replies instead of propagating a `Result`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to register listener with the poller: {0}")]
    PollerRegister(#[source] std::io::Error),

    #[error("poller wait failed: {0}")]
    PollerWait(#[source] std::io::Error),

    #[error("failed to load config file {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read file: {0}")]
    Read(#[source] std::io::Error),

    #[error("could not parse TOML: {0}")]
    Parse(#[source] toml::de::Error),
}
