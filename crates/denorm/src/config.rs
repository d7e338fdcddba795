//! Process configuration.
//!
//! Parsed from a TOML file with `DENORM_*` environment overrides, or built
//! directly from CLI flags by the binary. Validation runs before the server
//! ever binds a socket; a bad config is a startup failure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DenormError;
use crate::transport::Transport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenormConfig {
    /// Front door endpoint, e.g. `tcp://0.0.0.0:7710` or `ipc://denorm`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Number of workers in the pool.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of one worker's inbound queue. Total outstanding work is
    /// bounded by `workers * queue_capacity`.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// JSON dataset served by the built-in in-memory store. Absent means
    /// an empty store (every lookup comes back not-found).
    pub dataset: Option<PathBuf>,
}

fn default_listen() -> String {
    "tcp://0.0.0.0:7710".into()
}

fn default_workers() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    100
}

impl Default for DenormConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            dataset: None,
        }
    }
}

impl DenormConfig {
    /// Parse from a TOML string, apply env overrides, validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, DenormError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DenormError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Resolve the listen endpoint.
    pub fn listen_transport(&self) -> Result<Transport, DenormError> {
        self.listen.parse()
    }

    /// Environment overrides, `DENORM_KEY` for field `key`:
    /// - `DENORM_LISTEN`
    /// - `DENORM_WORKERS`
    /// - `DENORM_QUEUE_CAPACITY`
    /// - `DENORM_DATASET`
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DENORM_LISTEN") {
            self.listen = v;
        }
        if let Ok(v) = std::env::var("DENORM_WORKERS") {
            if let Ok(n) = v.parse() {
                self.workers = n;
            }
        }
        if let Ok(v) = std::env::var("DENORM_QUEUE_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.queue_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("DENORM_DATASET") {
            self.dataset = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<(), DenormError> {
        self.listen_transport()?;
        if self.workers == 0 {
            return Err(DenormError::Config("workers must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(DenormError::Config(
                "queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
