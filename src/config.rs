use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::Result;

pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROPOSAL_WAIT_TIME: Duration = Duration::from_secs(10_000);

/// Caller-owned settings for a [`crate::Lifecycle`]. Nothing here is global;
/// two lifecycles in the same process may point at different networks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Channel peers, orderer and commit events are resolved for.
    pub channel: String,
    #[serde(with = "secs")]
    pub commit_timeout: Duration,
    #[serde(with = "secs")]
    pub proposal_wait_time: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: "mychannel".to_string(),
            commit_timeout: DEFAULT_COMMIT_TIMEOUT,
            proposal_wait_time: DEFAULT_PROPOSAL_WAIT_TIME,
        }
    }
}

impl Config {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Default::default()
        }
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

// Durations are written as (possibly fractional) seconds in TOML.
mod secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
