//! Engine settings from `conf/settings.toml`.
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the precondition gate and payload lookup.
///
/// Every field has a default; the file itself is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Connectivity probe settings.
    pub network: NetworkSettings,
    /// Filesystem locations.
    pub paths: PathSettings,
}

/// Endpoints probed when a component requires network access.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    /// URLs tried in order; any HTTP response counts as reachable.
    pub endpoints: Vec<String>,
    /// Per-endpoint timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://archlinux.org".to_string(),
                "https://1.1.1.1".to_string(),
            ],
            timeout_secs: 3,
        }
    }
}

impl NetworkSettings {
    /// Timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Filesystem locations used by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    /// Boot directory checked for free space when it is a separate filesystem.
    pub boot: PathBuf,
    /// Payload directory, relative to the repository root unless absolute.
    pub payload: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            boot: PathBuf::from("/boot"),
            payload: PathBuf::from("payload"),
        }
    }
}
