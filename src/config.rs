//! Configuration loading and persistence.
//!
//! Values come from, in increasing priority: built-in defaults, a JSON
//! config file, `WEBSUB_HUB_*` environment variables, and finally CLI
//! flags (applied by the binary).

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_PORT, DEFAULT_TOPIC, DELIVERY_TIMEOUT, PUBLISH_INTERVAL,
    VERIFICATION_TIMEOUT,
};
use crate::error::{HubError, HubResult};

/// Configuration for the hub.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// IP address the HTTP listener binds to.
    pub bind_address: String,
    /// TCP port of the HTTP listener.
    pub port: u16,
    /// Topic the periodic publisher pushes to.
    pub default_topic: String,
    /// Seconds between publish rounds. `0` disables the publisher.
    pub publish_interval_secs: u64,
    /// Timeout in seconds for a verification GET.
    pub verification_timeout_secs: u64,
    /// Timeout in seconds for a notification POST.
    pub delivery_timeout_secs: u64,
    /// File to append inbound request dumps to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            default_topic: DEFAULT_TOPIC.to_string(),
            publish_interval_secs: PUBLISH_INTERVAL.as_secs(),
            verification_timeout_secs: VERIFICATION_TIMEOUT.as_secs(),
            delivery_timeout_secs: DELIVERY_TIMEOUT.as_secs(),
            request_log: None,
        }
    }
}

impl Config {
    /// Default config file: `<platform config dir>/websub-hub/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("websub-hub").join("config.json"))
    }

    /// Loads configuration with environment overrides applied.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// if present and defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] if a config file cannot be read or parsed,
    /// and [`HubError::InvalidSetting`] if the result fails [`Config::validate`].
    pub fn load(path: Option<&Path>) -> HubResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the hub cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidSetting`] for a zero timeout.
    pub fn validate(&self) -> HubResult<()> {
        let timeouts = [
            ("verification_timeout_secs", self.verification_timeout_secs),
            ("delivery_timeout_secs", self.delivery_timeout_secs),
        ];
        for (key, secs) in timeouts {
            if secs == 0 {
                return Err(HubError::InvalidSetting {
                    key,
                    value: secs.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> HubResult<Self> {
        let config_error = |message: String| HubError::Config {
            path: path.to_path_buf(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| config_error(e.to_string()))
    }

    /// Applies `WEBSUB_HUB_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Unparseable numbers and zero
    /// timeouts are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("WEBSUB_HUB_BIND") {
            self.bind_address = bind;
        }

        if let Some(topic) = lookup("WEBSUB_HUB_TOPIC") {
            self.default_topic = topic;
        }

        if let Some(path) = lookup("WEBSUB_HUB_REQUEST_LOG") {
            self.request_log = (!path.is_empty()).then(|| PathBuf::from(path));
        }

        if let Some(port) = lookup("WEBSUB_HUB_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }

        if let Some(secs) = lookup("WEBSUB_HUB_PUBLISH_INTERVAL").and_then(|v| v.parse().ok()) {
            self.publish_interval_secs = secs;
        }

        if let Some(secs) = positive_secs(lookup("WEBSUB_HUB_VERIFY_TIMEOUT")) {
            self.verification_timeout_secs = secs;
        }

        if let Some(secs) = positive_secs(lookup("WEBSUB_HUB_DELIVERY_TIMEOUT")) {
            self.delivery_timeout_secs = secs;
        }
    }

    /// Writes the configuration as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> HubResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| HubError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Address for the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidSetting`] if `bind_address` is not an IP.
    pub fn socket_addr(&self) -> HubResult<SocketAddr> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| HubError::InvalidSetting {
                key: "bind_address",
                value: self.bind_address.clone(),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Interval between publish rounds.
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }

    /// Verification GET timeout.
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }

    /// Notification POST timeout.
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

fn positive_secs(value: Option<String>) -> Option<u64> {
    value
        .and_then(|v| v.parse().ok())
        .filter(|secs: &u64| *secs > 0)
}
