//! `wirechat.toml` loading and discovery.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;
use url::Url;
use wirechat_client::ChannelConfig;

pub const CONFIG_ENV: &str = "WIRECHAT_CONFIG";
const CONFIG_FILENAME: &str = "wirechat.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin the application is served from. The channel endpoint is
    /// derived from it.
    pub origin: Option<Url>,
    pub channel: ChannelConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the session token is persisted between runs.
    pub credentials_path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join("wirechat").join("credentials"))
                .unwrap_or_else(|| PathBuf::from(".wirechat-credentials"))
        })
    }
}

impl Config {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Load from an explicit path, `$WIRECHAT_CONFIG`, or `./wirechat.toml`,
    /// in that order. Defaults apply when none of them exists.
    ///
    /// An explicitly named file must exist; the local one is optional.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        let local = Path::new(CONFIG_FILENAME);
        if local.is_file() {
            debug!(path = %local.display(), "loading config");
            return Self::load(local);
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }
}
