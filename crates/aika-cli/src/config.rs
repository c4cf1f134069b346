//! Settings for the `aika` binary.
//!
//! Layers, later ones winning: built-in defaults, `config.toml` in the aika
//! config directory, the file passed with `--config`, then `AIKA_*`
//! environment variables (`AIKA_DATABASE_PATH`, `AIKA_ORGANIZATION`,
//! `AIKA_TICK_INTERVAL_MS`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

const DEFAULT_TICK_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file holding the time entries.
    pub database_path: PathBuf,
    /// Organization whose shared entries are used instead of personal ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// How often a running timer republishes its elapsed time.
    pub tick_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("aika.db"),
            organization: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Resolves the layered configuration.
    ///
    /// The default `config.toml` is optional; an `explicit` file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(dir) = config_dir() {
            figment = figment.merge(Toml::file(dir.join("config.toml")));
        }
        if let Some(path) = explicit {
            ensure!(path.is_file(), "config file {} not found", path.display());
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed("AIKA_"))
            .extract()
            .context("invalid configuration")?;
        Ok(config.normalized())
    }

    /// A blank organization selects the personal scope.
    fn normalized(mut self) -> Self {
        if self
            .organization
            .as_deref()
            .is_some_and(|org| org.trim().is_empty())
        {
            self.organization = None;
        }
        self
    }

    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// `~/.local/share/aika` on Linux.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("aika"))
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aika"))
}
