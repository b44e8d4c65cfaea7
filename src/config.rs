//! Configuration for report building.
//!
//! Configuration is read from an optional YAML file and then overridden from
//! the environment:
//!
//! ```yaml
//! preferred:
//!   alliances: [99010452]
//!   corporations: [98648442]
//! debug_sides: false
//! cache:
//!   max_entries: 1000
//!   ttl: 1h
//! ```
//!
//! Environment variables: `PREFERRED_ALLIANCES` and `PREFERRED_CORPS`
//! (comma-separated ids) and `DEBUG_BR` (`true`/`1`/`yes`).

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::FactionKey;

/// Alliance of the default home side
pub const DEFAULT_PREFERRED_ALLIANCE: i64 = 99010452;
/// Corporation of the default home side
pub const DEFAULT_PREFERRED_CORP: i64 = 98648442;

pub const ENV_PREFERRED_ALLIANCES: &str = "PREFERRED_ALLIANCES";
pub const ENV_PREFERRED_CORPS: &str = "PREFERRED_CORPS";
pub const ENV_DEBUG: &str = "DEBUG_BR";

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid cache configuration: {0}")]
    InvalidCache(String),
}

/// The "home" side that reports are written from the point of view of
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferredSides {
    pub alliances: BTreeSet<i64>,
    pub corporations: BTreeSet<i64>,
}

impl PreferredSides {
    pub fn home() -> Self {
        Self {
            alliances: BTreeSet::from([DEFAULT_PREFERRED_ALLIANCE]),
            corporations: BTreeSet::from([DEFAULT_PREFERRED_CORP]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alliances.is_empty() && self.corporations.is_empty()
    }

    /// Whether a side belongs to the home side. Lone characters never do.
    pub fn is_preferred(&self, key: &FactionKey) -> bool {
        match key {
            FactionKey::Alliance(id) => self.alliances.contains(id),
            FactionKey::Corporation(id) => self.corporations.contains(id),
            FactionKey::Character(_) | FactionKey::Unknown => false,
        }
    }
}

/// Report cache sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preferred: PreferredSides,
    /// Log raw sides and final teams for every report
    pub debug_sides: bool,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred: PreferredSides::home(),
            debug_sides: false,
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overridden from the process environment
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Override fields from environment-style variables.
    ///
    /// A variable that is present replaces the configured value outright, so
    /// an empty `PREFERRED_ALLIANCES` clears the alliance set.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PREFERRED_ALLIANCES) {
            self.preferred.alliances = parse_int_set(&value);
        }
        if let Some(value) = lookup(ENV_PREFERRED_CORPS) {
            self.preferred.corporations = parse_int_set(&value);
        }
        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug_sides = parse_flag(&value);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::InvalidCache(
                "max_entries must be greater than 0".to_string(),
            ));
        }
        if self.cache.ttl.is_zero() {
            return Err(ConfigError::InvalidCache("ttl must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Load and validate configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open config file '{}'", config_path.display()))?;
    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse config file '{}'", config_path.display()))?;

    config.validate()?;
    Ok(config)
}

/// Parse comma-separated integers into a set, skipping (and logging) bad items
pub fn parse_int_set(value: &str) -> BTreeSet<i64> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| match item.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Invalid integer in config: {}", item);
                None
            }
        })
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
