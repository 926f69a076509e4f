use crate::config::constants::{
    DEFAULT_ADDR_FAMILY, DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT, DEFAULT_LOG_SPAN_EVENTS,
    DEFAULT_QUIET,
};
use crate::config::{AddressFamilyConfig, LogFormat, LogSpanEvents};
use anyhow::Context;
use etcetera::BaseStrategy;
use pinger_core::defaults;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "pinger.toml";
const DEFAULT_HIDDEN_CONFIG_FILE: &str = ".pinger.toml";

/// Read the config from the default location of user config for the platform.
///
/// Returns the parsed `Some(ConfigFile)` if the config file exists, `None` otherwise.
///
/// Pinger will attempt to locate a `pinger.toml` or `.pinger.toml`
/// config file in one of the following locations:
///     - the current directory
///     - the user home directory
///     - the XDG config directory: `$XDG_CONFIG_HOME` or `~/.config`
///     - the XDG app config directory: `$XDG_CONFIG_HOME/pinger` or `~/.config/pinger`
///
/// Only the first config file found is used.
pub fn read_default_config_file() -> anyhow::Result<Option<ConfigFile>> {
    use etcetera::base_strategy as base;
    if let Some(file) = read_files("")? {
        return Ok(Some(file));
    }
    let basedirs = base::choose_base_strategy()?;
    for dir in [
        basedirs.home_dir().to_path_buf(),
        basedirs.config_dir(),
        basedirs.config_dir().join("pinger"),
    ] {
        if let Some(file) = read_files(dir)? {
            return Ok(Some(file));
        }
    }
    Ok(None)
}

/// Read the config from the given path.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> anyhow::Result<ConfigFile> {
    let contents = fs::read_to_string(path.as_ref())
        .with_context(|| format!("config file not found: {}", path.as_ref().display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("invalid config file: {}", path.as_ref().display()))
}

fn read_files<P: AsRef<Path>>(dir: P) -> anyhow::Result<Option<ConfigFile>> {
    for file in [DEFAULT_CONFIG_FILE, DEFAULT_HIDDEN_CONFIG_FILE] {
        let path = dir.as_ref().join(file);
        if path.exists() {
            return Ok(Some(read_config_file(path)?));
        }
    }
    Ok(None)
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub pinger: Option<ConfigPinger>,
    pub probe: Option<ConfigProbe>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            pinger: Some(ConfigPinger::default()),
            probe: Some(ConfigProbe::default()),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigPinger {
    pub quiet: Option<bool>,
    pub log_format: Option<LogFormat>,
    pub log_filter: Option<String>,
    pub log_span_events: Option<LogSpanEvents>,
}

impl Default for ConfigPinger {
    fn default() -> Self {
        Self {
            quiet: Some(DEFAULT_QUIET),
            log_format: Some(DEFAULT_LOG_FORMAT),
            log_filter: Some(String::from(DEFAULT_LOG_FILTER)),
            log_span_events: Some(DEFAULT_LOG_SPAN_EVENTS),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigProbe {
    pub addr_family: Option<AddressFamilyConfig>,
    pub count: Option<usize>,
    #[serde(default)]
    #[serde(deserialize_with = "humantime_deser")]
    pub interval: Option<Duration>,
    #[serde(default)]
    #[serde(deserialize_with = "humantime_deser")]
    pub read_timeout: Option<Duration>,
    #[serde(default)]
    #[serde(deserialize_with = "humantime_deser")]
    pub deadline: Option<Duration>,
    pub max_ttl: Option<u16>,
    pub padding: Option<String>,
    pub identifier: Option<u16>,
}

impl Default for ConfigProbe {
    fn default() -> Self {
        Self {
            addr_family: Some(DEFAULT_ADDR_FAMILY),
            count: Some(defaults::DEFAULT_COUNT),
            interval: Some(defaults::DEFAULT_INTERVAL),
            read_timeout: Some(defaults::DEFAULT_READ_TIMEOUT),
            deadline: Some(defaults::DEFAULT_DEADLINE),
            max_ttl: Some(defaults::DEFAULT_MAX_TTL),
            padding: Some(String::from(defaults::DEFAULT_PADDING)),
            identifier: None,
        }
    }
}

fn humantime_deser<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    humantime::parse_duration(&String::deserialize(deserializer)?)
        .map_err(serde::de::Error::custom)
        .map(Some)
}
