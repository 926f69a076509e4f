use anyhow::anyhow;
use clap::ValueEnum;
use file::ConfigFile;
use pinger_core::{defaults, PayloadPadding, MAX_PADDING_SIZE, MAX_TTL};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::time::Duration;

mod cmd;
mod constants;
mod file;

pub use cmd::Args;

/// The address family to probe.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressFamilyConfig {
    /// Lookup IPv4 only.
    Ipv4,
    /// Lookup IPv6 only.
    Ipv6,
    /// Use the first address returned by the system resolver.
    System,
}

impl AddressFamilyConfig {
    /// Does `addr` belong to this address family?
    pub const fn accepts(self, addr: IpAddr) -> bool {
        match self {
            Self::Ipv4 => addr.is_ipv4(),
            Self::Ipv6 => addr.is_ipv6(),
            Self::System => true,
        }
    }
}

impl Display for AddressFamilyConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
            Self::System => write!(f, "system"),
        }
    }
}

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// How to log event spans.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSpanEvents {
    /// Do not display event spans.
    Off,
    /// Display enter and exit event spans.
    Active,
    /// Display all event spans.
    Full,
}

/// Fully parsed and validated configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PingerConfig {
    pub destination: String,
    pub addr_family: AddressFamilyConfig,
    pub count: usize,
    pub interval: Duration,
    pub read_timeout: Duration,
    pub deadline: Duration,
    pub max_ttl: u16,
    pub padding: PayloadPadding,
    pub identifier: Option<u16>,
    pub quiet: bool,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub log_filter: String,
    pub log_span_events: LogSpanEvents,
}

impl PingerConfig {
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let cfg_file = if let Some(cfg) = &args.config_file {
            file::read_config_file(cfg)?
        } else {
            file::read_default_config_file()?.unwrap_or_default()
        };
        Self::build_config(args, cfg_file)
    }

    fn build_config(args: Args, cfg_file: ConfigFile) -> anyhow::Result<Self> {
        let ConfigFile {
            pinger: cfg_file_pinger,
            probe: cfg_file_probe,
        } = cfg_file;
        let cfg_file_pinger = cfg_file_pinger.unwrap_or_default();
        let cfg_file_probe = cfg_file_probe.unwrap_or_default();
        let addr_family = if args.ipv4 {
            AddressFamilyConfig::Ipv4
        } else if args.ipv6 {
            AddressFamilyConfig::Ipv6
        } else {
            cfg_file_probe
                .addr_family
                .unwrap_or(constants::DEFAULT_ADDR_FAMILY)
        };
        let count = cfg_layer(args.count, cfg_file_probe.count, defaults::DEFAULT_COUNT);
        let interval = cfg_layer(
            args.interval,
            cfg_file_probe.interval,
            defaults::DEFAULT_INTERVAL,
        );
        let read_timeout = cfg_layer(
            args.read_timeout,
            cfg_file_probe.read_timeout,
            defaults::DEFAULT_READ_TIMEOUT,
        );
        let deadline = cfg_layer(
            args.deadline,
            cfg_file_probe.deadline,
            defaults::DEFAULT_DEADLINE,
        );
        let max_ttl = cfg_layer(
            args.max_ttl,
            cfg_file_probe.max_ttl,
            defaults::DEFAULT_MAX_TTL,
        );
        let padding = cfg_layer(
            args.padding,
            cfg_file_probe.padding,
            String::from(defaults::DEFAULT_PADDING),
        );
        let identifier = cfg_layer_opt(args.identifier, cfg_file_probe.identifier);
        let quiet = cfg_layer_bool_flag(args.quiet, cfg_file_pinger.quiet, constants::DEFAULT_QUIET);
        let log_format = cfg_layer(
            args.log_format,
            cfg_file_pinger.log_format,
            constants::DEFAULT_LOG_FORMAT,
        );
        let log_filter = cfg_layer(
            args.log_filter,
            cfg_file_pinger.log_filter,
            String::from(constants::DEFAULT_LOG_FILTER),
        );
        let log_span_events = cfg_layer(
            args.log_span_events,
            cfg_file_pinger.log_span_events,
            constants::DEFAULT_LOG_SPAN_EVENTS,
        );
        validate_max_ttl(max_ttl)?;
        validate_duration("interval", interval)?;
        validate_duration("read-timeout", read_timeout)?;
        validate_duration("deadline", deadline)?;
        let padding = validate_padding(&padding)?;
        Ok(Self {
            destination: args.destination,
            addr_family,
            count,
            interval,
            read_timeout,
            deadline,
            max_ttl,
            padding,
            identifier,
            quiet,
            verbose: args.verbose,
            log_format,
            log_filter,
            log_span_events,
        })
    }
}

impl Default for PingerConfig {
    fn default() -> Self {
        Self {
            destination: String::new(),
            addr_family: constants::DEFAULT_ADDR_FAMILY,
            count: defaults::DEFAULT_COUNT,
            interval: defaults::DEFAULT_INTERVAL,
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
            deadline: defaults::DEFAULT_DEADLINE,
            max_ttl: defaults::DEFAULT_MAX_TTL,
            padding: PayloadPadding(vec![0]),
            identifier: None,
            quiet: constants::DEFAULT_QUIET,
            verbose: false,
            log_format: constants::DEFAULT_LOG_FORMAT,
            log_filter: String::from(constants::DEFAULT_LOG_FILTER),
            log_span_events: constants::DEFAULT_LOG_SPAN_EVENTS,
        }
    }
}

fn cfg_layer<T>(fst: Option<T>, snd: Option<T>, def: T) -> T {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => val,
        (None, None) => def,
    }
}

fn cfg_layer_opt<T>(fst: Option<T>, snd: Option<T>) -> Option<T> {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => Some(val),
        (None, None) => None,
    }
}

const fn cfg_layer_bool_flag(fst: bool, snd: Option<bool>, default: bool) -> bool {
    match (fst, snd) {
        (true, _) => true,
        (false, Some(val)) => val,
        (false, None) => default,
    }
}

/// Validate `max_ttl`.
fn validate_max_ttl(max_ttl: u16) -> anyhow::Result<()> {
    if max_ttl > MAX_TTL {
        Err(anyhow!("max-ttl ({max_ttl}) must be in the range 0..={MAX_TTL}"))
    } else {
        Ok(())
    }
}

/// Validate a duration is not zero.
fn validate_duration(name: &str, duration: Duration) -> anyhow::Result<()> {
    if duration.is_zero() {
        Err(anyhow!("{name} ({duration:?}) must be greater than zero"))
    } else {
        Ok(())
    }
}

/// Validate and parse `padding`.
fn validate_padding(padding: &str) -> anyhow::Result<PayloadPadding> {
    let padding = PayloadPadding::from_binary_digits(padding)
        .map_err(|_| anyhow!("padding ({padding}) must contain only the binary digits 0 and 1"))?;
    if padding.len() > MAX_PADDING_SIZE {
        Err(anyhow!(
            "padding ({} bytes) must not exceed {MAX_PADDING_SIZE} bytes",
            padding.len()
        ))
    } else {
        Ok(padding)
    }
}
