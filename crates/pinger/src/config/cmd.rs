use crate::config::{LogFormat, LogSpanEvents};
use clap::builder::Styles;
use clap::Parser;
use std::time::Duration;

/// Send ICMP echo requests to a host and report round trip statistics
#[derive(Parser, Debug)]
#[command(name = "pinger", author, version, about, long_about = None, arg_required_else_help(true), styles=Styles::styled())]
pub struct Args {
    /// The hostname or IP address to probe
    pub destination: String,

    /// Config file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<String>,

    /// Stop after receiving this many replies, 0 means no limit [default: 0]
    #[arg(short = 'c', long)]
    pub count: Option<usize>,

    /// The time to wait between sending probes [default: 1s]
    #[arg(short = 'i', long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// The maximum time a single socket read waits for a reply [default: 1s]
    #[arg(short = 'w', long, value_parser = parse_duration)]
    pub read_timeout: Option<Duration>,

    /// Stop after this time regardless of how many replies were received [default: 100000s]
    #[arg(short = 't', long, value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// Flag replies received with a ttl greater than this [default: 255]
    #[arg(long)]
    pub max_ttl: Option<u16>,

    /// Padding appended to every probe, as a string of binary digits [default: 00000000]
    #[arg(short = 'p', long)]
    pub padding: Option<String>,

    /// The ICMP echo identifier [default: derived from the process id]
    #[arg(long)]
    pub identifier: Option<u16>,

    /// Use IPv4 only
    #[arg(short = '4', long, conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Use IPv6 only
    #[arg(short = '6', long, conflicts_with = "ipv4")]
    pub ipv6: bool,

    /// Only print the summary statistics
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// The debug log format [default: pretty]
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: pinger=debug]
    #[arg(long)]
    pub log_filter: Option<String>,

    /// The debug log span events [default: off]
    #[arg(long)]
    pub log_span_events: Option<LogSpanEvents>,

    /// Enable verbose debug logging
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    Ok(humantime::parse_duration(value)?)
}
