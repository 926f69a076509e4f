use crate::config::{AddressFamilyConfig, LogFormat, LogSpanEvents, PingerConfig};
use crate::report;
use anyhow::{anyhow, Context};
use pinger_core::{Builder, CancellationToken, Error, ErrorKind, Statistics};
use std::io;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::instrument;
use tracing_subscriber::fmt::format::FmtSpan;

/// Run the pinger application.
pub fn run_pinger(cfg: &PingerConfig) -> anyhow::Result<Statistics> {
    configure_logging(cfg);
    let addr = resolve_target(&cfg.destination, cfg.addr_family)?;
    tracing::debug!(destination = %cfg.destination, %addr, "resolved target");
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .context("failed to install the interrupt handler")?;
    println!(
        "{}",
        report::format_header(&cfg.destination, addr, cfg.padding.len())
    );
    let quiet = cfg.quiet;
    let destination = cfg.destination.clone();
    let builder = Builder::new(addr)
        .count(cfg.count)
        .interval(cfg.interval)
        .read_timeout(cfg.read_timeout)
        .deadline(cfg.deadline)
        .max_ttl(cfg.max_ttl)
        .padding(cfg.padding.clone())
        .cancellation(token)
        .on_reply(move |reply, exceeded| {
            if !quiet {
                println!("{}", report::format_reply(reply, exceeded));
            }
        })
        .on_complete(move |stats| {
            println!("{}", report::format_statistics(&destination, stats));
        });
    let builder = match cfg.identifier {
        Some(identifier) => builder.identifier(identifier),
        None => builder,
    };
    builder.build()?.run().map_err(|err| match err {
        Error::IoError(io) if io.kind() == ErrorKind::Std(io::ErrorKind::PermissionDenied) => {
            anyhow!("{io}: raw ICMP sockets require root or the CAP_NET_RAW capability")
        }
        err => err.into(),
    })
}

/// Resolve the destination to a single address of the requested family.
///
/// Literal addresses are used as given and never looked up.
#[instrument(level = "trace")]
fn resolve_target(destination: &str, family: AddressFamilyConfig) -> anyhow::Result<IpAddr> {
    let addrs = match IpAddr::from_str(destination) {
        Ok(addr) => vec![addr],
        Err(_) => dns_lookup::lookup_host(destination)
            .map_err(|err| anyhow!("failed to resolve target: {destination} ({err})"))?,
    };
    select_addr(&addrs, family).ok_or_else(|| {
        anyhow!("failed to find any valid IP addresses for {destination} for address family {family}")
    })
}

fn select_addr(addrs: &[IpAddr], family: AddressFamilyConfig) -> Option<IpAddr> {
    addrs.iter().copied().find(|addr| family.accepts(*addr))
}

fn configure_logging(cfg: &PingerConfig) {
    if cfg.verbose {
        let fmt_span = match cfg.log_span_events {
            LogSpanEvents::Off => FmtSpan::NONE,
            LogSpanEvents::Active => FmtSpan::ACTIVE,
            LogSpanEvents::Full => FmtSpan::FULL,
        };
        match cfg.log_format {
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .compact()
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .pretty()
                    .init();
            }
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .with_span_events(fmt_span)
                    .with_env_filter(&cfg.log_filter)
                    .json()
                    .init();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const V4: &str = "1.2.3.4";
    const V4_OTHER: &str = "5.6.7.8";
    const V6: &str = "2001:db8::1";

    #[test_case(&[V4, V6], AddressFamilyConfig::System, Some(V4); "system takes first v4")]
    #[test_case(&[V6, V4], AddressFamilyConfig::System, Some(V6); "system takes first v6")]
    #[test_case(&[V6, V4, V4_OTHER], AddressFamilyConfig::Ipv4, Some(V4); "ipv4 skips v6")]
    #[test_case(&[V4, V6], AddressFamilyConfig::Ipv6, Some(V6); "ipv6 skips v4")]
    #[test_case(&[V4], AddressFamilyConfig::Ipv6, None; "no v6 available")]
    #[test_case(&[], AddressFamilyConfig::System, None; "nothing resolved")]
    fn test_select_addr(addrs: &[&str], family: AddressFamilyConfig, expected: Option<&str>) {
        let addrs = addrs
            .iter()
            .map(|addr| IpAddr::from_str(addr).unwrap())
            .collect::<Vec<_>>();
        let expected = expected.map(|addr| IpAddr::from_str(addr).unwrap());
        assert_eq!(expected, select_addr(&addrs, family));
    }

    #[test_case("1.2.3.4", AddressFamilyConfig::System, V4; "literal v4")]
    #[test_case("2001:db8::1", AddressFamilyConfig::Ipv6, V6; "literal v6")]
    fn test_resolve_literal(destination: &str, family: AddressFamilyConfig, expected: &str) {
        let addr = resolve_target(destination, family).unwrap();
        assert_eq!(IpAddr::from_str(expected).unwrap(), addr);
    }

    #[test]
    fn test_resolve_literal_wrong_family() {
        let err = resolve_target("1.2.3.4", AddressFamilyConfig::Ipv6).unwrap_err();
        assert_eq!(
            "failed to find any valid IP addresses for 1.2.3.4 for address family ipv6",
            err.to_string()
        );
    }
}
