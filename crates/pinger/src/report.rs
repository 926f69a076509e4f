use pinger_core::{EchoReply, Statistics, PAYLOAD_HEADER_SIZE};
use std::net::IpAddr;
use std::time::Duration;

/// Format the line printed before the first probe is sent.
pub fn format_header(destination: &str, addr: IpAddr, padding_len: usize) -> String {
    let data_bytes = PAYLOAD_HEADER_SIZE + padding_len;
    format!("PING {destination} ({addr}): {data_bytes} data bytes")
}

/// Format a single matched reply.
pub fn format_reply(reply: &EchoReply, exceeded_max_ttl: bool) -> String {
    let ttl = reply
        .ttl
        .map_or_else(|| String::from("?"), |ttl| ttl.0.to_string());
    format!(
        "{} bytes from {}: icmp_seq={} time={} ttl={ttl} exceeded_max_ttl={exceeded_max_ttl}",
        reply.bytes,
        reply.source,
        reply.sequence.0,
        format_rtt(reply.rtt)
    )
}

/// Format the summary printed once the session completes.
pub fn format_statistics(destination: &str, stats: &Statistics) -> String {
    let percents = match (stats.percent_received, stats.percent_lost) {
        (Some(received), Some(lost)) => format!("{received:.1}% recovery, {lost:.1}% loss"),
        _ => String::from("recovery and loss: no data"),
    };
    let average = stats.average_rtt.map_or_else(
        || String::from("average rtt: no data"),
        |avg| format!("average rtt {}", format_rtt(avg)),
    );
    [
        format!(
            "--- {destination} ({}) ping statistics ---",
            stats.destination
        ),
        format!(
            "{} packets transmitted, {} received, {} lost",
            stats.packets_sent, stats.packets_received, stats.packets_lost
        ),
        percents,
        format!("{} replies exceeded the max ttl", stats.ttl_exceeded),
        average,
    ]
    .join("\n")
}

fn format_rtt(rtt: Duration) -> String {
    format!("{:.3}ms", rtt.as_secs_f64() * 1000_f64)
}
