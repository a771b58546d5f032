//! Hosts file parser.
//!
//! Reads `/etc/hosts` style lists where a domain is blocked by pointing it at
//! a sink address.

use std::io::BufRead;
use std::net::IpAddr;

use super::{BlocklistParser, ParseError};

/// Parser for hosts file format.
///
/// Only lines whose address is a sink (`0.0.0.0`, `127.0.0.1`, `::`, `::1`)
/// contribute domains; every hostname on such a line is kept except the
/// system names in [`SYSTEM_HOSTNAMES`] and tokens that are themselves IP
/// addresses.
///
/// ```text
/// 127.0.0.1 localhost
/// 0.0.0.0 bet365.com www.bet365.com   # gambling
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HostsFileParser;

/// Hostnames present in most hosts files that must never be blocked.
pub const SYSTEM_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "ip6-localhost",
    "ip6-loopback",
    "ip6-localnet",
    "ip6-mcastprefix",
    "ip6-allnodes",
    "ip6-allrouters",
    "ip6-allhosts",
];

fn is_sink_address(addr: &str) -> bool {
    addr.parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_unspecified() || ip.is_loopback())
}

fn is_system_hostname(name: &str) -> bool {
    SYSTEM_HOSTNAMES
        .iter()
        .any(|system| system.eq_ignore_ascii_case(name))
}

impl BlocklistParser for HostsFileParser {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Vec<String>, ParseError> {
        let mut domains = Vec::new();
        let mut line = String::new();

        while reader.read_line(&mut line)? > 0 {
            let content = line.split('#').next().unwrap_or_default();
            let mut tokens = content.split_whitespace();

            if tokens.next().is_some_and(is_sink_address) {
                domains.extend(
                    tokens
                        .filter(|name| !is_system_hostname(name))
                        .filter(|name| name.parse::<IpAddr>().is_err())
                        .map(str::to_string),
                );
            }
            line.clear();
        }

        Ok(domains)
    }
}
