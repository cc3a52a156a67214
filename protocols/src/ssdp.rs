//! # Multicast Search
//!
//! Plugs answer SSDP M-SEARCH queries for their basicevent service.
//! This module builds the query and parses the unicast answers; the
//! socket work lives in the core crate.

use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::{Context, Result};

use crate::soap::SERVICE_TYPE;

/// Standard SSDP multicast group and port.
pub const MULTICAST_GROUP: SocketAddrV4 =
    SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);

/// An M-SEARCH query for the plug service. `mx_secs` is the response
/// delay window devices spread their answers over.
pub fn msearch(mx_secs: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {MULTICAST_GROUP}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx_secs}\r\n\
         ST: {SERVICE_TYPE}\r\n\
         \r\n"
    )
}

/// Fields of one search answer we care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpAnswer {
    /// URL of the description document.
    pub location: String,
    pub st: Option<String>,
    pub usn: Option<String>,
}

impl SsdpAnswer {
    /// Host address baked into the location URL, if it parses.
    pub fn location_addr(&self) -> Option<Ipv4Addr> {
        let after_scheme = self.location.split("://").nth(1)?;
        let host_port = after_scheme.split('/').next()?;
        let host = host_port.split(':').next()?;
        host.parse().ok()
    }

    /// Whether the answer is for the service we searched for. Absent
    /// ST headers pass; some firmwares omit them.
    pub fn matches_service(&self) -> bool {
        self.st.as_deref().is_none_or(|st| st.contains(SERVICE_TYPE))
    }
}

/// Parse one datagram as a search answer.
pub fn parse_answer(datagram: &[u8]) -> Result<SsdpAnswer> {
    let text = String::from_utf8_lossy(datagram);
    let mut lines = text.lines();
    let status = lines.next().context("answer is empty")?;
    if !status.to_uppercase().starts_with("HTTP/1.1 200") {
        anyhow::bail!("not a search answer: {status:?}");
    }

    let mut location = None;
    let mut st = None;
    let mut usn = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "location" => location = Some(value.to_string()),
            "st" => st = Some(value.to_string()),
            "usn" => usn = Some(value.to_string()),
            _ => {}
        }
    }

    let location = location
        .filter(|l| !l.is_empty())
        .context("answer has no LOCATION header")?;
    Ok(SsdpAnswer { location, st, usn })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
