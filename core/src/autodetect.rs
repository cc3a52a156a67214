//! # Range Auto-Detection
//!
//! Picks plausible scan ranges when the caller supplies none. The
//! candidate pool is the route-derived /24, then live interface
//! networks, then hardcoded home-router defaults. Each candidate is
//! triaged with a handful of quick probes so ranges where a plug
//! already answered sort before ranges that merely proved routable,
//! which sort before untested defaults.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;

use plugscout_common::config::HubConfig;
use plugscout_common::network::interface;
use plugscout_common::network::range::NetworkRange;

const TRIAGE_TIMEOUT: Duration = Duration::from_millis(500);
/// Host offsets probed on the control port, spread across the usual
/// DHCP pool.
const REPRESENTATIVE_OFFSETS: &[u32] = &[1, 100, 150, 254];
/// Router admin ports used to check whether anything lives in a range.
const GATEWAY_PORTS: &[u16] = &[80, 443];

/// How strongly a triage pass vouched for a range. Sorts best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Confidence {
    /// A plug answered on the control port.
    Confirmed,
    /// The gateway answered, so the range is live.
    Routable,
    Untested,
}

/// Candidate ranges, most promising first. Never empty: the fallback
/// defaults remain even when every probe comes up dry.
pub async fn detect_ranges(cfg: &HubConfig) -> Vec<NetworkRange> {
    let mut candidates: Vec<NetworkRange> = Vec::new();
    if let Some(hint) = route_hint() {
        push_unique(&mut candidates, hint);
    }
    for range in interface::local_ranges() {
        push_unique(&mut candidates, range);
    }
    for range in interface::fallback_ranges() {
        push_unique(&mut candidates, range);
    }

    let mut triage_jobs: JoinSet<(Confidence, usize, NetworkRange)> = JoinSet::new();
    let control_port = cfg.control_port;
    for (position, range) in candidates.into_iter().enumerate() {
        triage_jobs.spawn(async move { (triage(range, control_port).await, position, range) });
    }

    let mut ranked = Vec::new();
    while let Some(joined) = triage_jobs.join_next().await {
        if let Ok(entry) = joined {
            ranked.push(entry);
        }
    }
    // Confidence first, original candidate order as tie-break.
    ranked.sort_by_key(|&(confidence, position, _)| (confidence, position));
    ranked.into_iter().map(|(_, _, range)| range).collect()
}

async fn triage(range: NetworkRange, control_port: u16) -> Confidence {
    let mut probes = JoinSet::new();
    for &offset in REPRESENTATIVE_OFFSETS {
        if let Some(addr) = host_at(&range, offset) {
            probes.spawn(port_open(addr, control_port));
        }
    }
    while let Some(joined) = probes.join_next().await {
        if matches!(joined, Ok(true)) {
            probes.abort_all();
            return Confidence::Confirmed;
        }
    }

    let gateway = range.first_host();
    for &port in GATEWAY_PORTS {
        if stack_alive(gateway, port).await {
            return Confidence::Routable;
        }
    }
    Confidence::Untested
}

/// Strict open check: only an accepted connection counts.
async fn port_open(addr: Ipv4Addr, port: u16) -> bool {
    matches!(
        timeout(TRIAGE_TIMEOUT, TcpStream::connect((addr, port))).await,
        Ok(Ok(_))
    )
}

/// Liveness check: a refused connection still proves a host answered.
async fn stack_alive(addr: Ipv4Addr, port: u16) -> bool {
    match timeout(TRIAGE_TIMEOUT, TcpStream::connect((addr, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => e.kind() == std::io::ErrorKind::ConnectionRefused,
        Err(_) => false,
    }
}

/// The host `offset` addresses above the network base, when that lands
/// inside the usable span.
fn host_at(range: &NetworkRange, offset: u32) -> Option<Ipv4Addr> {
    let addr = Ipv4Addr::from(u32::from(range.network()).checked_add(offset)?);
    let first = u32::from(range.first_host());
    let last = u32::from(range.last_host());
    let bits = u32::from(addr);
    (bits >= first && bits <= last).then_some(addr)
}

/// The /24 around whichever local address routes toward the internet.
fn route_hint() -> Option<NetworkRange> {
    let source = interface::route_source_ip(Ipv4Addr::new(8, 8, 8, 8))?;
    if !source.is_private() {
        return None;
    }
    NetworkRange::new(source, 24).ok()
}

fn push_unique(candidates: &mut Vec<NetworkRange>, range: NetworkRange) {
    if !candidates.contains(&range) {
        candidates.push(range);
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
