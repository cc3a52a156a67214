//! # Network Range
//!
//! Canonical `{network, prefix}` form of a user-supplied range string.
//! Accepts CIDR (`192.168.1.0/24`), dotted-mask
//! (`192.168.1.0/255.255.255.0`) and bare-address (`192.168.1.40`)
//! notation. Construction canonicalizes: host bits are cleared, so
//! `192.168.1.77/24` and `192.168.1.0/24` are the same range.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::ValidationError;

/// Rough cost of probing one host, used for the scan-time estimate.
const SECS_PER_HOST: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkRange {
    network: Ipv4Addr,
    prefix: u8,
}

impl NetworkRange {
    /// Build a range from an address inside it and a prefix length.
    /// The address's host bits are cleared.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, ValidationError> {
        let network = pnet::ipnetwork::Ipv4Network::new(addr, prefix)
            .map_err(|_| ValidationError::Prefix(prefix.to_string()))?;
        Ok(Self {
            network: network.network(),
            prefix,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        let base = u32::from(self.network);
        let host_bits = 32 - u32::from(self.prefix);
        // u64 keeps the /0 shift in range.
        let mask = ((1u64 << host_bits) - 1) as u32;
        Ipv4Addr::from(base | mask)
    }

    /// Usable host addresses in the range. /31 counts both addresses
    /// per RFC 3021 and /32 counts its single address.
    pub fn host_count(&self) -> u32 {
        match self.prefix {
            32 => 1,
            31 => 2,
            p => ((1u64 << (32 - u32::from(p))) - 2) as u32,
        }
    }

    pub fn first_host(&self) -> Ipv4Addr {
        match self.prefix {
            31 | 32 => self.network,
            _ => Ipv4Addr::from(u32::from(self.network) + 1),
        }
    }

    pub fn last_host(&self) -> Ipv4Addr {
        match self.prefix {
            32 => self.network,
            31 => self.broadcast(),
            _ => Ipv4Addr::from(u32::from(self.broadcast()) - 1),
        }
    }

    /// Every usable host address in order.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start = u32::from(self.first_host());
        let end = u32::from(self.last_host());
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let bits = u32::from(addr);
        bits >= u32::from(self.network) && bits <= u32::from(self.broadcast())
    }

    /// Projected sweep duration at [`SECS_PER_HOST`], floored at one
    /// second.
    pub fn estimated_scan_time(&self) -> Duration {
        let secs = (f64::from(self.host_count()) * SECS_PER_HOST).max(1.0);
        Duration::from_secs_f64(secs)
    }

    /// The estimate in the unit a person would pick.
    pub fn human_estimate(&self) -> String {
        let secs = self.estimated_scan_time().as_secs_f64();
        if secs < 60.0 {
            format!("{secs:.1}s")
        } else if secs < 3600.0 {
            format!("{:.1}m", secs / 60.0)
        } else {
            format!("{:.1}h", secs / 3600.0)
        }
    }

    /// Everything a validation caller wants to show about `input`.
    pub fn info(&self, input: &str) -> RangeInfo {
        RangeInfo {
            input: input.to_string(),
            canonical: self.to_string(),
            network: self.network,
            prefix: self.prefix,
            broadcast: self.broadcast(),
            first_host: self.first_host(),
            last_host: self.last_host(),
            host_count: self.host_count(),
            estimated_scan_time: self.human_estimate(),
        }
    }
}

impl std::fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for NetworkRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }
        match trimmed.split_once('/') {
            // A bare address is treated as a single-host range.
            None => Ok(Self::new(parse_addr(trimmed)?, 32)?),
            Some((addr, suffix)) => {
                if suffix.contains('/') {
                    return Err(ValidationError::Malformed(trimmed.to_string()));
                }
                let prefix = if suffix.contains('.') {
                    mask_to_prefix(suffix)?
                } else {
                    parse_prefix(suffix)?
                };
                Ok(Self::new(parse_addr(addr)?, prefix)?)
            }
        }
    }
}

/// Validated range plus the derived fields a caller displays.
#[derive(Debug, Clone, Serialize)]
pub struct RangeInfo {
    pub input: String,
    pub canonical: String,
    pub network: Ipv4Addr,
    pub prefix: u8,
    pub broadcast: Ipv4Addr,
    pub first_host: Ipv4Addr,
    pub last_host: Ipv4Addr,
    pub host_count: u32,
    pub estimated_scan_time: String,
}

fn parse_addr(s: &str) -> Result<Ipv4Addr, ValidationError> {
    s.parse::<Ipv4Addr>()
        .map_err(|_| ValidationError::Address(s.to_string()))
}

fn parse_prefix(s: &str) -> Result<u8, ValidationError> {
    let prefix = s
        .parse::<u8>()
        .map_err(|_| ValidationError::Prefix(s.to_string()))?;
    if prefix > 32 {
        return Err(ValidationError::Prefix(s.to_string()));
    }
    Ok(prefix)
}

/// Convert a dotted subnet mask to a prefix length. The set bits must
/// be contiguous from the top.
fn mask_to_prefix(s: &str) -> Result<u8, ValidationError> {
    let mask = s
        .parse::<Ipv4Addr>()
        .map_err(|_| ValidationError::Mask(s.to_string()))?;
    let bits = u32::from(mask);
    if bits.count_ones() != bits.leading_ones() {
        return Err(ValidationError::Mask(s.to_string()));
    }
    Ok(bits.leading_ones() as u8)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
