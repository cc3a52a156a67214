//! # Device Model
//!
//! Identity, registry entries and status rows for discovered plugs.
//! A device is keyed by the UDN its description document reports, so a
//! plug that moves to a new DHCP lease keeps its record and its alias.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Unique device name, taken verbatim from the description document's
/// UDN element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(udn: impl Into<String>) -> Self {
        Self(udn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What one successful description fetch tells us about a plug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub id: DeviceId,
    pub reported_name: String,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub addr: Ipv4Addr,
}

/// A plug on record, merged over every sighting so far.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: DeviceId,
    pub addr: Ipv4Addr,
    /// Name the device advertises about itself.
    pub reported_name: String,
    /// User-chosen name, kept across sightings and address changes.
    pub alias: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
}

impl Device {
    pub fn from_identity(identity: DeviceIdentity, alias: Option<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: identity.id,
            addr: identity.addr,
            reported_name: identity.reported_name,
            alias,
            model: identity.model,
            serial: identity.serial,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Alias wins over the advertised name.
    pub fn display_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => &self.reported_name,
        }
    }

    /// Fold a fresh sighting into the record. The alias is user data
    /// and never touched here.
    pub fn absorb(&mut self, identity: DeviceIdentity) {
        self.addr = identity.addr;
        self.reported_name = identity.reported_name;
        if identity.model.is_some() {
            self.model = identity.model;
        }
        if identity.serial.is_some() {
            self.serial = identity.serial;
        }
        self.last_seen = SystemTime::now();
    }
}

/// Relay state as the plug reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    /// The plug answered with a state value we do not recognize.
    Unknown,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => f.write_str("on"),
            PowerState::Off => f.write_str("off"),
            PowerState::Unknown => f.write_str("unknown"),
        }
    }
}

/// Whether a device answered its last status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
    /// Reachable, but what it said made no sense.
    Unknown,
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => f.write_str("online"),
            Connectivity::Offline => f.write_str("offline"),
            Connectivity::Unknown => f.write_str("unknown"),
        }
    }
}

/// One row of a status report.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub id: DeviceId,
    pub name: String,
    pub addr: Ipv4Addr,
    pub power: PowerState,
    pub connectivity: Connectivity,
    /// Failure detail when the device did not answer cleanly.
    pub detail: Option<String>,
}

/// Counts over a whole status report.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub unknown: usize,
}

impl StatusSummary {
    pub fn tally(rows: &[DeviceStatus]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.connectivity {
                Connectivity::Online => summary.online += 1,
                Connectivity::Offline => summary.offline += 1,
                Connectivity::Unknown => summary.unknown += 1,
            }
        }
        summary
    }
}

/// Outcome of a batch status check.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub devices: Vec<DeviceStatus>,
    pub summary: StatusSummary,
    pub checked_at: SystemTime,
    pub elapsed: Duration,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(addr: [u8; 4], name: &str) -> DeviceIdentity {
        DeviceIdentity {
            id: DeviceId::new("uuid:Socket-1_0-TEST01"),
            reported_name: name.to_string(),
            model: Some("Socket".to_string()),
            serial: Some("TEST01".to_string()),
            addr: Ipv4Addr::from(addr),
        }
    }

    #[test]
    fn display_name_prefers_alias() {
        let mut device = Device::from_identity(identity([192, 168, 1, 40], "Wemo Mini"), None);
        assert_eq!(device.display_name(), "Wemo Mini");

        device.alias = Some("Desk Lamp".to_string());
        assert_eq!(device.display_name(), "Desk Lamp");
    }

    #[test]
    fn absorb_updates_sighting_but_not_alias() {
        let mut device = Device::from_identity(
            identity([192, 168, 1, 40], "Wemo Mini"),
            Some("Desk Lamp".to_string()),
        );
        let first_seen = device.first_seen;

        device.absorb(identity([192, 168, 1, 77], "Wemo Mini 2"));

        assert_eq!(device.addr, Ipv4Addr::new(192, 168, 1, 77));
        assert_eq!(device.reported_name, "Wemo Mini 2");
        assert_eq!(device.alias.as_deref(), Some("Desk Lamp"));
        assert_eq!(device.first_seen, first_seen);
        assert!(device.last_seen >= first_seen);
    }

    #[test]
    fn absorb_keeps_known_model_when_sighting_lacks_one() {
        let mut device = Device::from_identity(identity([10, 0, 0, 5], "Plug"), None);
        let mut bare = identity([10, 0, 0, 5], "Plug");
        bare.model = None;
        bare.serial = None;

        device.absorb(bare);

        assert_eq!(device.model.as_deref(), Some("Socket"));
        assert_eq!(device.serial.as_deref(), Some("TEST01"));
    }

    #[test]
    fn tally_counts_each_connectivity() {
        let row = |connectivity| DeviceStatus {
            id: DeviceId::new("uuid:x"),
            name: "x".to_string(),
            addr: Ipv4Addr::LOCALHOST,
            power: PowerState::Unknown,
            connectivity,
            detail: None,
        };
        let rows = vec![
            row(Connectivity::Online),
            row(Connectivity::Online),
            row(Connectivity::Offline),
            row(Connectivity::Unknown),
        ];

        let summary = StatusSummary::tally(&rows);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.online, 2);
        assert_eq!(summary.offline, 1);
        assert_eq!(summary.unknown, 1);
    }
}
