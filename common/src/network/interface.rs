//! # Interface Survey
//!
//! Candidate ranges for automatic scans come from the machine's own
//! interfaces. Plugs live on private LANs, so only private IPv4
//! networks qualify, and wide interface prefixes are narrowed to the
//! /24 around the interface address to keep sweeps bounded.

use std::net::{Ipv4Addr, UdpSocket};

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;

use crate::network::range::NetworkRange;

/// Ranges worth trying when no interface yields a usable network.
/// Ordered by how common they are on home routers.
pub const FALLBACK_RANGES: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(192, 168, 1, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 24),
    (Ipv4Addr::new(192, 168, 2, 0), 24),
    (Ipv4Addr::new(10, 0, 0, 0), 24),
    (Ipv4Addr::new(10, 0, 1, 0), 24),
    (Ipv4Addr::new(172, 16, 0, 0), 24),
];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// Loopback never reaches a plug.
    IsLoopback,
    /// Point-to-point links (e.g. a VPN) are not the plug LAN.
    IsPointToPoint,
    /// The interface has no private IPv4 address.
    NoPrivateIpv4,
}

/// Ranges derived from the machine's live interfaces, deduplicated,
/// in interface order.
pub fn local_ranges() -> Vec<NetworkRange> {
    candidate_ranges(&datalink::interfaces())
}

/// The hardcoded fallback list as ranges.
pub fn fallback_ranges() -> Vec<NetworkRange> {
    FALLBACK_RANGES
        .iter()
        .filter_map(|&(addr, prefix)| NetworkRange::new(addr, prefix).ok())
        .collect()
}

/// Ask the kernel which local address routes toward `target`. No
/// packet leaves the machine; connecting a UDP socket just selects
/// the source address.
pub fn route_source_ip(target: Ipv4Addr) -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((target, 53)).ok()?;
    match socket.local_addr().ok()? {
        std::net::SocketAddr::V4(addr) => Some(*addr.ip()),
        std::net::SocketAddr::V6(_) => None,
    }
}

fn candidate_ranges(interfaces: &[NetworkInterface]) -> Vec<NetworkRange> {
    let mut ranges: Vec<NetworkRange> = Vec::new();
    for interface in interfaces {
        if is_viable_interface(interface).is_err() {
            continue;
        }
        for net in &interface.ips {
            let IpNetwork::V4(v4) = net else { continue };
            if !v4.ip().is_private() {
                continue;
            }
            // Narrow anything wider than a /24 to keep sweeps bounded.
            let Ok(range) = NetworkRange::new(v4.ip(), v4.prefix().max(24)) else {
                continue;
            };
            if !ranges.contains(&range) {
                ranges.push(range);
            }
        }
    }
    ranges
}

fn is_viable_interface(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    let has_private_v4 = interface.ips.iter().any(|net| match net {
        IpNetwork::V4(v4) => v4.ip().is_private(),
        IpNetwork::V6(_) => false,
    });
    if !has_private_v4 {
        return Err(ViabilityError::NoPrivateIpv4);
    }
    Ok(())
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
    use pnet::ipnetwork::Ipv4Network;

    const IFF_UP: u32 = 1;
    const IFF_BROADCAST: u32 = 1 << 1;
    const IFF_LOOPBACK: u32 = 1 << 3;
    const IFF_POINTTOPOINT: u32 = 1 << 4;

    fn create_mock_interface(name: &str, ips: Vec<IpNetwork>, flags: u32) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: "An interface".to_string(),
            index: 0,
            mac: None,
            ips,
            flags,
        }
    }

    fn private_ip(addr: [u8; 4], prefix: u8) -> IpNetwork {
        IpNetwork::V4(Ipv4Network::new(Ipv4Addr::from(addr), prefix).unwrap())
    }

    #[test]
    fn viable_interface_passes() {
        let interface = create_mock_interface(
            "eth0",
            vec![private_ip([192, 168, 1, 100], 24)],
            IFF_UP | IFF_BROADCAST,
        );
        assert_eq!(is_viable_interface(&interface), Ok(()));
    }

    #[test]
    fn down_interface_is_rejected() {
        let interface = create_mock_interface(
            "eth0",
            vec![private_ip([192, 168, 1, 100], 24)],
            IFF_BROADCAST,
        );
        assert_eq!(is_viable_interface(&interface), Err(ViabilityError::IsDown));
    }

    #[test]
    fn loopback_is_rejected() {
        let interface = create_mock_interface(
            "lo",
            vec![private_ip([127, 0, 0, 1], 8)],
            IFF_UP | IFF_LOOPBACK,
        );
        assert_eq!(
            is_viable_interface(&interface),
            Err(ViabilityError::IsLoopback)
        );
    }

    #[test]
    fn point_to_point_is_rejected() {
        let interface = create_mock_interface(
            "tun0",
            vec![private_ip([10, 8, 0, 2], 24)],
            IFF_UP | IFF_POINTTOPOINT,
        );
        assert_eq!(
            is_viable_interface(&interface),
            Err(ViabilityError::IsPointToPoint)
        );
    }

    #[test]
    fn public_only_interface_is_rejected() {
        let interface = create_mock_interface(
            "eth0",
            vec![IpNetwork::V4(
                Ipv4Network::new(Ipv4Addr::new(203, 0, 113, 7), 24).unwrap(),
            )],
            IFF_UP | IFF_BROADCAST,
        );
        assert_eq!(
            is_viable_interface(&interface),
            Err(ViabilityError::NoPrivateIpv4)
        );
    }

    #[test]
    fn candidate_ranges_narrows_wide_prefixes() {
        let interfaces = vec![create_mock_interface(
            "eth0",
            vec![private_ip([10, 13, 37, 5], 16)],
            IFF_UP | IFF_BROADCAST,
        )];
        let ranges = candidate_ranges(&interfaces);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].to_string(), "10.13.37.0/24");
    }

    #[test]
    fn candidate_ranges_skips_loopback_and_dedupes() {
        let interfaces = vec![
            create_mock_interface(
                "lo",
                vec![private_ip([127, 0, 0, 1], 8)],
                IFF_UP | IFF_LOOPBACK,
            ),
            create_mock_interface(
                "eth0",
                vec![private_ip([192, 168, 1, 5], 24)],
                IFF_UP | IFF_BROADCAST,
            ),
            create_mock_interface(
                "wlan0",
                vec![private_ip([192, 168, 1, 9], 24)],
                IFF_UP | IFF_BROADCAST,
            ),
        ];
        let ranges = candidate_ranges(&interfaces);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].to_string(), "192.168.1.0/24");
    }

    #[test]
    fn fallback_list_parses_cleanly() {
        let ranges = fallback_ranges();
        assert_eq!(ranges.len(), FALLBACK_RANGES.len());
        assert_eq!(ranges[0].to_string(), "192.168.1.0/24");
    }

    #[test]
    fn route_to_localhost_resolves() {
        let source = route_source_ip(Ipv4Addr::LOCALHOST);
        assert_eq!(source, Some(Ipv4Addr::LOCALHOST));
    }
}
