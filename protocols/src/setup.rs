//! # Description Document
//!
//! Every plug serves a UPnP description at `/setup.xml`. The document
//! is XML but the plugs' output is rigid enough that scanning for tags
//! beats pulling in an XML parser.

use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use plugscout_common::device::{DeviceId, DeviceIdentity};

pub const SETUP_PATH: &str = "/setup.xml";

/// Substrings that mark a description document as a supported plug.
/// Matched against the lowercased document.
pub const SIGNATURE_MARKERS: &[&str] = &["urn:belkin", "wemo", "belkin"];

/// Does this document come from a plug we speak to?
pub fn is_plug_description(document: &str) -> bool {
    let lowered = document.to_lowercase();
    SIGNATURE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Fields pulled out of a description document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    pub udn: String,
    pub friendly_name: String,
    pub model: Option<String>,
    pub serial: Option<String>,
}

impl DeviceDescription {
    pub fn into_identity(self, addr: Ipv4Addr) -> DeviceIdentity {
        DeviceIdentity {
            id: DeviceId::new(self.udn),
            reported_name: self.friendly_name,
            model: self.model,
            serial: self.serial,
            addr,
        }
    }
}

/// Extract the identifying fields. The UDN is mandatory since it keys
/// the device registry; everything else degrades gracefully.
pub fn parse_description(document: &str) -> Result<DeviceDescription> {
    let udn = extract_tag(document, "UDN").context("description has no UDN element")?;
    let friendly_name =
        extract_tag(document, "friendlyName").unwrap_or_else(|| "Unknown Plug".to_string());
    Ok(DeviceDescription {
        udn,
        friendly_name,
        model: extract_tag(document, "modelName"),
        serial: extract_tag(document, "serialNumber"),
    })
}

/// First `<tag>...</tag>` text content, trimmed. Empty content counts
/// as absent.
fn extract_tag(document: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let start = document.find(&open)?;
    let after_open = start + document[start..].find('>')? + 1;
    let end = after_open + document[after_open..].find(&close)?;
    let content = document[after_open..end].trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
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
