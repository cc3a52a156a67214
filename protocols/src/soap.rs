//! # Basicevent Service
//!
//! Relay state is read and switched through SOAP calls against the
//! basicevent service. The envelope format is fixed per the UPnP
//! template the plugs ship with.

use anyhow::{Context, Result};
use plugscout_common::device::PowerState;

pub const CONTROL_PATH: &str = "/upnp/control/basicevent1";
pub const SERVICE_TYPE: &str = "urn:Belkin:service:basicevent:1";

/// Value for the SOAPACTION header, quotes included.
pub fn soap_action(action: &str) -> String {
    format!("\"{SERVICE_TYPE}#{action}\"")
}

pub fn get_state_body() -> String {
    envelope("GetBinaryState", "")
}

pub fn set_state_body(on: bool) -> String {
    let argument = format!("<BinaryState>{}</BinaryState>", u8::from(on));
    envelope("SetBinaryState", &argument)
}

fn envelope(action: &str, arguments: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
         <s:Body><u:{action} xmlns:u=\"{SERVICE_TYPE}\">{arguments}</u:{action}>\
         </s:Body></s:Envelope>"
    )
}

/// Pull the relay state out of a SOAP response body.
///
/// Energy-metering models report a pipe-separated reading
/// ("8|1644|...") in the same element; only the first token is the
/// switch state. Values other than 0 and 1 come back as
/// [`PowerState::Unknown`].
pub fn parse_binary_state(body: &str) -> Result<PowerState> {
    let open = body
        .find("<BinaryState>")
        .context("response has no BinaryState element")?;
    let start = open + "<BinaryState>".len();
    let end = start
        + body[start..]
            .find("</BinaryState>")
            .context("BinaryState element is not closed")?;
    let value = body[start..end].trim();
    let first = value.split('|').next().unwrap_or(value);
    Ok(match first {
        "0" => PowerState::Off,
        "1" => PowerState::On,
        _ => PowerState::Unknown,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
