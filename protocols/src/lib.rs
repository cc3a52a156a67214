//! # Plug Control Protocol
//!
//! Builders and parsers for the three wire surfaces a plug exposes:
//!
//! - `http` — minimal HTTP/1.1 requests and response parsing
//! - `setup` — the UPnP description document at `/setup.xml`
//! - `soap` — the basicevent service for reading and switching state
//! - `ssdp` — the multicast search that plugs answer
//!
//! Everything here is pure: bytes in, structures out. Sockets live in
//! the core crate.

pub mod http;
pub mod setup;
pub mod soap;
pub mod ssdp;
