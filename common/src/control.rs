//! # Control Seams
//!
//! Traits the engine talks to plugs through. The production
//! implementations live in the core crate; tests substitute scripted
//! fakes.

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::device::{DeviceIdentity, PowerState};

/// A switching action expressed independently of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlugCommand {
    TurnOn,
    TurnOff,
    Toggle,
}

/// Talks the control protocol to one plug at a time.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Fetch and parse the description document.
    async fn identify(&self, addr: Ipv4Addr) -> Result<DeviceIdentity>;

    /// Ask the plug for its relay state.
    async fn query_state(&self, addr: Ipv4Addr) -> Result<PowerState>;

    /// Apply a command and report the resulting state.
    async fn invoke(&self, addr: Ipv4Addr, command: PlugCommand) -> Result<PowerState>;
}

/// Finds plugs that answer a multicast search.
#[async_trait]
pub trait BroadcastDiscovery: Send + Sync {
    /// Collect answering addresses for `window` before returning.
    async fn discover(&self, window: Duration) -> Result<Vec<Ipv4Addr>>;
}
