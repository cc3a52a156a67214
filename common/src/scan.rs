//! # Scan Vocabulary
//!
//! What a scan looks like from the outside: the target it was asked to
//! cover and the snapshot callers poll while it runs.

use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::network::range::NetworkRange;

/// How a scan was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    /// Full sweep of a network range.
    Network,
    /// Probe of one address.
    Single,
    /// Periodic pass the scheduler runs on its own.
    Background,
}

/// What a scan was asked to cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// Pick the most plausible local range automatically.
    Auto,
    Range(NetworkRange),
    Single(Ipv4Addr),
}

impl ScanTarget {
    /// Kind and human label for progress reporting.
    pub fn describe(&self) -> (ScanKind, String) {
        match self {
            ScanTarget::Auto => (ScanKind::Network, "automatic network scan".to_string()),
            ScanTarget::Range(range) => (ScanKind::Network, format!("scan of {range}")),
            ScanTarget::Single(addr) => (ScanKind::Single, format!("probe of {addr}")),
        }
    }
}

/// Point-in-time view of the scan slot. `idle()` when nothing runs.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSnapshot {
    pub active: bool,
    pub kind: Option<ScanKind>,
    pub label: String,
    /// 0..=100. Reaches 100 only when a scan completes.
    pub percent: u8,
    /// Short description of the current phase.
    pub step: String,
    pub scanned: usize,
    pub total: usize,
    pub found: usize,
    pub elapsed: Duration,
    pub eta: Option<Duration>,
    pub cancel_requested: bool,
    pub can_cancel: bool,
    pub started_at: Option<SystemTime>,
}

impl ScanSnapshot {
    pub fn idle() -> Self {
        Self {
            active: false,
            kind: None,
            label: String::new(),
            percent: 0,
            step: "Idle".to_string(),
            scanned: 0,
            total: 0,
            found: 0,
            elapsed: Duration::ZERO,
            eta: None,
            cancel_requested: false,
            can_cancel: false,
            started_at: None,
        }
    }
}
