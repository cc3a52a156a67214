//! # Discovery Vocabulary
//!
//! Requests and result rows for discovery passes. A pass combines up
//! to three strategies: multicast broadcast, a range sweep and a list
//! of manually supplied addresses.

use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::device::DeviceId;
use crate::network::range::NetworkRange;

/// What one discovery pass should attempt.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    /// Send a multicast search and collect answers.
    pub broadcast: bool,
    /// Sweep this range for open control ports.
    pub sweep: Option<NetworkRange>,
    /// Raw user input with candidate addresses, split on whitespace,
    /// commas and semicolons.
    pub manual: Option<String>,
}

/// What happened to one candidate address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "outcome", content = "detail")]
pub enum MergeOutcome {
    Added(DeviceId),
    AlreadyKnown(DeviceId),
    Failed(String),
}

/// One candidate address and how it fared.
#[derive(Debug, Clone, Serialize)]
pub struct AddressOutcome {
    /// The candidate as the caller supplied it.
    pub input: String,
    pub outcome: MergeOutcome,
}

/// Tally of a discovery pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoverySummary {
    pub added: usize,
    pub already_known: usize,
    pub failed: usize,
    /// Whole strategies that produced no candidates at all.
    pub strategy_failures: Vec<String>,
    pub outcomes: Vec<AddressOutcome>,
}

impl DiscoverySummary {
    /// Record one candidate's outcome and bump the matching counter.
    pub fn record(&mut self, input: impl Into<String>, outcome: MergeOutcome) {
        match &outcome {
            MergeOutcome::Added(_) => self.added += 1,
            MergeOutcome::AlreadyKnown(_) => self.already_known += 1,
            MergeOutcome::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(AddressOutcome {
            input: input.into(),
            outcome,
        });
    }
}

/// State of the background discovery machinery.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryStatus {
    pub auto_enabled: bool,
    pub scheduler_running: bool,
    /// Discovery passes completed so far, manual and scheduled alike.
    pub runs: u64,
    pub last_run: Option<SystemTime>,
    pub interval: Duration,
    pub known_devices: usize,
}

/// Split free-form address input into candidate tokens.
pub fn split_manual_input(input: &str) -> Vec<String> {
    input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
