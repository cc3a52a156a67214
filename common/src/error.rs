//! # Error Taxonomy
//!
//! Two families of recoverable errors cross the crate boundary:
//! - [`ValidationError`] for user-supplied network range strings
//! - [`HubError`] for engine operations that fail for a nameable reason
//!
//! Everything else travels as `anyhow::Error` with context attached at
//! the point of failure.

use thiserror::Error;

use crate::device::DeviceId;
use crate::scan::ScanSnapshot;

/// Reasons a network range string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("network range cannot be empty")]
    Empty,
    #[error("malformed network range: {0}")]
    Malformed(String),
    #[error("invalid address: {0}")]
    Address(String),
    #[error("invalid prefix length: {0}")]
    Prefix(String),
    #[error("invalid subnet mask: {0}")]
    Mask(String),
}

/// Failures of engine operations with a cause the caller can act on.
#[derive(Debug, Error)]
pub enum HubError {
    /// Only one scan may hold the progress slot at a time. Carries a
    /// snapshot of the scan that is in the way.
    #[error("another scan is already running ({})", .0.label)]
    ScanActive(Box<ScanSnapshot>),
    #[error("no scan is currently running")]
    NoScanRunning,
    #[error("no device on record with id {0}")]
    UnknownDevice(DeviceId),
    /// A spawned worker panicked or was torn down mid-flight.
    #[error("worker task failed: {0}")]
    Task(String),
}
