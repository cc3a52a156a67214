//! Shared vocabulary of the plugscout workspace: the device and range
//! models, the boundary DTOs, the collaborator traits and the error
//! taxonomy. Everything here is I/O-free.

pub mod config;
pub mod control;
pub mod device;
pub mod discovery;
pub mod error;
pub mod log;
pub mod network;
pub mod scan;

/// Re-exported so the log macros resolve in crates that do not pull in
/// `tracing` themselves.
pub use tracing;
