//! # plugscout engine
//!
//! Discovery and monitoring engine for LAN smart plugs:
//!
//! - sweeps network ranges for the control port, bounded and cancellable
//! - merges broadcast, sweep and manual candidates into one registry
//! - checks every known device's state in parallel under a deadline
//! - re-runs discovery in the background on a fixed interval
//!
//! [`service::Hub`] is the front door; everything else is wiring.

pub mod alias;
pub mod autodetect;
pub mod client;
pub mod discovery;
pub mod progress;
pub mod registry;
pub mod scanner;
pub mod scheduler;
pub mod service;
pub mod status;
