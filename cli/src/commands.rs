pub mod devices;
pub mod discover;
pub mod manage;
pub mod scan;
pub mod status;
pub mod switch;
pub mod watch;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use plugscout_common::config::HubConfig;

use crate::commands::switch::Action;

#[derive(Parser)]
#[command(name = "plugscout")]
#[command(about = "Find and switch the smart plugs on your network.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Control port the plugs listen on
    #[arg(long, global = true, value_name = "PORT")]
    pub port: Option<u16>,

    /// Per-probe timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Probes in flight at once during a sweep
    #[arg(long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Accept any open port without checking the description document
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Where device aliases are stored
    #[arg(long, global = true, value_name = "FILE")]
    pub aliases: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a network range and show what a scan of it would cover
    #[command(alias = "v")]
    Validate { range: String },
    /// Sweep a range for plugs and add what answers
    #[command(alias = "s")]
    Scan(scan::ScanArgs),
    /// Find plugs by multicast search, sweep or explicit address
    #[command(alias = "d")]
    Discover(discover::DiscoverArgs),
    /// List every device on record
    #[command(alias = "ls")]
    Devices,
    /// Ask one address who it is and how it is switched, off the record
    #[command(alias = "p")]
    Probe { address: Ipv4Addr },
    /// Check every known device's state in parallel
    #[command(alias = "st")]
    Status,
    /// Switch a plug on
    On { device: String },
    /// Switch a plug off
    Off { device: String },
    /// Flip a plug's state
    #[command(alias = "t")]
    Toggle { device: String },
    /// Apply one switching action to every known device
    All {
        #[arg(value_enum)]
        action: Action,
    },
    /// Give a device a name of your own
    Rename { device: String, alias: String },
    /// Drop a device from the record, or all of them
    Forget {
        device: Option<String>,
        #[arg(long, conflicts_with = "device")]
        all: bool,
    },
    /// Keep discovering and reporting status until interrupted
    #[command(alias = "w")]
    Watch(watch::WatchArgs),
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Engine configuration with the global flags applied.
    pub fn hub_config(&self) -> HubConfig {
        let mut cfg = HubConfig::default();
        if let Some(port) = self.port {
            cfg.control_port = port;
        }
        if let Some(secs) = self.timeout {
            cfg.probe_timeout = Duration::from_secs_f64(secs.max(0.05));
        }
        if let Some(concurrency) = self.concurrency {
            cfg.scan_concurrency = concurrency.max(1);
        }
        if self.no_verify {
            cfg.verify_devices = false;
        }
        if let Some(path) = &self.aliases {
            cfg.alias_path = path.clone();
        }
        cfg
    }
}
