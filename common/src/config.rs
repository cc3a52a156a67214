use std::path::PathBuf;
use std::time::Duration;

/// TCP port every supported plug serves its control endpoint on.
pub const CONTROL_PORT: u16 = 49153;

/// Engine tuning knobs.
///
/// The defaults are sized for home networks: a /24 sweep finishes in
/// well under a minute and a status pass over a dozen plugs in a couple
/// of seconds.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Port the plugs' control endpoint listens on.
    pub control_port: u16,
    /// Upper bound for a single connect or probe attempt.
    pub probe_timeout: Duration,
    /// Probes in flight at once during a sweep.
    pub scan_concurrency: usize,
    /// Fetch the description document before accepting a host whose
    /// port is open.
    pub verify_devices: bool,
    /// Status queries in flight at once during a batch check.
    pub status_concurrency: usize,
    /// Upper bound for one device's status query.
    pub status_timeout: Duration,
    /// Hard deadline for an entire status batch.
    pub status_deadline: Duration,
    /// How long to collect multicast discovery answers.
    pub broadcast_window: Duration,
    /// Pause between background discovery passes.
    pub background_interval: Duration,
    /// Where device aliases survive between runs.
    pub alias_path: PathBuf,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            control_port: CONTROL_PORT,
            probe_timeout: Duration::from_secs(2),
            scan_concurrency: 50,
            verify_devices: true,
            status_concurrency: 10,
            status_timeout: Duration::from_secs(5),
            status_deadline: Duration::from_secs(15),
            broadcast_window: Duration::from_secs(3),
            background_interval: Duration::from_secs(300),
            alias_path: PathBuf::from("plug_aliases.json"),
        }
    }
}
