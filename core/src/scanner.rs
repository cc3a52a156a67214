//! # Port Sweep
//!
//! Probes every host in a range against the control port with bounded
//! concurrency. Each probe is a plain TCP connect inside a timeout;
//! the strict variant additionally fetches the description document
//! so an unrelated open port does not count as a plug.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

use plugscout_common::config::HubConfig;
use plugscout_common::error::HubError;
use plugscout_common::network::range::NetworkRange;
use plugscout_protocols::{http, setup};

use crate::progress::ScanGuard;

#[derive(Debug, Clone, Copy)]
pub struct SweepOptions {
    pub port: u16,
    pub probe_timeout: Duration,
    pub concurrency: usize,
    /// Fetch and check the description document before accepting a
    /// host whose port is open.
    pub verify: bool,
}

impl From<&HubConfig> for SweepOptions {
    fn from(cfg: &HubConfig) -> Self {
        Self {
            port: cfg.control_port,
            probe_timeout: cfg.probe_timeout,
            concurrency: cfg.scan_concurrency.max(1),
            verify: cfg.verify_devices,
        }
    }
}

/// Sweep every usable host in `range`.
pub async fn sweep(
    range: &NetworkRange,
    opts: SweepOptions,
    guard: &ScanGuard,
) -> Result<Vec<Ipv4Addr>> {
    let hosts: Vec<Ipv4Addr> = range.hosts().collect();
    sweep_hosts(hosts, opts, guard).await
}

/// Sweep an explicit host list. Probes run concurrently up to
/// `opts.concurrency`; every completion is reported to `guard`.
/// Cancellation is observed between dispatches, so the result holds
/// whatever was found up to that point.
pub async fn sweep_hosts(
    hosts: Vec<Ipv4Addr>,
    opts: SweepOptions,
    guard: &ScanGuard,
) -> Result<Vec<Ipv4Addr>> {
    guard.set_total(hosts.len());
    guard.set_step(format!("Scanning {} host(s)", hosts.len()));

    let semaphore = Arc::new(Semaphore::new(opts.concurrency));
    let mut probes: JoinSet<(Ipv4Addr, bool)> = JoinSet::new();
    let mut found: Vec<Ipv4Addr> = Vec::new();

    for addr in hosts {
        if guard.cancel_requested() {
            guard.set_step("Cancelling, letting probes drain");
            break;
        }
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("scan semaphore closed")?;
        probes.spawn(async move {
            let open = probe(addr, opts).await;
            drop(permit);
            (addr, open)
        });
        drain_finished(&mut probes, guard, &mut found)?;
    }

    // Let in-flight probes drain; cancellation only stops new dispatches.
    while let Some(joined) = probes.join_next().await {
        record(joined, guard, &mut found)?;
    }

    found.sort_unstable();
    Ok(found)
}

/// One address: does a plug answer there?
pub async fn probe(addr: Ipv4Addr, opts: SweepOptions) -> bool {
    let stream = match timeout(opts.probe_timeout, TcpStream::connect((addr, opts.port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(_)) | Err(_) => return false,
    };
    if !opts.verify {
        return true;
    }
    match verify_description(stream, addr, opts).await {
        Ok(confirmed) => confirmed,
        // Port open but description unreadable still counts: some
        // firmwares drop the first connection after boot.
        Err(_) => true,
    }
}

async fn verify_description(
    mut stream: TcpStream,
    addr: Ipv4Addr,
    opts: SweepOptions,
) -> Result<bool> {
    let request = http::get_request(&format!("{addr}:{}", opts.port), setup::SETUP_PATH);
    timeout(opts.probe_timeout, stream.write_all(request.as_bytes()))
        .await
        .context("description request timed out")??;

    let mut raw = Vec::new();
    timeout(opts.probe_timeout, stream.read_to_end(&mut raw))
        .await
        .context("description read timed out")??;

    let response = http::parse_response(&raw)?;
    Ok(response.is_success() && setup::is_plug_description(&response.body))
}

fn drain_finished(
    probes: &mut JoinSet<(Ipv4Addr, bool)>,
    guard: &ScanGuard,
    found: &mut Vec<Ipv4Addr>,
) -> Result<()> {
    while let Some(joined) = probes.try_join_next() {
        record(joined, guard, found)?;
    }
    Ok(())
}

fn record(
    joined: std::result::Result<(Ipv4Addr, bool), tokio::task::JoinError>,
    guard: &ScanGuard,
    found: &mut Vec<Ipv4Addr>,
) -> Result<()> {
    let (addr, open) = joined.map_err(|e| HubError::Task(format!("probe worker: {e}")))?;
    guard.probe_done(open);
    if open {
        found.push(addr);
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ScanProgress;
    use plugscout_common::scan::ScanKind;
    use tokio::net::TcpListener;

    fn options(port: u16, verify: bool) -> SweepOptions {
        SweepOptions {
            port,
            probe_timeout: Duration::from_millis(500),
            concurrency: 8,
            verify,
        }
    }

    async fn loopback_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn open_port_is_found_without_verification() {
        let (_listener, port) = loopback_listener().await;
        let progress = ScanProgress::new();
        let guard = progress.begin(ScanKind::Single, "probe", 1).unwrap();

        let found = sweep_hosts(vec![Ipv4Addr::LOCALHOST], options(port, false), &guard)
            .await
            .unwrap();

        assert_eq!(found, vec![Ipv4Addr::LOCALHOST]);
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.scanned, 1);
        assert_eq!(snapshot.found, 1);
        guard.finish("done");
    }

    #[tokio::test]
    async fn closed_port_is_not_found() {
        let (listener, port) = loopback_listener().await;
        drop(listener);
        let progress = ScanProgress::new();
        let guard = progress.begin(ScanKind::Single, "probe", 1).unwrap();

        let found = sweep_hosts(vec![Ipv4Addr::LOCALHOST], options(port, false), &guard)
            .await
            .unwrap();

        assert!(found.is_empty());
        assert_eq!(progress.snapshot().found, 0);
        guard.finish("done");
    }

    #[tokio::test]
    async fn cancelled_before_start_returns_empty() {
        let (_listener, port) = loopback_listener().await;
        let progress = ScanProgress::new();
        let guard = progress.begin(ScanKind::Network, "scan", 4).unwrap();
        progress.request_cancel().unwrap();

        let hosts = vec![Ipv4Addr::LOCALHOST; 4];
        let found = sweep_hosts(hosts, options(port, false), &guard)
            .await
            .unwrap();

        assert!(found.is_empty());
        assert_eq!(progress.snapshot().scanned, 0);
        guard.abort("cancelled");
    }

    #[tokio::test]
    async fn cancel_mid_sweep_keeps_partial_results() {
        // Open ports that never answer: with verification on, each
        // probe runs for the full timeout, so the sweep stays busy
        // long enough to cancel it from outside.
        let hosts: Vec<Ipv4Addr> = (1..=5).map(|d| Ipv4Addr::new(127, 0, 9, d)).collect();
        let first = TcpListener::bind((hosts[0], 0)).await.unwrap();
        let port = first.local_addr().unwrap().port();
        let mut silent = vec![first];
        for addr in &hosts[1..] {
            silent.push(TcpListener::bind((*addr, port)).await.unwrap());
        }

        let opts = SweepOptions {
            port,
            probe_timeout: Duration::from_millis(200),
            concurrency: 1,
            verify: true,
        };
        let progress = ScanProgress::new();
        let guard = progress
            .begin(ScanKind::Network, "scan", hosts.len())
            .unwrap();

        let all = hosts.clone();
        let sweep = tokio::spawn(async move {
            let found = sweep_hosts(all, opts, &guard).await.unwrap();
            guard.abort("Scan cancelled");
            found
        });

        while progress.snapshot().scanned == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        progress.request_cancel().unwrap();

        let found = sweep.await.unwrap();
        let snapshot = progress.snapshot();
        assert!(snapshot.scanned >= 1);
        assert!(
            snapshot.scanned < hosts.len(),
            "cancel must stop new dispatches, scanned {}",
            snapshot.scanned
        );
        assert!(found.iter().all(|a| hosts.contains(a)));
        assert_eq!(found.len(), snapshot.found);
        assert!(!snapshot.active, "slot must be idle after a cancelled sweep");
    }

    async fn canned_responder(listener: TcpListener, body: &'static str) {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buffer = [0u8; 1024];
                let _ = stream.read(&mut buffer).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    }

    #[tokio::test]
    async fn verification_accepts_plug_descriptions() {
        let (listener, port) = loopback_listener().await;
        let server = tokio::spawn(canned_responder(
            listener,
            "<root><device><UDN>uuid:Socket-1_0-X</UDN></device>urn:Belkin</root>",
        ));

        assert!(probe(Ipv4Addr::LOCALHOST, options(port, true)).await);
        server.abort();
    }

    #[tokio::test]
    async fn verification_rejects_foreign_services() {
        let (listener, port) = loopback_listener().await;
        let server = tokio::spawn(canned_responder(
            listener,
            "<html><body>It works!</body></html>",
        ));

        assert!(!probe(Ipv4Addr::LOCALHOST, options(port, true)).await);
        server.abort();
    }
}
