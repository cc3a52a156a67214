use std::net::Ipv4Addr;
use std::sync::Arc;

use plugscout_common::device::DeviceId;
use plugscout_common::discovery::DiscoveryRequest;
use plugscout_common::error::HubError;
use plugscout_common::network::range::NetworkRange;
use plugscout_common::scan::ScanTarget;
use plugscout_core::service::Hub;

use crate::fake::{BlackHole, FakePlug, drop_alias_file, test_config};

fn ip(d: u8) -> Ipv4Addr {
    Ipv4Addr::new(127, 0, 0, d)
}

fn manual(addresses: &str) -> DiscoveryRequest {
    DiscoveryRequest {
        broadcast: false,
        manual: Some(addresses.to_string()),
        ..DiscoveryRequest::default()
    }
}

/*************************************************************
                  Tests for sweep discovery
**************************************************************/

#[tokio::test]
async fn sweep_finds_loopback_plugs_and_merges() {
    let a = FakePlug::spawn(ip(11), 0, "uuid:Socket-1_0-AA", "Lamp A", true)
        .await
        .unwrap();
    let b = FakePlug::spawn(ip(12), a.port, "uuid:Socket-1_0-BB", "Lamp B", false)
        .await
        .unwrap();

    let cfg = test_config("sweep", a.port);
    let hub = Hub::new(cfg).await;

    // /28 covers 127.0.0.1 through .14; only .11 and .12 answer.
    let range = "127.0.0.0/28".parse().unwrap();
    let summary = hub.scan(ScanTarget::Range(range)).await.unwrap();

    assert_eq!(summary.added, 2, "failures: {:?}", summary.strategy_failures);
    assert_eq!(summary.failed, 0);

    let devices = hub.device_list().await;
    let names: Vec<&str> = devices.iter().map(|d| d.display_name()).collect();
    assert_eq!(names, vec!["Lamp A", "Lamp B"]);
    assert_eq!(devices[1].addr, b.addr);

    let progress = hub.scan_progress();
    assert!(!progress.active, "scan slot must be idle after the sweep");

    drop_alias_file(hub.config());
}

#[tokio::test]
async fn single_address_scan_adds_one_device() {
    let plug = FakePlug::spawn(ip(15), 0, "uuid:Socket-1_0-CC", "Heater", true)
        .await
        .unwrap();

    let cfg = test_config("single", plug.port);
    let hub = Hub::new(cfg).await;

    let summary = hub.scan(ScanTarget::Single(plug.addr)).await.unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(hub.device_list().await.len(), 1);

    drop_alias_file(hub.config());
}

#[tokio::test]
async fn discovery_is_rejected_while_a_scan_runs() {
    // Black holes keep each probe busy for its full timeout, so the
    // sweep holds the scan slot long enough to collide with.
    let first = BlackHole::spawn(Ipv4Addr::new(127, 0, 1, 1), 0).await.unwrap();
    let port = first.port;
    let mut holes = vec![first];
    for d in 2..=6 {
        holes.push(
            BlackHole::spawn(Ipv4Addr::new(127, 0, 1, d), port)
                .await
                .unwrap(),
        );
    }

    let mut cfg = test_config("slot", port);
    cfg.scan_concurrency = 1;
    let hub = Arc::new(Hub::new(cfg).await);

    let range: NetworkRange = "127.0.1.0/29".parse().unwrap();
    let scan = {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move { hub.scan(ScanTarget::Range(range)).await })
    };
    while !hub.scan_progress().active {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let err = hub.discover(manual("127.0.1.9")).await.unwrap_err();
    match err {
        HubError::ScanActive(snapshot) => assert!(snapshot.active),
        other => panic!("unexpected error: {other:?}"),
    }

    hub.cancel_scan().unwrap();
    scan.await.unwrap().unwrap();
    assert!(!hub.scan_progress().active);

    drop_alias_file(hub.config());
}

/*************************************************************
               Tests for merge and alias behavior
**************************************************************/

#[tokio::test]
async fn address_change_keeps_identity_and_alias() {
    let udn = "uuid:Socket-1_0-MOVE";
    let first = FakePlug::spawn(ip(21), 0, udn, "Wemo Mini", true)
        .await
        .unwrap();

    let cfg = test_config("move", first.port);
    let hub = Hub::new(cfg).await;

    let summary = hub.discover(manual("127.0.0.21")).await.unwrap();
    assert_eq!(summary.added, 1);

    let id = DeviceId::new(udn);
    hub.rename_device(&id, "Desk Lamp").await.unwrap();

    // Same plug, new DHCP lease.
    first.stop();
    let second = FakePlug::spawn(ip(22), first.port, udn, "Wemo Mini", true)
        .await
        .unwrap();

    let summary = hub.discover(manual("127.0.0.22")).await.unwrap();
    assert_eq!(summary.added, 0);
    assert_eq!(summary.already_known, 1);

    let devices = hub.device_list().await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].addr, second.addr);
    assert_eq!(devices[0].display_name(), "Desk Lamp");

    drop_alias_file(hub.config());
}

#[tokio::test]
async fn alias_survives_a_hub_restart() {
    let plug = FakePlug::spawn(ip(31), 0, "uuid:Socket-1_0-DD", "Outdoor", true)
        .await
        .unwrap();
    let cfg = test_config("restart", plug.port);

    {
        let hub = Hub::new(cfg.clone()).await;
        hub.discover(manual("127.0.0.31")).await.unwrap();
        hub.rename_device(&DeviceId::new("uuid:Socket-1_0-DD"), "Porch")
            .await
            .unwrap();
        hub.shutdown().await;
    }

    // A fresh process rebuilds the registry but reads the alias file.
    let hub = Hub::new(cfg).await;
    assert!(hub.device_list().await.is_empty());

    hub.discover(manual("127.0.0.31")).await.unwrap();
    let devices = hub.device_list().await;
    assert_eq!(devices[0].display_name(), "Porch");

    drop_alias_file(hub.config());
}

#[tokio::test]
async fn manual_batch_commits_successes_past_failures() {
    let plug = FakePlug::spawn(ip(41), 0, "uuid:Socket-1_0-EE", "Fan", false)
        .await
        .unwrap();

    let cfg = test_config("batch", plug.port);
    let hub = Hub::new(cfg).await;

    // .42 refuses the connection and "bogus" never parses.
    let summary = hub
        .discover(manual("127.0.0.41, 127.0.0.42; bogus"))
        .await
        .unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.outcomes.len(), 3);
    assert_eq!(hub.device_list().await.len(), 1);

    drop_alias_file(hub.config());
}
