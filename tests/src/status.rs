use std::net::Ipv4Addr;

use plugscout_common::control::PlugCommand;
use plugscout_common::device::{Connectivity, PowerState};
use plugscout_common::discovery::DiscoveryRequest;
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
                 Tests for batch status checks
**************************************************************/

#[tokio::test]
async fn batch_classifies_online_offline_and_wedged() {
    let on = FakePlug::spawn(ip(51), 0, "uuid:Socket-1_0-ON", "Lamp", true)
        .await
        .unwrap();
    let off = FakePlug::spawn(ip(52), on.port, "uuid:Socket-1_0-OFF", "Fan", false)
        .await
        .unwrap();
    let victim = FakePlug::spawn(ip(53), on.port, "uuid:Socket-1_0-DEAD", "Heater", true)
        .await
        .unwrap();

    let cfg = test_config("classify", on.port);
    let hub = Hub::new(cfg).await;
    let summary = hub
        .discover(manual("127.0.0.51 127.0.0.52 127.0.0.53"))
        .await
        .unwrap();
    assert_eq!(summary.added, 3);

    // The third plug wedges: the port stays open but nothing answers.
    victim.stop();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let _hole = BlackHole::spawn(ip(53), on.port).await.unwrap();

    let report = hub.device_status().await;

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.online, 2);
    assert_eq!(report.summary.offline, 1);
    assert_eq!(report.summary.unknown, 0);

    let row = |name: &str| {
        report
            .devices
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no row for {name}"))
    };
    assert_eq!(row("Lamp").power, PowerState::On);
    assert_eq!(row("Fan").power, PowerState::Off);

    let wedged = row("Heater");
    assert_eq!(wedged.connectivity, Connectivity::Offline);
    assert!(wedged.detail.is_some(), "offline row must say why");
    assert!(!off.is_on());

    drop_alias_file(hub.config());
}

#[tokio::test]
async fn stopped_plug_reports_offline_quickly() {
    let plug = FakePlug::spawn(ip(61), 0, "uuid:Socket-1_0-GONE", "Lamp", true)
        .await
        .unwrap();

    let cfg = test_config("gone", plug.port);
    let deadline = cfg.status_deadline;
    let hub = Hub::new(cfg).await;
    hub.discover(manual("127.0.0.61")).await.unwrap();

    plug.stop();
    drop(plug);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let report = hub.device_status().await;
    assert_eq!(report.summary.offline, 1);
    assert!(
        report.elapsed < deadline,
        "a refused connection must not eat the whole deadline"
    );

    drop_alias_file(hub.config());
}

/*************************************************************
                  Tests for switching plugs
**************************************************************/

#[tokio::test]
async fn control_all_switches_every_plug() {
    let a = FakePlug::spawn(ip(71), 0, "uuid:Socket-1_0-SA", "Lamp", true)
        .await
        .unwrap();
    let b = FakePlug::spawn(ip(72), a.port, "uuid:Socket-1_0-SB", "Fan", false)
        .await
        .unwrap();

    let cfg = test_config("switch-all", a.port);
    let hub = Hub::new(cfg).await;
    hub.discover(manual("127.0.0.71 127.0.0.72")).await.unwrap();

    let rows = hub.control_all(PlugCommand::TurnOff).await;
    assert_eq!(rows.len(), 2);
    for (device, outcome) in &rows {
        let state = outcome
            .as_ref()
            .unwrap_or_else(|e| panic!("{} failed: {e}", device.display_name()));
        assert_eq!(*state, PowerState::Off);
    }
    assert!(!a.is_on());
    assert!(!b.is_on());

    drop_alias_file(hub.config());
}

#[tokio::test]
async fn toggle_flips_through_the_wire() {
    let plug = FakePlug::spawn(ip(81), 0, "uuid:Socket-1_0-TG", "Lamp", false)
        .await
        .unwrap();

    let cfg = test_config("toggle", plug.port);
    let hub = Hub::new(cfg).await;

    let state = hub
        .control_address(plug.addr, PlugCommand::Toggle)
        .await
        .unwrap();
    assert_eq!(state, PowerState::On);
    assert!(plug.is_on());

    let state = hub
        .control_address(plug.addr, PlugCommand::Toggle)
        .await
        .unwrap();
    assert_eq!(state, PowerState::Off);
    assert!(!plug.is_on());

    drop_alias_file(hub.config());
}
