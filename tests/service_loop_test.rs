use skinguard::config::GuardConfig;
use skinguard::GuardService;
use skinguard_host::mock::MockHost;
use skinguard_host::{AssetInfo, Slot, WearRequest};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> GuardConfig {
    GuardConfig {
        data_dir: Some(dir.path().to_path_buf()),
        monitor_interval_seconds: 1.0,
        save_interval_seconds: 1.0,
        ..Default::default()
    }
}

fn host() -> Arc<MockHost> {
    let host = Arc::new(MockHost::new());
    host.add_asset(AssetInfo::wearable(211, Slot::Shirt, "Plaid Shirt"));
    host.add_asset(AssetInfo::wearable(212, Slot::Pants, "Khaki Pants"));
    host.add_asset(AssetInfo::wearable(900, Slot::Hat, "Twitch Drop Cap"));
    host
}

#[tokio::test(start_paused = true)]
async fn test_loop_sweeps_after_startup_delay() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    std::fs::write(config.ledger_path(), "1\n").unwrap();

    let host = host();
    let service = GuardService::load(config, host.clone()).await;
    let alice = host.connect(1, "alice");
    alice.put_on(Slot::Hat, 900);

    assert!(service.start().await);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(host.wears_for(1).is_empty(), "first tick waits for the startup delay");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(host.wears_for(1), vec![WearRequest::clear(Slot::Hat)]);
    assert_eq!(alice.equipment_now().unwrap().get(Slot::Hat), 0);

    service.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_loop_saves_ledger_after_debounce() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let host = host();
    let service = GuardService::load(config.clone(), host.clone()).await;

    host.connect(4, "dave");
    host.connect(2, "bob");
    service.start().await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(service.ledger().contains(2).await);
    assert!(service.ledger().contains(4).await);
    assert!(service.ledger().is_save_pending().await);
    assert!(!config.ledger_path().exists());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!service.ledger().is_save_pending().await);
    assert_eq!(
        std::fs::read_to_string(config.ledger_path()).unwrap(),
        "2\n4\n"
    );

    service.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_saves_pending_entries_immediately() {
    let dir = TempDir::new().unwrap();
    let config = GuardConfig {
        save_interval_seconds: 120.0,
        ..config_in(&dir)
    };
    let host = host();
    let service = GuardService::load(config.clone(), host.clone()).await;

    host.connect(9, "erin");
    service.start().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(service.ledger().is_save_pending().await);

    service.shutdown().await.unwrap();
    assert_eq!(
        std::fs::read_to_string(config.ledger_path()).unwrap(),
        "9\n"
    );

    // Nothing runs after shutdown
    host.clear_events();
    host.connect(10, "frank");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(host.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_starter_outfit_never_looked_up_by_loop() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    std::fs::write(config.ledger_path(), "1\n").unwrap();

    let host = host();
    let service = GuardService::load(config, host.clone()).await;
    let alice = host.connect(1, "alice");
    alice.put_on(Slot::Shirt, 211);
    alice.put_on(Slot::Pants, 212);

    service.start().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(host.asset_lookups(), 0);
    assert!(host.wears_for(1).is_empty());

    service.shutdown().await.unwrap();
}
