use async_trait::async_trait;
use skinguard::config::GuardConfig;
use skinguard::{GuardService, InitOutcome, ReactionOutcome};
use skinguard_host::mock::{HostEvent, MockHost};
use skinguard_host::{AssetInfo, Color, EntityHandle, EntityId, GameHost, ItemId, Result, Slot};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Mock host whose permission and asset lookups take a while to answer
struct SlowHost {
    inner: Arc<MockHost>,
    permission_delay: Duration,
    asset_delay: Duration,
}

#[async_trait]
impl GameHost for SlowHost {
    async fn roster(&self) -> Result<Vec<Arc<dyn EntityHandle>>> {
        self.inner.roster().await
    }

    async fn is_online(&self, id: EntityId) -> bool {
        self.inner.is_online(id).await
    }

    async fn find_asset(&self, id: ItemId) -> Result<Option<AssetInfo>> {
        tokio::time::sleep(self.asset_delay).await;
        self.inner.find_asset(id).await
    }

    async fn has_permission(&self, id: EntityId, permission: &str) -> Result<bool> {
        tokio::time::sleep(self.permission_delay).await;
        self.inner.has_permission(id, permission).await
    }

    async fn notify(&self, id: EntityId, message: &str, color: Color) -> Result<()> {
        self.inner.notify(id, message, color).await
    }
}

fn mock_host() -> Arc<MockHost> {
    let host = Arc::new(MockHost::new());
    host.add_asset(AssetInfo::wearable(211, Slot::Shirt, "Plaid Shirt"));
    host.add_asset(AssetInfo::wearable(212, Slot::Pants, "Khaki Pants"));
    host.add_asset(AssetInfo::wearable(900, Slot::Hat, "Twitch Drop Cap"));
    host
}

fn slow(inner: &Arc<MockHost>, permission_ms: u64, asset_ms: u64) -> Arc<SlowHost> {
    Arc::new(SlowHost {
        inner: inner.clone(),
        permission_delay: Duration::from_millis(permission_ms),
        asset_delay: Duration::from_millis(asset_ms),
    })
}

fn config_in(dir: &TempDir) -> GuardConfig {
    GuardConfig {
        data_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_permission_lookup_stops_initialization() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let mock = mock_host();
    let service = Arc::new(GuardService::load(config.clone(), slow(&mock, 100, 0)).await);

    let alice = mock.connect(1, "alice");
    alice.put_on(Slot::Hat, 40);

    let task = {
        let service = service.clone();
        let alice = alice.clone();
        tokio::spawn(async move { service.initialize_entity(alice).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    service.shutdown().await.unwrap();

    assert_eq!(task.await.unwrap(), InitOutcome::Cancelled);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(mock.events().is_empty(), "no mutation after shutdown");
    assert_eq!(alice.equipment_now().unwrap().get(Slot::Hat), 40);
    assert!(!service.ledger().contains(1).await);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_after_strip_still_dresses_and_saves() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let mock = mock_host();
    let service = Arc::new(GuardService::load(config.clone(), slow(&mock, 0, 100)).await);

    let alice = mock.connect(1, "alice");
    alice.put_on(Slot::Hat, 40);

    let task = {
        let service = service.clone();
        let alice = alice.clone();
        tokio::spawn(async move { service.initialize_entity(alice).await })
    };

    // Template validation takes 100ms, then the strip and the settle delay
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!mock.wears_for(1).is_empty(), "strip has started");
    service.shutdown().await.unwrap();

    assert_eq!(task.await.unwrap(), InitOutcome::FirstContact);
    let worn = alice.equipment_now().unwrap();
    assert_eq!(worn.get(Slot::Shirt), 211);
    assert_eq!(worn.get(Slot::Pants), 212);
    assert_eq!(worn.get(Slot::Hat), 0);

    // Registration made during shutdown reaches the disk
    assert_eq!(
        std::fs::read_to_string(config.ledger_path()).unwrap(),
        "1\n"
    );

    // Dressing completes, but the welcome message is not sent
    assert!(mock.messages_for(1).is_empty());

    let events = mock.events().len();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(mock.events().len(), events);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_deferred_recheck() {
    let dir = TempDir::new().unwrap();
    let mock = mock_host();
    let service = GuardService::load(config_in(&dir), slow(&mock, 0, 0)).await;

    let alice = mock.connect(1, "alice");
    alice.put_on(Slot::Hat, 900);

    let outcome = service
        .on_equipment_changed(alice.clone(), Slot::Hat, 900, None)
        .await;
    assert_eq!(outcome, ReactionOutcome::Blocked);

    service.shutdown().await.unwrap();
    let wears = mock.wears_for(1).len();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The re-check was cancelled: no second clear, no message
    assert_eq!(wears, 1);
    assert_eq!(mock.wears_for(1).len(), 1);
    assert!(mock.messages_for(1).is_empty());
    assert!(!mock
        .events()
        .iter()
        .any(|event| matches!(event, HostEvent::Notify { .. })));
}
