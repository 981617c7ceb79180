//! Guard service: the long-lived owner of all engine state
//!
//! One `GuardService` per process. It holds the configuration, the host
//! handle, the classification cache, the ledger and the lifecycle tracker
//! behind a single `Arc`, and hands clones of that `Arc` to every task it
//! spawns (monitor loop, first-contact initializations, deferred re-checks).
//!
//! # Example
//!
//! ```rust,no_run
//! use skinguard::{GuardConfig, GuardService};
//! use skinguard_host::GameHost;
//! use std::sync::Arc;
//!
//! async fn run(host: Arc<dyn GameHost>) -> skinguard::Result<()> {
//!     let service = GuardService::load(GuardConfig::default(), host).await;
//!     service.start().await;
//!
//!     // ... forward equipment-change events to service.on_equipment_changed()
//!
//!     service.shutdown().await
//! }
//! ```

use crate::classify::ClassificationCache;
use crate::config::GuardConfig;
use crate::decide::{self, VisualToggles};
use crate::error::Result;
use crate::first_contact::InitOutcome;
use crate::ledger::LedgerStore;
use crate::lifecycle::LifecycleTracker;
use crate::reaction::ReactionOutcome;
use crate::stats::TickStats;
use skinguard_host::{EntityHandle, GameHost, ItemId, Slot};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Permission that exempts an entity from every enforcement action
pub const BYPASS_PERMISSION: &str = "noskins.bypass";

/// State shared by the service and every task it spawns
pub(crate) struct GuardState {
    pub(crate) config: GuardConfig,
    pub(crate) host: Arc<dyn GameHost>,
    pub(crate) cache: ClassificationCache,
    pub(crate) ledger: LedgerStore,
    pub(crate) lifecycle: LifecycleTracker,
    pub(crate) toggles: VisualToggles,
    pub(crate) shutdown: CancellationToken,
    /// Initializations and deferred re-checks still in flight
    pub(crate) tasks: TaskTracker,
}

impl GuardState {
    pub(crate) fn new(config: GuardConfig, host: Arc<dyn GameHost>, ledger: LedgerStore) -> Self {
        Self {
            cache: ClassificationCache::from_config(&config),
            toggles: decide::resolve_visual_toggles(&config),
            lifecycle: LifecycleTracker::new(),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            config,
            host,
            ledger,
        }
    }
}

pub struct GuardService {
    state: Arc<GuardState>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl GuardService {
    /// Build the service and load the ledger
    ///
    /// A missing or unreadable ledger starts empty.
    pub async fn load(config: GuardConfig, host: Arc<dyn GameHost>) -> Self {
        let ledger = LedgerStore::load(config.ledger_path(), config.save_interval()).await;
        info!(
            "Skinguard loaded | {} known entities | ledger: {}",
            ledger.len().await,
            ledger.path().display()
        );

        Self::with_ledger(config, host, ledger)
    }

    /// Build the service around an already loaded ledger
    pub fn with_ledger(config: GuardConfig, host: Arc<dyn GameHost>, ledger: LedgerStore) -> Self {
        Self {
            state: Arc::new(GuardState::new(config, host, ledger)),
            monitor: Mutex::new(None),
        }
    }

    /// Spawn the reconciliation loop
    ///
    /// Returns false if the loop is already running or the service is shut down.
    pub async fn start(&self) -> bool {
        let mut monitor = self.monitor.lock().await;
        if monitor.is_some() || self.state.shutdown.is_cancelled() {
            return false;
        }

        *monitor = Some(tokio::spawn(self.state.clone().run_loop()));
        true
    }

    /// Stop every task and force a final ledger save
    ///
    /// The save happens after in-flight initializations and re-checks have
    /// exited, so every registration they made is written.
    pub async fn shutdown(&self) -> Result<()> {
        self.state.shutdown.cancel();

        let handle = self.monitor.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Monitor loop ended abnormally: {}", e);
            }
        }

        self.state.tasks.close();
        self.state.tasks.wait().await;

        self.state.ledger.flush_now().await?;
        info!("Skinguard stopped");
        Ok(())
    }

    /// Run one reconciliation pass now
    pub async fn tick(&self) -> TickStats {
        self.state.tick().await
    }

    /// Host hook for an equipment change on one slot
    pub async fn on_equipment_changed(
        &self,
        entity: Arc<dyn EntityHandle>,
        slot: Slot,
        item: ItemId,
        quality: Option<u8>,
    ) -> ReactionOutcome {
        self.state
            .on_equipment_changed(entity, slot, item, quality)
            .await
    }

    /// Run first-contact initialization for one entity and wait for it
    ///
    /// Hosts with a connect event can call this directly instead of waiting
    /// for the next tick to launch it.
    pub async fn initialize_entity(&self, entity: Arc<dyn EntityHandle>) -> InitOutcome {
        if !self.state.lifecycle.try_begin_init(entity.id()).await {
            return InitOutcome::AlreadyInitialized;
        }

        // Tracked so that shutdown waits for it like a loop-launched one
        let task = self.state.tasks.spawn(self.state.clone().first_contact(entity));
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Initialization task failed: {}", e);
                InitOutcome::Cancelled
            }
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.state.config
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.state.ledger
    }

    pub fn lifecycle(&self) -> &LifecycleTracker {
        &self.state.lifecycle
    }

    pub fn cache(&self) -> &ClassificationCache {
        &self.state.cache
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.shutdown.is_cancelled()
    }

    pub async fn is_running(&self) -> bool {
        self.monitor
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
