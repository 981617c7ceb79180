//! Reconciliation loop
//!
//! Polls the host roster at a fixed period and, for every connected entity:
//! - **Track:** update dead/alive state and the respawn window
//! - **Initialize:** launch first contact once per connection
//! - **Suppress:** force the configured rendering switches off
//! - **Sweep:** remove worn cosmetics unless only starter items are worn
//! - **Respawn:** re-dress entities that respawned naked
//!
//! Afterwards it purges records of disconnected entities and gives the
//! ledger a chance to save.

use crate::decide::{self, RespawnAction};
use crate::lifecycle::Transition;
use crate::service::GuardState;
use crate::stats::{TickStats, TickStatsBuilder};
use skinguard_host::{EntityHandle, EntityId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay between service start and the first tick
pub const STARTUP_DELAY: Duration = Duration::from_secs(1);

impl GuardState {
    /// Main loop; exits once the shutdown token is cancelled
    pub(crate) async fn run_loop(self: Arc<Self>) {
        let interval = self.config.monitor_interval();
        info!(
            "Skinguard monitor active | interval: {:?} | save debounce: {:?}",
            interval,
            self.config.save_interval()
        );

        tokio::select! {
            _ = self.shutdown.cancelled() => return,
            _ = tokio::time::sleep(STARTUP_DELAY) => {}
        }

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let stats = self.tick().await;
            debug!("{}", stats.summary());

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Skinguard monitor stopped");
    }

    /// One reconciliation pass over the roster
    pub(crate) async fn tick(self: &Arc<Self>) -> TickStats {
        let mut stats = TickStatsBuilder::new();

        if self.shutdown.is_cancelled() {
            stats.record_aborted();
            return stats.finish();
        }

        let roster = match self.host.roster().await {
            Ok(roster) => roster,
            Err(e) => {
                // Without a roster nobody is known to be offline; keep records
                warn!("Failed to read roster: {}", e);
                stats.record_aborted();
                return stats.finish();
            }
        };

        let mut online: HashSet<EntityId> = HashSet::with_capacity(roster.len());
        for entity in roster {
            if self.shutdown.is_cancelled() {
                stats.record_aborted();
                return stats.finish();
            }

            online.insert(entity.id());
            stats.record_entity();
            self.reconcile_entity(entity, &mut stats).await;
        }

        let purged = self.lifecycle.purge_offline(&online).await;
        if purged > 0 {
            debug!("Purged records of {} disconnected entities", purged);
            stats.record_purged(purged);
        }

        match self.ledger.flush_if_due().await {
            Ok(true) => stats.record_ledger_saved(),
            Ok(false) => {}
            Err(e) if e.is_transient() => warn!("Ledger save failed, will retry: {}", e),
            Err(e) => error!("Ledger save failed: {}", e),
        }

        stats.finish()
    }

    async fn reconcile_entity(
        self: &Arc<Self>,
        entity: Arc<dyn EntityHandle>,
        stats: &mut TickStatsBuilder,
    ) {
        let id = entity.id();

        let dead = match entity.is_dead().await {
            Ok(dead) => dead,
            Err(e) => {
                debug!("Skipping {}: {}", id, e);
                return;
            }
        };

        if self.lifecycle.observe(id, dead).await == Transition::Respawned {
            debug!("{} respawned", entity.display_name());
            stats.record_respawn();
        }

        if self.lifecycle.try_begin_init(id).await {
            stats.record_init_launched();
            self.tasks.spawn(self.clone().first_contact(entity.clone()));
        }

        let bypassed = self.is_bypassed(entity.as_ref()).await;
        if bypassed {
            stats.record_bypassed();
        }

        let Some(snapshot) = self.equipment_of(entity.as_ref()).await else {
            return;
        };

        if !bypassed && !self.shutdown.is_cancelled() {
            self.apply_visual_toggles(entity.as_ref()).await;

            if !decide::is_only_template_items(&snapshot, &self.config.starter_outfit) {
                let cleared = self.sweep_cosmetics(entity.as_ref(), &snapshot).await;
                stats.record_cleared(cleared);
            }
        }

        self.enforce_respawn(entity.as_ref(), dead, bypassed, stats)
            .await;
    }

    /// Re-dress an entity that respawned naked inside its window
    async fn enforce_respawn(
        &self,
        entity: &dyn EntityHandle,
        dead: bool,
        bypassed: bool,
        stats: &mut TickStatsBuilder,
    ) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let id = entity.id();
        let in_window = !dead && !bypassed && self.lifecycle.is_in_respawn_window(id).await;
        if !in_window {
            return;
        }

        // Read again: the sweep may have changed the body layers
        let Some(current) = self.equipment_of(entity).await else {
            return;
        };

        match decide::respawn_action(dead, bypassed, in_window, decide::is_naked(&current)) {
            RespawnAction::Skip => {}
            RespawnAction::CloseWindow => {
                debug!("{} respawned dressed, closing window", entity.display_name());
                self.lifecycle.clear_window(id).await;
                stats.record_window_closed();
            }
            RespawnAction::ApplyTemplate => {
                if self.ensure_template_if_naked(entity).await > 0 {
                    stats.record_template_applied();
                }

                // Still naked: leave the window open for the next tick
                let dressed = self
                    .equipment_of(entity)
                    .await
                    .is_some_and(|after| !decide::is_naked(&after));
                if dressed {
                    info!("Starter outfit applied to {} after respawn", entity.display_name());
                    self.apply_visual_toggles(entity).await;
                    self.lifecycle.clear_window(id).await;
                    stats.record_window_closed();
                }
            }
        }
    }
}
