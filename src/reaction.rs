//! Equipment-change reaction path
//!
//! Called by the host whenever an entity's slot changes. A cosmetic item is
//! removed immediately and again after a short delay, since the host may
//! re-apply the rejected item after this handler returns.

use crate::service::GuardState;
use skinguard_host::{Color, EntityHandle, ItemId, Slot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Delay before the follow-up removal
pub const DEFERRED_RECHECK_DELAY: Duration = Duration::from_millis(20);

/// What the reaction path did with an equipment change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// Shutting down, or the entity's equipment is not available
    Ignored,
    /// The entity holds the bypass permission
    Bypassed,
    /// The item is allowed
    Allowed,
    /// The item was cosmetic and removal has been issued
    Blocked,
}

impl GuardState {
    pub(crate) async fn on_equipment_changed(
        self: &Arc<Self>,
        entity: Arc<dyn EntityHandle>,
        slot: Slot,
        item: ItemId,
        quality: Option<u8>,
    ) -> ReactionOutcome {
        if self.shutdown.is_cancelled() {
            return ReactionOutcome::Ignored;
        }
        if self.equipment_of(entity.as_ref()).await.is_none() {
            return ReactionOutcome::Ignored;
        }
        if self.is_bypassed(entity.as_ref()).await {
            return ReactionOutcome::Bypassed;
        }

        self.apply_visual_toggles(entity.as_ref()).await;

        if !self.config.blocks_cosmetic_items()
            || !self.cache.classify(self.host.as_ref(), item).await
        {
            return ReactionOutcome::Allowed;
        }

        if self.shutdown.is_cancelled() {
            return ReactionOutcome::Ignored;
        }

        info!(
            "Cosmetic item {} (quality {:?}) worn in {} slot by {}, removing",
            item,
            quality,
            slot,
            entity.display_name()
        );
        self.clear_cosmetic_slot(entity.as_ref(), slot).await;

        self.tasks.spawn(self.clone().deferred_recheck(entity, slot));
        ReactionOutcome::Blocked
    }

    async fn deferred_recheck(self: Arc<Self>, entity: Arc<dyn EntityHandle>, slot: Slot) {
        tokio::select! {
            _ = self.shutdown.cancelled() => return,
            _ = tokio::time::sleep(DEFERRED_RECHECK_DELAY) => {}
        }

        if !self.host.is_online(entity.id()).await {
            return;
        }
        if self.equipment_of(entity.as_ref()).await.is_none() {
            return;
        }
        if self.shutdown.is_cancelled() {
            return;
        }

        self.clear_cosmetic_slot(entity.as_ref(), slot).await;
        if self.shutdown.is_cancelled() {
            return;
        }

        let message = &self.config.skin_blocked_message;
        if !message.trim().is_empty() {
            if let Err(e) = self.host.notify(entity.id(), message, Color::RED).await {
                debug!("Blocked-item message to {} failed: {}", entity.id(), e);
            }
        }
    }
}
