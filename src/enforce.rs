//! Enforcement actions
//!
//! Turns the decisions from `decide` into host mutations. Every host call is
//! fault-isolated: failures are logged and treated as a no-op.

use crate::decide::{self, ClearPlan, STRIP_ORDER};
use crate::service::{GuardState, BYPASS_PERMISSION};
use skinguard_host::{EntityHandle, EquipmentSnapshot, ItemId, Slot, WearRequest};
use std::collections::HashSet;
use tracing::{debug, info, warn};

impl GuardState {
    /// Whether the entity holds the bypass permission; lookup failures deny it
    pub(crate) async fn is_bypassed(&self, entity: &dyn EntityHandle) -> bool {
        match self
            .host
            .has_permission(entity.id(), BYPASS_PERMISSION)
            .await
        {
            Ok(granted) => granted,
            Err(e) => {
                debug!("Permission lookup for {} failed: {}", entity.id(), e);
                false
            }
        }
    }

    /// Current equipment, `None` while not ready or on failure
    pub(crate) async fn equipment_of(
        &self,
        entity: &dyn EntityHandle,
    ) -> Option<EquipmentSnapshot> {
        match entity.equipment().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Equipment read for {} failed: {}", entity.id(), e);
                None
            }
        }
    }

    /// Force the configured rendering switches off
    ///
    /// Each switch is independent: one failure does not skip the others.
    pub(crate) async fn apply_visual_toggles(&self, entity: &dyn EntityHandle) {
        for toggle in self.toggles.suppressed() {
            if self.shutdown.is_cancelled() {
                return;
            }
            if let Err(e) = entity.set_visual_toggle(toggle, false).await {
                debug!("Visual toggle {:?} for {} failed: {}", toggle, entity.id(), e);
            }
        }
    }

    async fn wear(&self, entity: &dyn EntityHandle, request: WearRequest) -> bool {
        let slot = request.slot;
        match entity.wear(request).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Wear on {} slot of {} failed: {}", slot, entity.id(), e);
                false
            }
        }
    }

    /// Whether the template item for `slot` exists and fits that slot
    ///
    /// Not cached: template validation only happens on rare paths.
    pub(crate) async fn is_valid_template_item(&self, slot: Slot) -> bool {
        let item = self.config.starter_outfit.item(slot);
        if item == 0 {
            return false;
        }

        match self.host.find_asset(item).await {
            Ok(Some(asset)) if asset.fits(slot) => true,
            Ok(Some(asset)) => {
                warn!(
                    "Starter outfit item {} ({}) is not a {} item",
                    item, asset.name, slot
                );
                false
            }
            Ok(None) => {
                warn!("Starter outfit item {} not found for slot {}", item, slot);
                false
            }
            Err(e) => {
                warn!("Failed to validate starter outfit item {}: {}", item, e);
                false
            }
        }
    }

    async fn valid_template_slots(&self) -> HashSet<Slot> {
        let mut valid = HashSet::new();
        for slot in Slot::ALL {
            if self.is_valid_template_item(slot).await {
                valid.insert(slot);
            }
        }
        valid
    }

    pub(crate) async fn has_any_valid_template_item(&self) -> bool {
        for slot in Slot::ALL {
            if self.is_valid_template_item(slot).await {
                return true;
            }
        }
        false
    }

    /// Wear every valid template item in apply order; returns the number worn
    pub(crate) async fn apply_template(&self, entity: &dyn EntityHandle) -> usize {
        let template = &self.config.starter_outfit;
        let valid = self.valid_template_slots().await;

        let mut applied = 0;
        for request in decide::template_requests(template, |slot| valid.contains(&slot)) {
            if self.wear(entity, request).await {
                applied += 1;
            }
        }

        if applied == 0 && template.has_any_item() {
            warn!(
                "Starter outfit applied no items to {}; check the configured ids",
                entity.display_name()
            );
        }
        applied
    }

    /// Empty all seven slots
    pub(crate) async fn strip_all(&self, entity: &dyn EntityHandle) {
        for slot in STRIP_ORDER {
            self.wear(entity, WearRequest::clear(slot)).await;
        }
    }

    /// Apply the template when it is usable and the entity is naked
    pub(crate) async fn ensure_template_if_naked(&self, entity: &dyn EntityHandle) -> usize {
        if !self.has_any_valid_template_item().await {
            return 0;
        }

        match self.equipment_of(entity).await {
            Some(snapshot) if decide::is_naked(&snapshot) => self.apply_template(entity).await,
            _ => 0,
        }
    }

    /// Remove a cosmetic from one slot; returns whether the slot was cleared
    pub(crate) async fn clear_cosmetic_slot(&self, entity: &dyn EntityHandle, slot: Slot) -> bool {
        let template = &self.config.starter_outfit;
        let valid = self.is_valid_template_item(slot).await;

        match decide::clear_plan(slot, valid) {
            ClearPlan::Keep => {
                debug!(
                    "Keeping {} on {}: no valid starter item to replace it",
                    slot,
                    entity.display_name()
                );
                false
            }
            ClearPlan::Clear => self.wear(entity, WearRequest::clear(slot)).await,
            ClearPlan::ClearAndRefill => {
                if !self.wear(entity, WearRequest::clear(slot)).await {
                    return false;
                }
                self.wear(
                    entity,
                    WearRequest::item(
                        slot,
                        template.item(slot),
                        template.effective_quality(),
                        template.play_effect,
                    ),
                )
                .await;
                true
            }
        }
    }

    /// Remove every worn cosmetic; returns the number of slots cleared
    pub(crate) async fn sweep_cosmetics(
        &self,
        entity: &dyn EntityHandle,
        snapshot: &EquipmentSnapshot,
    ) -> usize {
        if !self.config.blocks_cosmetic_items() {
            return 0;
        }

        let mut cosmetic: HashSet<ItemId> = HashSet::new();
        for (_, item) in snapshot.iter() {
            if item != 0 && self.cache.classify(self.host.as_ref(), item).await {
                cosmetic.insert(item);
            }
        }

        let mut cleared = 0;
        for slot in decide::required_slots_to_clear(snapshot, |item| cosmetic.contains(&item)) {
            if self.shutdown.is_cancelled() {
                break;
            }
            info!(
                "Cosmetic item {} found in {} slot of {}, removing",
                snapshot.get(slot),
                slot,
                entity.display_name()
            );
            if self.clear_cosmetic_slot(entity, slot).await {
                cleared += 1;
            }
        }
        cleared
    }
}
