//! Enforcement decisions
//!
//! Pure functions over equipment snapshots and configuration. Nothing here
//! talks to the host; `enforce` turns these decisions into mutations.

use crate::config::{GuardConfig, OutfitTemplate};
use skinguard_host::{EquipmentSnapshot, ItemId, Slot, VisualToggle, WearRequest};

/// Order used when applying a full template: body layers before accessories
pub const TEMPLATE_APPLY_ORDER: [Slot; 7] = [
    Slot::Pants,
    Slot::Shirt,
    Slot::Vest,
    Slot::Backpack,
    Slot::Hat,
    Slot::Mask,
    Slot::Glasses,
];

/// Order used when stripping every slot on first contact
pub const STRIP_ORDER: [Slot; 7] = [
    Slot::Shirt,
    Slot::Pants,
    Slot::Vest,
    Slot::Backpack,
    Slot::Hat,
    Slot::Mask,
    Slot::Glasses,
];

/// True iff shirt and pants are both empty
pub fn is_naked(snapshot: &EquipmentSnapshot) -> bool {
    snapshot.get(Slot::Shirt) == 0 && snapshot.get(Slot::Pants) == 0
}

/// True iff every worn item is the template's item for its slot
pub fn is_only_template_items(snapshot: &EquipmentSnapshot, template: &OutfitTemplate) -> bool {
    snapshot
        .iter()
        .all(|(slot, item)| item == 0 || item == template.item(slot))
}

/// Slots whose current item is cosmetic, in snapshot order
pub fn required_slots_to_clear<F>(snapshot: &EquipmentSnapshot, is_cosmetic: F) -> Vec<Slot>
where
    F: Fn(ItemId) -> bool,
{
    snapshot
        .iter()
        .filter(|(_, item)| *item != 0 && is_cosmetic(*item))
        .map(|(slot, _)| slot)
        .collect()
}

/// Which client rendering switches are forced off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisualToggles {
    pub cosmetic: bool,
    pub skin: bool,
    pub mythic: bool,
}

impl VisualToggles {
    /// Toggles to switch off, in a fixed order
    pub fn suppressed(&self) -> Vec<VisualToggle> {
        let mut toggles = Vec::with_capacity(3);
        if self.cosmetic {
            toggles.push(VisualToggle::Cosmetic);
        }
        if self.skin {
            toggles.push(VisualToggle::Skin);
        }
        if self.mythic {
            toggles.push(VisualToggle::Mythic);
        }
        toggles
    }
}

pub fn resolve_visual_toggles(config: &GuardConfig) -> VisualToggles {
    VisualToggles {
        cosmetic: config.block_cosmetics,
        skin: config.block_skins,
        mythic: config.block_mythics,
    }
}

/// Wear requests for a full template, in apply order
///
/// `is_valid` reports whether the template item for a slot exists and fits
/// that slot; invalid and zero entries are skipped.
pub fn template_requests<F>(template: &OutfitTemplate, is_valid: F) -> Vec<WearRequest>
where
    F: Fn(Slot) -> bool,
{
    TEMPLATE_APPLY_ORDER
        .iter()
        .filter(|slot| template.item(**slot) != 0 && is_valid(**slot))
        .map(|slot| {
            WearRequest::item(
                *slot,
                template.item(*slot),
                template.effective_quality(),
                template.play_effect,
            )
        })
        .collect()
}

/// How to remove a cosmetic from one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearPlan {
    /// Leave the slot alone
    Keep,
    /// Empty the slot
    Clear,
    /// Empty the slot, then wear the template item
    ClearAndRefill,
}

/// Body layers are only touched when a valid template item can replace the
/// cosmetic, so removal never leaves an entity naked without a template.
pub fn clear_plan(slot: Slot, template_item_valid: bool) -> ClearPlan {
    match (slot.is_body_layer(), template_item_valid) {
        (_, true) => ClearPlan::ClearAndRefill,
        (true, false) => ClearPlan::Keep,
        (false, false) => ClearPlan::Clear,
    }
}

/// What the respawn path should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnAction {
    /// Nothing to do (dead, bypassed, or no open window)
    Skip,
    /// Respawned already dressed: close the window without applying
    CloseWindow,
    /// Respawned naked: apply the template
    ApplyTemplate,
}

pub fn respawn_action(dead: bool, bypassed: bool, in_window: bool, naked: bool) -> RespawnAction {
    if dead || bypassed || !in_window {
        RespawnAction::Skip
    } else if naked {
        RespawnAction::ApplyTemplate
    } else {
        RespawnAction::CloseWindow
    }
}
