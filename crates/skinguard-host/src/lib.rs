//! Skinguard Host Interface: the game server boundary
//!
//! This crate defines the traits a game server implements so the skinguard
//! engine can observe and mutate connected entities without knowing anything
//! about the concrete server runtime.
//!
//! # Architecture
//!
//! The boundary is split into two traits:
//!
//! 1. **`GameHost`**: process-wide queries (roster, asset database, permissions, chat)
//! 2. **`EntityHandle`**: one connected entity (life state, equipment slots, visual toggles)
//!
//! # Example
//!
//! ```rust,no_run
//! use skinguard_host::{EntityHandle, GameHost, Slot};
//!
//! async fn count_naked<H: GameHost>(host: &H) -> skinguard_host::Result<usize> {
//!     let mut naked = 0;
//!     for entity in host.roster().await? {
//!         if let Some(equipment) = entity.equipment().await? {
//!             if equipment.get(Slot::Shirt) == 0 && equipment.get(Slot::Pants) == 0 {
//!                 naked += 1;
//!             }
//!         }
//!     }
//!     Ok(naked)
//! }
//! ```
//!
//! Typed getters replace any reflective field lookup: every slot and every
//! boolean asset attribute is reached through a plain method or map.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// Stable identifier of a connected entity (a player's account id)
pub type EntityId = u64;

/// Identifier of an item in the host's asset database. `0` means "empty".
pub type ItemId = u16;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Entity {0} is no longer connected")]
    Disconnected(EntityId),

    #[error("Equipment is not available for entity {0}")]
    EquipmentUnavailable(EntityId),

    #[error("Asset lookup failed for item {id}: {reason}")]
    AssetLookup { id: ItemId, reason: String },

    #[error("Host error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// One of the seven equipment positions of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Shirt,
    Pants,
    Hat,
    Backpack,
    Vest,
    Mask,
    Glasses,
}

impl Slot {
    /// Every slot, in snapshot order
    pub const ALL: [Slot; 7] = [
        Slot::Shirt,
        Slot::Pants,
        Slot::Hat,
        Slot::Backpack,
        Slot::Vest,
        Slot::Mask,
        Slot::Glasses,
    ];

    fn index(self) -> usize {
        match self {
            Slot::Shirt => 0,
            Slot::Pants => 1,
            Slot::Hat => 2,
            Slot::Backpack => 3,
            Slot::Vest => 4,
            Slot::Mask => 5,
            Slot::Glasses => 6,
        }
    }

    /// Shirt and pants form the body layer; everything else is an accessory
    pub fn is_body_layer(self) -> bool {
        matches!(self, Slot::Shirt | Slot::Pants)
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Shirt => "shirt",
            Slot::Pants => "pants",
            Slot::Hat => "hat",
            Slot::Backpack => "backpack",
            Slot::Vest => "vest",
            Slot::Mask => "mask",
            Slot::Glasses => "glasses",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The item ids currently worn by an entity, one per slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipmentSnapshot {
    items: [ItemId; 7],
}

impl EquipmentSnapshot {
    /// Snapshot with every slot empty
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> ItemId {
        self.items[slot.index()]
    }

    pub fn set(&mut self, slot: Slot, item: ItemId) {
        self.items[slot.index()] = item;
    }

    /// Builder-style setter
    pub fn with(mut self, slot: Slot, item: ItemId) -> Self {
        self.set(slot, item);
        self
    }

    /// Iterate `(slot, item)` pairs in snapshot order, including empty slots
    pub fn iter(&self) -> impl Iterator<Item = (Slot, ItemId)> + '_ {
        Slot::ALL.iter().map(move |slot| (*slot, self.get(*slot)))
    }
}

/// Declared category of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    /// A wearable item that fits exactly one slot
    Wearable(Slot),
    /// Anything else (weapons, food, structures, ...)
    Other,
}

/// Typed metadata for an item in the host's asset database
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInfo {
    pub id: ItemId,
    pub name: String,
    pub category: AssetCategory,
    /// Boolean attributes declared by the asset (e.g. `isSkin`, `isMythic`)
    pub attributes: HashMap<String, bool>,
}

impl AssetInfo {
    pub fn wearable(id: ItemId, slot: Slot, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: AssetCategory::Wearable(slot),
            attributes: HashMap::new(),
        }
    }

    pub fn other(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: AssetCategory::Other,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: bool) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Value of a boolean attribute, `None` when the asset does not declare it
    pub fn attribute(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).copied()
    }

    pub fn is_wearable(&self) -> bool {
        matches!(self.category, AssetCategory::Wearable(_))
    }

    /// Whether this asset can be worn in `slot`
    pub fn fits(&self, slot: Slot) -> bool {
        self.category == AssetCategory::Wearable(slot)
    }
}

/// Client-side rendering switches that can be forced off by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualToggle {
    Cosmetic,
    Skin,
    Mythic,
}

/// A single equipment mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WearRequest {
    pub slot: Slot,
    pub item: ItemId,
    /// Wear quality, 0-100
    pub quality: u8,
    /// Opaque per-item state bytes
    pub state: Vec<u8>,
    pub play_effect: bool,
}

impl WearRequest {
    /// Request that empties `slot`
    pub fn clear(slot: Slot) -> Self {
        Self {
            slot,
            item: 0,
            quality: 0,
            state: Vec::new(),
            play_effect: false,
        }
    }

    pub fn item(slot: Slot, item: ItemId, quality: u8, play_effect: bool) -> Self {
        Self {
            slot,
            item,
            quality,
            state: Vec::new(),
            play_effect,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.item == 0
    }
}

/// RGB color for chat notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const YELLOW: Color = Color { r: 255, g: 235, b: 4 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
}

/// A connected entity as seen through the host
///
/// Every call may fail if the entity disconnects concurrently; callers treat
/// such failures as no-ops.
#[async_trait]
pub trait EntityHandle: Send + Sync {
    fn id(&self) -> EntityId;

    /// Human-readable name for logs
    fn display_name(&self) -> String;

    /// Whether the entity is currently dead
    async fn is_dead(&self) -> Result<bool>;

    /// Current equipment, or `None` while the equipment subsystem is not ready
    async fn equipment(&self) -> Result<Option<EquipmentSnapshot>>;

    /// Wear (or clear, with item 0) one slot
    async fn wear(&self, request: WearRequest) -> Result<()>;

    /// Force a client rendering switch on or off
    async fn set_visual_toggle(&self, toggle: VisualToggle, enabled: bool) -> Result<()>;
}

/// Process-wide view of the game server
#[async_trait]
pub trait GameHost: Send + Sync + 'static {
    /// Entities currently connected, in roster order
    async fn roster(&self) -> Result<Vec<Arc<dyn EntityHandle>>>;

    /// Whether an entity with this id is still connected
    async fn is_online(&self, id: EntityId) -> bool;

    /// Look up an item in the asset database
    async fn find_asset(&self, id: ItemId) -> Result<Option<AssetInfo>>;

    /// Whether the entity holds `permission`
    async fn has_permission(&self, id: EntityId, permission: &str) -> Result<bool>;

    /// Deliver a chat message to one entity
    async fn notify(&self, id: EntityId, message: &str, color: Color) -> Result<()>;
}
