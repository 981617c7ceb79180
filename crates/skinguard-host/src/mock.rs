//! In-memory host implementation for testing
//!
//! `MockHost` keeps a roster of `MockEntity` values and an asset table, and
//! records every mutation the engine issues so tests can assert on order and
//! content.
//!
//! # Example
//!
//! ```rust,ignore
//! use skinguard_host::mock::MockHost;
//! use skinguard_host::{AssetInfo, Slot};
//!
//! let host = MockHost::new();
//! host.add_asset(AssetInfo::wearable(211, Slot::Shirt, "Plaid Shirt"));
//! let entity = host.connect(76561198000000001, "alice");
//! assert!(entity.equipment_now().is_some());
//! ```

use crate::{
    AssetInfo, Color, EntityHandle, EntityId, EquipmentSnapshot, GameHost, HostError, ItemId,
    Result, Slot, VisualToggle, WearRequest,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A mutation or notification observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Wear {
        entity: EntityId,
        request: WearRequest,
    },
    Toggle {
        entity: EntityId,
        toggle: VisualToggle,
        enabled: bool,
    },
    Notify {
        entity: EntityId,
        message: String,
        color: Color,
    },
}

type EventLog = Arc<Mutex<Vec<HostEvent>>>;

#[derive(Debug)]
struct MockEntityState {
    dead: bool,
    equipment: Option<EquipmentSnapshot>,
    /// Items the simulated engine refuses to equip
    rejected: HashSet<ItemId>,
    /// Rendering switches whose mutation fails
    broken_toggles: HashSet<VisualToggle>,
}

/// A connected entity backed by memory
#[derive(Debug)]
pub struct MockEntity {
    id: EntityId,
    name: String,
    state: Mutex<MockEntityState>,
    events: EventLog,
}

impl MockEntity {
    fn new(
        id: EntityId,
        name: &str,
        equipment: Option<EquipmentSnapshot>,
        events: EventLog,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            state: Mutex::new(MockEntityState {
                dead: false,
                equipment,
                rejected: HashSet::new(),
                broken_toggles: HashSet::new(),
            }),
            events,
        }
    }

    pub fn set_dead(&self, dead: bool) {
        self.state.lock().unwrap().dead = dead;
    }

    /// Replace the equipment (`None` = subsystem not ready)
    pub fn set_equipment(&self, equipment: Option<EquipmentSnapshot>) {
        self.state.lock().unwrap().equipment = equipment;
    }

    /// Put on an item without going through the engine (no event recorded)
    pub fn put_on(&self, slot: Slot, item: ItemId) {
        let mut state = self.state.lock().unwrap();
        let mut equipment = state.equipment.unwrap_or_default();
        equipment.set(slot, item);
        state.equipment = Some(equipment);
    }

    /// Make the simulated engine silently ignore wear requests for `item`
    pub fn reject_item(&self, item: ItemId) {
        self.state.lock().unwrap().rejected.insert(item);
    }

    /// Make every mutation of `toggle` fail
    pub fn break_toggle(&self, toggle: VisualToggle) {
        self.state.lock().unwrap().broken_toggles.insert(toggle);
    }

    pub fn equipment_now(&self) -> Option<EquipmentSnapshot> {
        self.state.lock().unwrap().equipment
    }
}

#[async_trait]
impl EntityHandle for MockEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    async fn is_dead(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().dead)
    }

    async fn equipment(&self) -> Result<Option<EquipmentSnapshot>> {
        Ok(self.state.lock().unwrap().equipment)
    }

    async fn wear(&self, request: WearRequest) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            let rejected = state.rejected.contains(&request.item);
            let equipment = state
                .equipment
                .as_mut()
                .ok_or(HostError::EquipmentUnavailable(self.id))?;
            if !rejected {
                equipment.set(request.slot, request.item);
            }
        }

        self.events.lock().unwrap().push(HostEvent::Wear {
            entity: self.id,
            request,
        });
        Ok(())
    }

    async fn set_visual_toggle(&self, toggle: VisualToggle, enabled: bool) -> Result<()> {
        if self.state.lock().unwrap().broken_toggles.contains(&toggle) {
            return Err(HostError::Other(format!("{:?} toggle rejected", toggle)));
        }
        self.events.lock().unwrap().push(HostEvent::Toggle {
            entity: self.id,
            toggle,
            enabled,
        });
        Ok(())
    }
}

/// Mock game server
#[derive(Debug, Default)]
pub struct MockHost {
    roster: Mutex<Vec<Arc<MockEntity>>>,
    assets: Mutex<HashMap<ItemId, AssetInfo>>,
    broken_assets: Mutex<HashSet<ItemId>>,
    permissions: Mutex<HashMap<EntityId, HashSet<String>>>,
    events: EventLog,
    asset_lookups: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_asset(&self, asset: AssetInfo) {
        self.assets.lock().unwrap().insert(asset.id, asset);
    }

    /// Make lookups of `id` fail with a host error
    pub fn break_asset(&self, id: ItemId) {
        self.broken_assets.lock().unwrap().insert(id);
    }

    /// Connect an entity whose equipment is ready and empty
    pub fn connect(&self, id: EntityId, name: &str) -> Arc<MockEntity> {
        self.connect_with(id, name, Some(EquipmentSnapshot::empty()))
    }

    /// Connect an entity whose equipment subsystem is not ready yet
    pub fn connect_unready(&self, id: EntityId, name: &str) -> Arc<MockEntity> {
        self.connect_with(id, name, None)
    }

    fn connect_with(
        &self,
        id: EntityId,
        name: &str,
        equipment: Option<EquipmentSnapshot>,
    ) -> Arc<MockEntity> {
        let entity = Arc::new(MockEntity::new(id, name, equipment, self.events.clone()));
        let mut roster = self.roster.lock().unwrap();
        roster.retain(|e| e.id != id);
        roster.push(entity.clone());
        entity
    }

    pub fn disconnect(&self, id: EntityId) {
        self.roster.lock().unwrap().retain(|e| e.id != id);
    }

    pub fn grant(&self, id: EntityId, permission: &str) {
        self.permissions
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .insert(permission.to_string());
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Wear requests issued for one entity, in order
    pub fn wears_for(&self, id: EntityId) -> Vec<WearRequest> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HostEvent::Wear { entity, request } if entity == id => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Chat messages delivered to one entity, in order
    pub fn messages_for(&self, id: EntityId) -> Vec<(String, Color)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HostEvent::Notify {
                    entity,
                    message,
                    color,
                } if entity == id => Some((message, color)),
                _ => None,
            })
            .collect()
    }

    /// Number of `find_asset` calls served so far
    pub fn asset_lookups(&self) -> usize {
        self.asset_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameHost for MockHost {
    async fn roster(&self) -> Result<Vec<Arc<dyn EntityHandle>>> {
        Ok(self
            .roster
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.clone() as Arc<dyn EntityHandle>)
            .collect())
    }

    async fn is_online(&self, id: EntityId) -> bool {
        self.roster.lock().unwrap().iter().any(|e| e.id == id)
    }

    async fn find_asset(&self, id: ItemId) -> Result<Option<AssetInfo>> {
        self.asset_lookups.fetch_add(1, Ordering::SeqCst);
        if self.broken_assets.lock().unwrap().contains(&id) {
            return Err(HostError::AssetLookup {
                id,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(self.assets.lock().unwrap().get(&id).cloned())
    }

    async fn has_permission(&self, id: EntityId, permission: &str) -> Result<bool> {
        Ok(self
            .permissions
            .lock()
            .unwrap()
            .get(&id)
            .is_some_and(|granted| granted.contains(permission)))
    }

    async fn notify(&self, id: EntityId, message: &str, color: Color) -> Result<()> {
        if !self.is_online(id).await {
            return Err(HostError::Disconnected(id));
        }
        self.events.lock().unwrap().push(HostEvent::Notify {
            entity: id,
            message: message.to_string(),
            color,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wear_updates_equipment_and_records() {
        let host = MockHost::new();
        let entity = host.connect(1, "alice");

        entity
            .wear(WearRequest::item(Slot::Hat, 40, 100, false))
            .await
            .unwrap();

        assert_eq!(entity.equipment_now().unwrap().get(Slot::Hat), 40);
        assert_eq!(host.wears_for(1).len(), 1);
        assert!(host.wears_for(2).is_empty());
    }

    #[tokio::test]
    async fn test_unready_entity_rejects_wear() {
        let host = MockHost::new();
        let entity = host.connect_unready(1, "bob");

        let result = entity.wear(WearRequest::clear(Slot::Shirt)).await;
        assert!(matches!(result, Err(HostError::EquipmentUnavailable(1))));
        assert!(host.events().is_empty());
    }

    #[tokio::test]
    async fn test_roster_and_disconnect() {
        let host = MockHost::new();
        host.connect(1, "a");
        host.connect(2, "b");
        assert_eq!(host.roster().await.unwrap().len(), 2);

        host.disconnect(1);
        assert!(!host.is_online(1).await);
        assert!(host.is_online(2).await);
        assert!(host.notify(1, "hi", Color::YELLOW).await.is_err());
    }

    #[tokio::test]
    async fn test_permissions_and_broken_assets() {
        let host = MockHost::new();
        host.grant(5, "noskins.bypass");
        host.break_asset(9);

        assert!(host.has_permission(5, "noskins.bypass").await.unwrap());
        assert!(!host.has_permission(6, "noskins.bypass").await.unwrap());
        assert!(host.find_asset(9).await.is_err());
        assert!(host.find_asset(10).await.unwrap().is_none());
        assert_eq!(host.asset_lookups(), 2);
    }
}
