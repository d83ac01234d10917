//! Per-participant state: position, lives, inventory and progress sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CardinalDirection, PlayerId, Position};

/// An item carried in the inventory.
///
/// Only `item_type` is interpreted by the engine; every other field belongs to
/// the theme.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInstance {
    pub item_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ItemInstance {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("inventory is full ({capacity} items)")]
pub struct InventoryFull {
    pub capacity: usize,
}

/// Ordered inventory bounded by the level's configured capacity.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryState {
    items: Vec<ItemInstance>,
    capacity: usize,
}

impl InventoryState {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn items(&self) -> &[ItemInstance] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&ItemInstance> {
        self.items.get(index)
    }

    pub fn push(&mut self, item: ItemInstance) -> Result<(), InventoryFull> {
        if self.is_full() {
            return Err(InventoryFull {
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<ItemInstance> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Removes the first item of `item_type`, if any.
    pub fn take(&mut self, item_type: &str) -> Option<ItemInstance> {
        let index = self.position_of(item_type)?;
        self.remove(index)
    }

    pub fn position_of(&self, item_type: &str) -> Option<usize> {
        self.items.iter().position(|item| item.item_type == item_type)
    }

    pub fn contains(&self, item_type: &str) -> bool {
        self.position_of(item_type).is_some()
    }
}

/// Capacity-bounded accumulator (e.g. a bucket of water).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Container {
    pub amount: u32,
    pub capacity: u32,
}

impl Container {
    pub const fn new(capacity: u32) -> Self {
        Self {
            amount: 0,
            capacity,
        }
    }

    /// Adds up to `amount`, returning how much was actually stored.
    pub fn fill(&mut self, amount: u32) -> u32 {
        let stored = amount.min(self.capacity.saturating_sub(self.amount));
        self.amount += stored;
        stored
    }

    /// Removes up to `amount`, returning how much was actually drained.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let drained = amount.min(self.amount);
        self.amount -= drained;
        drained
    }

    pub const fn is_full(&self) -> bool {
        self.amount >= self.capacity
    }
}

/// State of one participant for the duration of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub position: Position,
    pub facing: CardinalDirection,
    lives: u32,
    pub inventory: InventoryState,
    /// Slot → worn item type. One item per slot.
    pub worn: BTreeMap<String, String>,
    pub collected: BTreeSet<String>,
    pub reached: BTreeSet<String>,
    pub reached_exit: bool,
    pub rescued: u32,
    pub containers: BTreeMap<String, Container>,
}

impl PlayerState {
    pub fn new(id: PlayerId, position: Position, lives: u32, inventory_capacity: usize) -> Self {
        Self {
            id,
            position,
            facing: CardinalDirection::default(),
            lives,
            inventory: InventoryState::with_capacity(inventory_capacity),
            worn: BTreeMap::new(),
            collected: BTreeSet::new(),
            reached: BTreeSet::new(),
            reached_exit: false,
            rescued: 0,
            containers: BTreeMap::new(),
        }
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    /// Removes one life and returns the remaining count. Never increases.
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Wears `item_type` in `slot`, returning the item previously worn there.
    pub fn wear(&mut self, slot: impl Into<String>, item_type: impl Into<String>) -> Option<String> {
        self.worn.insert(slot.into(), item_type.into())
    }

    pub fn take_off(&mut self, slot: &str) -> Option<String> {
        self.worn.remove(slot)
    }

    pub fn is_wearing(&self, item_type: &str) -> bool {
        self.worn.values().any(|worn| worn == item_type)
    }

    pub fn collect(&mut self, id: impl Into<String>) -> bool {
        self.collected.insert(id.into())
    }

    pub fn mark_reached(&mut self, location_id: impl Into<String>) -> bool {
        self.reached.insert(location_id.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_rejects_items_past_capacity() {
        let mut inventory = InventoryState::with_capacity(1);
        inventory.push(ItemInstance::new("key")).unwrap();

        let err = inventory.push(ItemInstance::new("gem")).unwrap_err();
        assert_eq!(err.capacity, 1);
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn lives_never_underflow() {
        let mut player = PlayerState::new(PlayerId::from("p1"), Position::ORIGIN, 1, 4);
        assert_eq!(player.lose_life(), 0);
        assert_eq!(player.lose_life(), 0);
        assert!(!player.is_alive());
    }

    #[test]
    fn wearing_replaces_item_in_same_slot() {
        let mut player = PlayerState::new(PlayerId::from("p1"), Position::ORIGIN, 3, 4);
        assert_eq!(player.wear("head", "helmet"), None);
        assert_eq!(player.wear("head", "goggles"), Some("helmet".to_owned()));
        assert!(player.is_wearing("goggles"));
        assert!(!player.is_wearing("helmet"));
    }

    #[test]
    fn container_fill_is_bounded() {
        let mut bucket = Container::new(3);
        assert_eq!(bucket.fill(5), 3);
        assert!(bucket.is_full());
        assert_eq!(bucket.drain(2), 2);
        assert_eq!(bucket.amount, 1);
    }

    #[test]
    fn item_instance_keeps_theme_fields_flat() {
        let item = ItemInstance::new("key").with_field("color", "red");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"itemType": "key", "color": "red"}));
    }
}
