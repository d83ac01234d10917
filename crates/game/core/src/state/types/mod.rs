pub mod common;
pub mod grid;
pub mod player;

pub use common::{CardinalDirection, PlayerId, Position, Timestamp};
pub use grid::{Cell, Grid, GridDimensions, GridError, ITEM_TYPE_KEY, TileRef};
pub use player::{Container, InventoryFull, InventoryState, ItemInstance, PlayerState};
