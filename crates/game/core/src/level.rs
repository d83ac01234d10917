//! Level documents: the immutable input a session is built from.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::mission::Mission;
use crate::state::{Grid, Position};
use crate::theme::{self, Theme};

/// Tile type marking the spawn cell when no explicit spawn is declared.
pub const START_TILE: &str = "start";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDocument {
    #[serde(default)]
    pub name: String,
    /// Theme identifier; resolved by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub grid: Grid,
    #[serde(default)]
    pub missions: Vec<Mission>,
    #[serde(default)]
    pub fixed_order: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<Position>,
}

impl LevelDocument {
    pub fn new(grid: Grid) -> Self {
        Self {
            name: String::new(),
            theme: None,
            grid,
            missions: Vec::new(),
            fixed_order: false,
            lives: None,
            inventory_capacity: None,
            spawn: None,
        }
    }

    #[must_use]
    pub fn with_missions(mut self, missions: Vec<Mission>) -> Self {
        self.missions = missions;
        self
    }

    #[must_use]
    pub fn with_spawn(mut self, spawn: Position) -> Self {
        self.spawn = Some(spawn);
        self
    }

    #[must_use]
    pub fn with_lives(mut self, lives: u32) -> Self {
        self.lives = Some(lives);
        self
    }

    /// Explicit spawn, else the first start tile, else the origin.
    pub fn spawn_position(&self) -> Position {
        self.spawn
            .or_else(|| {
                self.grid
                    .find_tiles(|tile| tile.is_type(START_TILE))
                    .first()
                    .copied()
            })
            .unwrap_or(Position::ORIGIN)
    }

    pub fn lives_or_default(&self, config: &SessionConfig) -> u32 {
        self.lives.unwrap_or(config.default_lives)
    }

    pub fn inventory_capacity_or_default(&self, config: &SessionConfig) -> usize {
        self.inventory_capacity
            .unwrap_or(config.default_inventory_capacity)
    }

    /// Checks the invariants a session relies on.
    pub fn validate(&self, theme: &dyn Theme, config: &SessionConfig) -> Result<(), SessionError> {
        let spawn = self.spawn_position();
        if !self.grid.contains(spawn) {
            return Err(SessionError::SpawnOutOfBounds(spawn));
        }
        if self.lives_or_default(config) == 0 {
            return Err(SessionError::NoLives);
        }
        if let Some(tile_type) = self
            .grid
            .unique_violations(|tile_type| theme::tile_def(theme, tile_type).unique)
            .into_iter()
            .next()
        {
            return Err(SessionError::DuplicateUniqueTile(tile_type));
        }
        Ok(())
    }
}
