use serde::{Deserialize, Serialize};

use crate::state::TileRef;

/// Config key read by the generic fallback to decide whether a gate-like tile is open.
pub const OPEN_FLAG_KEY: &str = "isOpen";

/// Broad classification of a tile type.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TileCategory {
    #[default]
    Basic,
    Hazard,
    Interactive,
    Exit,
}

/// Theme-owned, read-only definition of a tile type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileTypeDef {
    pub walkable: bool,
    /// At most one cell may hold a unique tile type.
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub category: TileCategory,
}

impl TileTypeDef {
    pub const fn walkable(category: TileCategory) -> Self {
        Self {
            walkable: true,
            unique: false,
            category,
        }
    }

    pub const fn solid(category: TileCategory) -> Self {
        Self {
            walkable: false,
            unique: false,
            category,
        }
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Generic walkability table used when a theme does not describe a tile type.
pub struct BasicCatalogue;

impl BasicCatalogue {
    const SOLID: &'static [&'static str] = &[
        "wall",
        "void",
        "water",
        "tree",
        "rock",
        "door",
        "locked_door",
        "gate_closed",
    ];
    const HAZARDS: &'static [&'static str] = &["fire", "lava", "spikes"];
    const INTERACTIVE: &'static [&'static str] = &["door_open", "switch", "chest"];

    pub fn lookup(tile_type: &str) -> TileTypeDef {
        match tile_type {
            "exit" => TileTypeDef::walkable(TileCategory::Exit).unique(),
            "start" => TileTypeDef::walkable(TileCategory::Basic).unique(),
            // Closed until its open flag says otherwise.
            "gate" => TileTypeDef::solid(TileCategory::Interactive),
            t if Self::SOLID.contains(&t) => TileTypeDef::solid(TileCategory::Basic),
            t if Self::HAZARDS.contains(&t) => TileTypeDef::walkable(TileCategory::Hazard),
            t if Self::INTERACTIVE.contains(&t) => {
                TileTypeDef::walkable(TileCategory::Interactive)
            }
            _ => TileTypeDef::walkable(TileCategory::Basic),
        }
    }

    /// Walkability of a concrete tile, honouring an explicit open flag in its config.
    pub fn is_walkable(tile: &TileRef, def: TileTypeDef) -> bool {
        tile.config_bool(OPEN_FLAG_KEY).unwrap_or(def.walkable)
    }
}
