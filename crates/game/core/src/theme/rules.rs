//! Values exchanged between the engine and theme callbacks.

use serde::{Deserialize, Serialize};

use crate::action::Checkpoint;
use crate::state::{Cell, Grid, PlayerState, Position, TileRef};

use super::catalogue::OPEN_FLAG_KEY;

/// What the mover brings into a movement check.
#[derive(Clone, Copy, Debug)]
pub struct MoveContext<'a> {
    pub from: Position,
    pub to: Position,
    /// Top tile of the cell the mover currently stands on.
    pub current_tile: &'a TileRef,
    pub player: &'a PlayerState,
}

/// Theme verdict on entering a cell.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveRule {
    Blocked {
        message: Option<String>,
    },
    Allowed,
    /// The move succeeds and the source and/or destination cells are replaced.
    AllowedWithRewrite {
        source: Option<Cell>,
        destination: Option<Cell>,
        message: Option<String>,
    },
    /// Entering costs a life; the mover stays where it was.
    Hazard {
        message: Option<String>,
    },
}

impl MoveRule {
    pub fn blocked(message: impl Into<String>) -> Self {
        MoveRule::Blocked {
            message: Some(message.into()),
        }
    }
}

/// Hazard present at a cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardDescriptor {
    /// Continuous hazards damage periodically while the player stays on them.
    pub continuous: bool,
    pub message: Option<String>,
    /// Damage interval; the session default applies when absent.
    pub interval_ms: Option<u64>,
}

impl HazardDescriptor {
    pub fn continuous(message: impl Into<String>) -> Self {
        Self {
            continuous: true,
            message: Some(message.into()),
            interval_ms: None,
        }
    }

    #[must_use]
    pub fn with_interval_ms(mut self, millis: u64) -> Self {
        self.interval_ms = Some(millis);
        self
    }
}

/// A named, timed action the theme offers at a target cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub label: String,
    /// Hold duration before the interaction commits.
    pub duration_ms: u64,
}

impl Interaction {
    pub fn new(id: impl Into<String>, label: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            duration_ms,
        }
    }
}

/// Cloned, mutable copies handed to `execute_interaction`.
///
/// The engine swaps them into the session only when execution succeeds.
#[derive(Clone, Debug)]
pub struct InteractionScratch {
    pub grid: Grid,
    pub player: PlayerState,
}

/// Result of executing an interaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub success: bool,
    pub message: Option<String>,
    /// Activation checkpoint to run after the commit (e.g. an item was placed).
    pub checkpoint: Option<Checkpoint>,
}

impl ExecOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            checkpoint: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }
}

/// How the activation engine opens and closes a gate tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateBehavior {
    /// Doors: the tile type is swapped between two types.
    Substitute { open: String, closed: String },
    /// Gates: a boolean config flag is toggled.
    ConfigFlag { key: String },
}

impl GateBehavior {
    /// Generic behavior used when the theme does not describe the tile.
    pub fn fallback_for(tile: &TileRef) -> Self {
        match tile.tile_type.as_str() {
            "door" | "door_open" => GateBehavior::Substitute {
                open: "door_open".to_owned(),
                closed: "door".to_owned(),
            },
            _ => GateBehavior::ConfigFlag {
                key: OPEN_FLAG_KEY.to_owned(),
            },
        }
    }

    pub fn is_open(&self, tile: &TileRef) -> bool {
        match self {
            GateBehavior::Substitute { open, .. } => tile.tile_type == *open,
            GateBehavior::ConfigFlag { key } => tile.config_bool(key).unwrap_or(false),
        }
    }

    /// Applies the open/closed mutation in place, keeping the tile's config.
    pub fn set_open(&self, tile: &mut TileRef, open: bool) {
        match self {
            GateBehavior::Substitute {
                open: open_type,
                closed,
            } => {
                tile.tile_type = if open { open_type.clone() } else { closed.clone() };
            }
            GateBehavior::ConfigFlag { key } => {
                tile.config.insert(key.clone(), open.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_swaps_type_and_keeps_config() {
        let behavior = GateBehavior::fallback_for(&TileRef::new("door"));
        let mut tile = TileRef::new("door").with_config("color", "red");

        behavior.set_open(&mut tile, true);
        assert_eq!(tile.tile_type, "door_open");
        assert_eq!(tile.config_str("color"), Some("red"));
        assert!(behavior.is_open(&tile));
    }

    #[test]
    fn config_flag_defaults_to_closed() {
        let behavior = GateBehavior::fallback_for(&TileRef::new("ancient_gate"));
        let mut tile = TileRef::new("ancient_gate");
        assert!(!behavior.is_open(&tile));

        behavior.set_open(&mut tile, true);
        assert_eq!(tile.config_bool(OPEN_FLAG_KEY), Some(true));
    }
}
