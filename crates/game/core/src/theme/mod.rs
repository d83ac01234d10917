//! Theme capability interface.
//!
//! A theme is the pluggable content module that supplies tile types,
//! movement rules, hazards and interactions. The engine holds only the
//! generic dispatch contract below; every capability is optional and has a
//! generic default so a session runs even with [`BasicTheme`].
//!
//! Callbacks that can fail return [`ThemeError`]. The engine logs the error
//! and treats the capability as unavailable instead of aborting the session.
mod catalogue;
mod rules;

pub use catalogue::{BasicCatalogue, OPEN_FLAG_KEY, TileCategory, TileTypeDef};
pub use rules::{
    ExecOutcome, GateBehavior, HazardDescriptor, Interaction, InteractionScratch, MoveContext,
    MoveRule,
};

use crate::error::ThemeError;
use crate::mission::{Mission, MissionKind};
use crate::state::{Grid, PlayerState, Position, SessionState, TileRef};

/// Content/rules module plugged into the engine.
pub trait Theme: Send + Sync {
    fn name(&self) -> &str {
        "basic"
    }

    /// Tile-type catalogue lookup.
    fn tile_type(&self, _tile_type: &str) -> Option<TileTypeDef> {
        None
    }

    /// Classifies an attempted move into `target`. `Ok(None)` defers to the
    /// generic walkability check.
    fn check_movement_into(
        &self,
        _target: &TileRef,
        _context: &MoveContext<'_>,
    ) -> Result<Option<MoveRule>, ThemeError> {
        Ok(None)
    }

    fn check_hazard_at(
        &self,
        _grid: &Grid,
        _position: Position,
        _player: &PlayerState,
    ) -> Result<Option<HazardDescriptor>, ThemeError> {
        Ok(None)
    }

    /// Interactions available at `target`. With `self_only` the engine asks
    /// about actions on the player's own tile/state (wear, remove, ...).
    fn available_interactions(
        &self,
        _player: &PlayerState,
        _grid: &Grid,
        _target: Position,
        _self_only: bool,
    ) -> Result<Vec<Interaction>, ThemeError> {
        Ok(Vec::new())
    }

    fn execute_interaction(
        &self,
        id: &str,
        _scratch: &mut InteractionScratch,
        _target: Position,
    ) -> Result<ExecOutcome, ThemeError> {
        Err(ThemeError::UnknownInteraction(id.to_owned()))
    }

    fn mission_kinds(&self) -> Vec<MissionKind> {
        MissionKind::BUILTIN.to_vec()
    }

    fn default_mission(&self) -> Option<Mission> {
        None
    }

    fn lock_colors(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_wearable(&self, _item_type: &str) -> bool {
        false
    }

    fn is_container(&self, _item_type: &str) -> bool {
        false
    }

    /// Extra condition for leaving through an exit, checked after all missions.
    fn exit_requirement_met(&self, _player: &PlayerState) -> Result<bool, ThemeError> {
        Ok(true)
    }

    fn gate_behavior(&self, _tile: &TileRef) -> Option<GateBehavior> {
        None
    }

    /// Whether `tile_type` counts for the extinguish mission. `None` falls
    /// back to the catalogue's hazard category.
    fn is_extinguish_target(&self, _tile_type: &str) -> Option<bool> {
        None
    }

    /// Evaluates theme-specific mission kinds.
    fn is_mission_complete(
        &self,
        _mission: &Mission,
        _state: &SessionState,
        _grid: &Grid,
    ) -> Option<bool> {
        None
    }
}

/// Theme with no content; every capability uses the generic fallback.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicTheme;

impl Theme for BasicTheme {}

/// Catalogue lookup with the generic table as fallback.
pub fn tile_def(theme: &dyn Theme, tile_type: &str) -> TileTypeDef {
    theme
        .tile_type(tile_type)
        .unwrap_or_else(|| BasicCatalogue::lookup(tile_type))
}

pub fn gate_behavior(theme: &dyn Theme, tile: &TileRef) -> GateBehavior {
    theme
        .gate_behavior(tile)
        .unwrap_or_else(|| GateBehavior::fallback_for(tile))
}

pub fn is_exit(theme: &dyn Theme, tile: &TileRef) -> bool {
    tile_def(theme, &tile.tile_type).category == TileCategory::Exit
}

pub fn is_extinguish_target(theme: &dyn Theme, tile_type: &str) -> bool {
    theme
        .is_extinguish_target(tile_type)
        .unwrap_or_else(|| tile_def(theme, tile_type).category == TileCategory::Hazard)
}

/// Unwraps a theme result, logging and discarding failures.
pub(crate) fn recover<T>(callback: &'static str, result: Result<T, ThemeError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(callback, error = %err, "theme callback failed; treating as unavailable");
            None
        }
    }
}
