//! Stateless mission evaluation.
//!
//! Missions are immutable for a session; their completion is recomputed from
//! the session state and grid every time it is asked for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{Grid, SessionState};
use crate::theme::{self, Theme};

/// Collected-id sentinel that also counts as a rescue.
pub const RESCUE_SENTINEL: &str = "rescue";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MissionKind {
    Collect,
    Rescue,
    Extinguish,
    Reach,
    Escape,
    /// Theme-specific kind, evaluated through [`Theme::is_mission_complete`].
    Custom(String),
}

impl MissionKind {
    pub const BUILTIN: [MissionKind; 5] = [
        MissionKind::Collect,
        MissionKind::Rescue,
        MissionKind::Extinguish,
        MissionKind::Reach,
        MissionKind::Escape,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            MissionKind::Collect => "collect",
            MissionKind::Rescue => "rescue",
            MissionKind::Extinguish => "extinguish",
            MissionKind::Reach => "reach",
            MissionKind::Escape => "escape",
            MissionKind::Custom(kind) => kind,
        }
    }
}

impl From<String> for MissionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "collect" => MissionKind::Collect,
            "rescue" => MissionKind::Rescue,
            "extinguish" => MissionKind::Extinguish,
            "reach" => MissionKind::Reach,
            "escape" => MissionKind::Escape,
            _ => MissionKind::Custom(value),
        }
    }
}

impl From<MissionKind> for String {
    fn from(kind: MissionKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for MissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative objective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    #[serde(rename = "type")]
    pub kind: MissionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<u32>,
    #[serde(default)]
    pub description: String,
}

impl Mission {
    pub fn new(kind: MissionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            target_id: None,
            target_amount: None,
            description: description.into(),
        }
    }

    pub fn escape() -> Self {
        Self::new(MissionKind::Escape, "Find the exit")
    }

    pub fn collect(item_id: impl Into<String>) -> Self {
        let item_id = item_id.into();
        Self::new(MissionKind::Collect, format!("Collect {item_id}")).with_target(item_id)
    }

    pub fn reach(location_id: impl Into<String>) -> Self {
        let location_id = location_id.into();
        Self::new(MissionKind::Reach, format!("Reach {location_id}")).with_target(location_id)
    }

    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }
}

/// Aggregate result of [`evaluate_all`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissionProgress {
    pub all_complete: bool,
    /// First incomplete mission in list order, reported only for fixed-order
    /// lists (drives the "current objective" display).
    pub current_index: Option<usize>,
}

pub fn is_complete(
    mission: &Mission,
    state: &SessionState,
    grid: &Grid,
    theme: &dyn Theme,
) -> bool {
    let player = &state.player;
    let target = mission.target_id.as_deref();
    match &mission.kind {
        MissionKind::Collect => target.is_some_and(|id| player.collected.contains(id)),
        MissionKind::Rescue => player.rescued > 0 || player.collected.contains(RESCUE_SENTINEL),
        MissionKind::Extinguish => grid
            .iter()
            .all(|(_, cell)| !cell.layers().any(|tile| theme::is_extinguish_target(theme, &tile.tile_type))),
        MissionKind::Reach => target.is_some_and(|id| player.reached.contains(id)),
        MissionKind::Escape => player.reached_exit,
        MissionKind::Custom(_) => theme
            .is_mission_complete(mission, state, grid)
            .unwrap_or(false),
    }
}

/// Evaluates every mission.
///
/// Completion of the set is order-insensitive: `fixed_order` only affects
/// which index is reported as the current objective.
pub fn evaluate_all(
    missions: &[Mission],
    state: &SessionState,
    fixed_order: bool,
    grid: &Grid,
    theme: &dyn Theme,
) -> MissionProgress {
    let first_incomplete = missions
        .iter()
        .position(|mission| !is_complete(mission, state, grid, theme));

    MissionProgress {
        all_complete: first_incomplete.is_none(),
        current_index: if fixed_order { first_incomplete } else { None },
    }
}

/// True when every mission other than escape is complete.
pub fn exit_unlocked(missions: &[Mission], state: &SessionState, grid: &Grid, theme: &dyn Theme) -> bool {
    missions
        .iter()
        .filter(|mission| mission.kind != MissionKind::Escape)
        .all(|mission| is_complete(mission, state, grid, theme))
}

/// Appends the implicit escape mission when the list does not declare one.
pub fn with_default_escape(mut missions: Vec<Mission>, theme: &dyn Theme) -> Vec<Mission> {
    if !missions.iter().any(|mission| mission.kind == MissionKind::Escape) {
        let fallback = theme
            .default_mission()
            .filter(|mission| mission.kind == MissionKind::Escape)
            .unwrap_or_else(Mission::escape);
        missions.push(fallback);
    }
    missions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Cell, GridDimensions, PlayerId, PlayerState, Position, TileRef};
    use crate::theme::BasicTheme;

    fn fixture() -> (SessionState, Grid) {
        let state = SessionState::new(PlayerState::new(PlayerId::from("p1"), Position::ORIGIN, 3, 4));
        let grid = Grid::filled(GridDimensions::new(3, 3), Cell::new(TileRef::new("floor")));
        (state, grid)
    }

    #[test]
    fn completion_ignores_order_of_achievement() {
        let (mut state, grid) = fixture();
        let missions = vec![Mission::collect("gem"), Mission::reach("altar")];

        state.player.mark_reached("altar");
        let progress = evaluate_all(&missions, &state, false, &grid, &BasicTheme);
        assert!(!progress.all_complete);
        assert_eq!(progress.current_index, None);

        state.player.collect("gem");
        let progress = evaluate_all(&missions, &state, false, &grid, &BasicTheme);
        assert!(progress.all_complete);
    }

    #[test]
    fn fixed_order_reports_first_incomplete_but_not_enforced() {
        let (mut state, grid) = fixture();
        let missions = vec![Mission::collect("gem"), Mission::reach("altar")];

        state.player.mark_reached("altar");
        let progress = evaluate_all(&missions, &state, true, &grid, &BasicTheme);
        assert_eq!(progress.current_index, Some(0));

        state.player.collect("gem");
        let progress = evaluate_all(&missions, &state, true, &grid, &BasicTheme);
        assert!(progress.all_complete);
        assert_eq!(progress.current_index, None);
    }

    #[test]
    fn extinguish_requires_no_hazard_tiles() {
        let (state, mut grid) = fixture();
        let mission = Mission::new(MissionKind::Extinguish, "Put out the fire");
        grid.set_object(Position::new(1, 1), Some(TileRef::new("fire")));
        assert!(!is_complete(&mission, &state, &grid, &BasicTheme));

        grid.set_object(Position::new(1, 1), None);
        assert!(is_complete(&mission, &state, &grid, &BasicTheme));
    }

    #[test]
    fn rescue_accepts_counter_or_sentinel() {
        let (mut state, grid) = fixture();
        let mission = Mission::new(MissionKind::Rescue, "Rescue the cat");
        assert!(!is_complete(&mission, &state, &grid, &BasicTheme));

        state.player.collect(RESCUE_SENTINEL);
        assert!(is_complete(&mission, &state, &grid, &BasicTheme));
    }

    #[test]
    fn default_escape_is_appended_once() {
        let missions = with_default_escape(vec![Mission::collect("gem")], &BasicTheme);
        assert_eq!(missions.len(), 2);
        assert_eq!(missions[1].kind, MissionKind::Escape);

        let again = with_default_escape(missions, &BasicTheme);
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn unknown_kinds_deserialize_as_custom() {
        let mission: Mission =
            serde_json::from_str(r#"{"type": "defuse", "description": "Defuse the bomb"}"#).unwrap();
        assert_eq!(mission.kind, MissionKind::Custom("defuse".to_owned()));

        let (state, grid) = fixture();
        assert!(!is_complete(&mission, &state, &grid, &BasicTheme));
    }
}
