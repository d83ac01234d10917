//! Session state representation.
//!
//! This module owns the grid and per-session data structures. The session
//! loop and the resolvers in [`crate::action`] are the only code that mutates
//! them; everything else reads snapshots.
pub mod delta;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use delta::{SessionDelta, SessionFields};
pub use types::{
    CardinalDirection, Cell, Container, Grid, GridDimensions, GridError, ITEM_TYPE_KEY,
    InventoryFull, InventoryState, ItemInstance, PlayerId, PlayerState, Position, TileRef,
    Timestamp,
};

/// Lifecycle of a session. `Won` and `Failed` are terminal until restart.
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
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Playing,
    Won,
    Failed,
}

impl SessionStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Won | SessionStatus::Failed)
    }
}

/// Cursor state of one gate in the activation engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GateProgress {
    /// Index into the gate's condition sequence. Never decreases.
    pub step: usize,
    /// Number of requirements fulfilled so far in an ordered step.
    pub fulfilled: usize,
}

/// Mutable state of one session, discarded on restart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub player: PlayerState,
    /// Last known positions of networked peers.
    pub peers: BTreeMap<PlayerId, Position>,
    /// Tile key → gate cursor.
    pub activation: BTreeMap<String, GateProgress>,
    /// Fog-of-war: cells revealed so far.
    pub revealed: BTreeSet<Position>,
    /// Cells the theme currently reports as hazardous (display cache).
    pub hazard_zones: BTreeSet<Position>,
    pub moves: u32,
    status: SessionStatus,
}

impl SessionState {
    pub fn new(player: PlayerState) -> Self {
        Self {
            player,
            peers: BTreeMap::new(),
            activation: BTreeMap::new(),
            revealed: BTreeSet::new(),
            hazard_zones: BTreeSet::new(),
            moves: 0,
            status: SessionStatus::Playing,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transitions to `Failed`. Returns `false` if the session had already ended.
    pub fn fail(&mut self) -> bool {
        self.finish(SessionStatus::Failed)
    }

    /// Transitions to `Won`. Returns `false` if the session had already ended.
    pub fn win(&mut self) -> bool {
        self.finish(SessionStatus::Won)
    }

    fn finish(&mut self, status: SessionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Positions of every participant: the local player first, then peers.
    pub fn participant_positions(&self) -> Vec<Position> {
        std::iter::once(self.player.position)
            .chain(self.peers.values().copied())
            .collect()
    }

    /// Reveals `center` and its four orthogonal neighbours that lie inside `grid`.
    pub fn reveal_around(&mut self, center: Position, grid: &Grid) {
        let neighbours = CardinalDirection::ALL.map(|direction| direction.step(center));
        let mut cells: arrayvec::ArrayVec<Position, 5> = arrayvec::ArrayVec::new();
        cells.push(center);
        cells.extend(neighbours);
        self.revealed
            .extend(cells.into_iter().filter(|cell| grid.contains(*cell)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        SessionState::new(PlayerState::new(PlayerId::from("p1"), Position::ORIGIN, 3, 4))
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut state = state();
        assert!(state.fail());
        assert!(!state.win());
        assert_eq!(state.status(), SessionStatus::Failed);
    }

    #[test]
    fn reveal_around_clips_to_grid() {
        let grid = Grid::filled(GridDimensions::new(3, 3), Cell::new(TileRef::new("floor")));
        let mut state = state();
        state.reveal_around(Position::ORIGIN, &grid);

        let expected: BTreeSet<_> = [Position::new(0, 0), Position::new(1, 0), Position::new(0, 1)]
            .into_iter()
            .collect();
        assert_eq!(state.revealed, expected);
    }

    #[test]
    fn participants_list_local_player_first() {
        let mut state = state();
        state.peers.insert(PlayerId::from("p2"), Position::new(4, 4));
        assert_eq!(
            state.participant_positions(),
            vec![Position::ORIGIN, Position::new(4, 4)]
        );
    }
}
