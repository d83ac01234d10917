//! Change tracking between two session snapshots.
//!
//! The session loop snapshots the state before running a tick callback and
//! diffs afterwards so that callers (renderers, the multiplayer sync layer)
//! only react to what actually changed.

use std::collections::BTreeSet;

use bitflags::bitflags;

use crate::state::{Grid, Position, SessionState};

bitflags! {
    /// Which parts of the session changed during one callback.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SessionFields: u16 {
        const POSITION   = 1 << 0;
        const FACING     = 1 << 1;
        const LIVES      = 1 << 2;
        const INVENTORY  = 1 << 3;
        const PROGRESS   = 1 << 4;
        const ACTIVATION = 1 << 5;
        const REVEALED   = 1 << 6;
        const STATUS     = 1 << 7;
        const GRID       = 1 << 8;
        const PEERS      = 1 << 9;
        const HAZARDS    = 1 << 10;
    }
}

/// Metadata describing the impact of one callback on the session.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SessionDelta {
    pub fields: SessionFields,
    /// Cells whose contents differ between the two grids.
    pub cells: BTreeSet<Position>,
}

impl SessionDelta {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_states(
        before: &SessionState,
        before_grid: &Grid,
        after: &SessionState,
        after_grid: &Grid,
    ) -> Self {
        let mut fields = SessionFields::empty();
        let (old, new) = (&before.player, &after.player);

        fields.set(SessionFields::POSITION, old.position != new.position);
        fields.set(SessionFields::FACING, old.facing != new.facing);
        fields.set(SessionFields::LIVES, old.lives() != new.lives());
        fields.set(
            SessionFields::INVENTORY,
            old.inventory != new.inventory || old.worn != new.worn || old.containers != new.containers,
        );
        fields.set(
            SessionFields::PROGRESS,
            old.collected != new.collected
                || old.reached != new.reached
                || old.reached_exit != new.reached_exit
                || old.rescued != new.rescued,
        );
        fields.set(SessionFields::ACTIVATION, before.activation != after.activation);
        fields.set(SessionFields::REVEALED, before.revealed != after.revealed);
        fields.set(SessionFields::STATUS, before.status() != after.status());
        fields.set(SessionFields::PEERS, before.peers != after.peers);
        fields.set(SessionFields::HAZARDS, before.hazard_zones != after.hazard_zones);

        let cells: BTreeSet<Position> = before_grid
            .iter()
            .zip(after_grid.iter())
            .filter(|((_, a), (_, b))| a != b)
            .map(|((position, _), _)| position)
            .collect();
        fields.set(SessionFields::GRID, !cells.is_empty());

        Self { fields, cells }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn merge(&mut self, other: SessionDelta) {
        self.fields |= other.fields;
        self.cells.extend(other.cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Cell, GridDimensions, PlayerId, PlayerState, TileRef};

    #[test]
    fn diff_reports_changed_fields_and_cells() {
        let grid = Grid::filled(GridDimensions::new(2, 2), Cell::new(TileRef::new("floor")));
        let state = SessionState::new(PlayerState::new(PlayerId::from("p1"), Position::ORIGIN, 3, 2));

        let mut next_grid = grid.clone();
        next_grid.set_object(Position::new(1, 1), Some(TileRef::new("key")));
        let mut next_state = state.clone();
        next_state.player.position = Position::new(1, 0);
        next_state.player.lose_life();

        let delta = SessionDelta::from_states(&state, &grid, &next_state, &next_grid);
        assert!(delta.fields.contains(SessionFields::POSITION | SessionFields::LIVES | SessionFields::GRID));
        assert!(!delta.fields.contains(SessionFields::STATUS));
        assert_eq!(delta.cells.into_iter().collect::<Vec<_>>(), vec![Position::new(1, 1)]);
    }

    #[test]
    fn identical_snapshots_are_empty() {
        let grid = Grid::filled(GridDimensions::new(2, 2), Cell::new(TileRef::new("floor")));
        let state = SessionState::new(PlayerState::new(PlayerId::from("p1"), Position::ORIGIN, 3, 2));
        assert!(SessionDelta::from_states(&state, &grid, &state, &grid).is_empty());
    }
}
