//! Continuous hazard damage.
//!
//! Hazards are polled on a fixed tick. A hazard may damage the player again
//! only after its interval has elapsed since the previous damage; the first
//! contact damages immediately. Cooldown timestamps are keyed either per
//! hazard tile or shared across all hazards, see [`HazardCooldownScope`].

use std::collections::{BTreeMap, BTreeSet};

use crate::config::HazardCooldownScope;
use crate::state::{Grid, Position, SessionState, Timestamp};
use crate::theme::{self, Theme};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum CooldownKey {
    Tile(Position),
    Shared,
}

/// Damage dealt by one hazard poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HazardHit {
    pub position: Position,
    pub message: Option<String>,
    pub lives: u32,
    pub failed: bool,
}

/// Tracks when each hazard last damaged the player.
#[derive(Clone, Debug, Default)]
pub struct HazardTracker {
    scope: HazardCooldownScope,
    last_damage: BTreeMap<CooldownKey, Timestamp>,
}

impl HazardTracker {
    pub fn new(scope: HazardCooldownScope) -> Self {
        Self {
            scope,
            last_damage: BTreeMap::new(),
        }
    }

    pub fn scope(&self) -> HazardCooldownScope {
        self.scope
    }

    pub fn reset(&mut self) {
        self.last_damage.clear();
    }

    fn key(&self, position: Position) -> CooldownKey {
        match self.scope {
            HazardCooldownScope::PerTile => CooldownKey::Tile(position),
            HazardCooldownScope::Shared => CooldownKey::Shared,
        }
    }

    /// Polls the hazard under the player at `now`.
    pub fn check(
        &mut self,
        theme: &dyn Theme,
        grid: &Grid,
        state: &mut SessionState,
        now: Timestamp,
        default_interval_ms: u64,
    ) -> Option<HazardHit> {
        if state.is_terminal() {
            return None;
        }

        let position = state.player.position;
        let hazard = theme::recover(
            "check_hazard_at",
            theme.check_hazard_at(grid, position, &state.player),
        )
        .flatten()
        .filter(|hazard| hazard.continuous)?;

        let interval = hazard.interval_ms.unwrap_or(default_interval_ms);
        let key = self.key(position);
        if let Some(last) = self.last_damage.get(&key)
            && now.since(*last) < interval
        {
            return None;
        }

        self.last_damage.insert(key, now);
        let lives = state.player.lose_life();
        let failed = lives == 0 && state.fail();
        tracing::info!(%position, lives, failed, "continuous hazard damage");

        Some(HazardHit {
            position,
            message: hazard.message,
            lives,
            failed,
        })
    }
}

/// Rebuilds the display cache of hazardous cells. Returns whether it changed.
pub fn recompute_hazard_zones(theme: &dyn Theme, grid: &Grid, state: &mut SessionState) -> bool {
    let zones: BTreeSet<Position> = grid
        .positions()
        .filter(|position| {
            theme::recover(
                "check_hazard_at",
                theme.check_hazard_at(grid, *position, &state.player),
            )
            .flatten()
            .is_some()
        })
        .collect();
    if zones == state.hazard_zones {
        return false;
    }
    state.hazard_zones = zones;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThemeError;
    use crate::state::{Cell, GridDimensions, PlayerId, PlayerState, SessionStatus, TileRef};
    use crate::theme::HazardDescriptor;

    struct SmokeTheme;

    impl Theme for SmokeTheme {
        fn check_hazard_at(
            &self,
            grid: &Grid,
            position: Position,
            _player: &crate::state::PlayerState,
        ) -> Result<Option<HazardDescriptor>, ThemeError> {
            let smoky = grid.get(position).is_some_and(|cell| cell.has_tile_type("smoke"));
            Ok(smoky.then(|| HazardDescriptor::continuous("You cough")))
        }
    }

    fn setup() -> (Grid, SessionState) {
        let mut grid = Grid::filled(GridDimensions::new(3, 1), Cell::new(TileRef::new("floor")));
        grid.set_object(Position::new(1, 0), Some(TileRef::new("smoke")));
        grid.set_object(Position::new(2, 0), Some(TileRef::new("smoke")));
        let state = SessionState::new(PlayerState::new(
            PlayerId::from("p1"),
            Position::new(1, 0),
            3,
            4,
        ));
        (grid, state)
    }

    #[test]
    fn first_contact_damages_then_waits_for_interval() {
        let (grid, mut state) = setup();
        let mut tracker = HazardTracker::new(HazardCooldownScope::PerTile);

        assert!(tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(1_000), 5_000).is_some());
        assert!(tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(3_000), 5_000).is_none());
        let hit = tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(6_000), 5_000).unwrap();
        assert_eq!(hit.lives, 1);
    }

    #[test]
    fn per_tile_cooldowns_are_independent() {
        let (grid, mut state) = setup();
        let mut tracker = HazardTracker::new(HazardCooldownScope::PerTile);

        tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(0), 5_000);
        state.player.position = Position::new(2, 0);
        assert!(tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(500), 5_000).is_some());
        assert_eq!(state.player.lives(), 1);
    }

    #[test]
    fn shared_cooldown_spans_tiles() {
        let (grid, mut state) = setup();
        let mut tracker = HazardTracker::new(HazardCooldownScope::Shared);

        tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(0), 5_000);
        state.player.position = Position::new(2, 0);
        assert!(tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(500), 5_000).is_none());
        assert_eq!(state.player.lives(), 2);
    }

    #[test]
    fn running_out_of_lives_fails_once() {
        let (grid, mut state) = setup();
        let mut tracker = HazardTracker::new(HazardCooldownScope::PerTile);

        let hits: Vec<_> = (0..5)
            .filter_map(|i| tracker.check(&SmokeTheme, &grid, &mut state, Timestamp(i * 5_000), 5_000))
            .collect();
        assert_eq!(hits.len(), 3);
        assert!(hits[2].failed);
        assert_eq!(state.status(), SessionStatus::Failed);
    }

    #[test]
    fn zones_follow_theme_classification() {
        let (grid, mut state) = setup();
        assert!(recompute_hazard_zones(&SmokeTheme, &grid, &mut state));
        assert_eq!(state.hazard_zones.len(), 2);
        assert!(state.hazard_zones.contains(&Position::new(2, 0)));
        assert!(!recompute_hazard_zones(&SmokeTheme, &grid, &mut state));
    }
}
