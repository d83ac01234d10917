//! Movement resolution: bounds, theme movement rules, generic walkability,
//! tile rewrites and instant hazards.

use crate::state::{CardinalDirection, Grid, Position, SessionState};
use crate::theme::{self, BasicCatalogue, MoveContext, MoveRule, Theme};

/// Config key that tags a cell as a reachable location for `reach` missions.
pub const LOCATION_ID_KEY: &str = "locationId";

/// Outcome of a single movement attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveResolution {
    /// The session already ended; nothing was evaluated.
    Inactive,
    /// Target outside the grid; no state change at all.
    OutOfBounds,
    Blocked {
        target: Position,
        message: Option<String>,
    },
    Moved {
        from: Position,
        to: Position,
        /// True when the theme rewrote the source and/or destination cell.
        rewritten: bool,
        message: Option<String>,
    },
    /// Entering the target cost a life. The mover did not move.
    Hazard {
        target: Position,
        message: Option<String>,
        lives: u32,
        failed: bool,
    },
}

impl MoveResolution {
    pub fn moved(&self) -> bool {
        matches!(self, MoveResolution::Moved { .. })
    }
}

/// High-level movement intent for the local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveAction {
    pub direction: CardinalDirection,
}

impl MoveAction {
    pub fn new(direction: CardinalDirection) -> Self {
        Self { direction }
    }

    /// Resolves the move against `grid` and `state`, mutating both on success.
    pub fn resolve(
        &self,
        theme: &dyn Theme,
        grid: &mut Grid,
        state: &mut SessionState,
    ) -> MoveResolution {
        if state.is_terminal() {
            return MoveResolution::Inactive;
        }

        let from = state.player.position;
        let to = self.direction.step(from);
        let Some(target_cell) = grid.get(to) else {
            return MoveResolution::OutOfBounds;
        };

        state.player.facing = self.direction;
        // Reveal-on-approach: bookkeeping happens for blocked attempts too.
        state.reveal_around(to, grid);

        let rule = {
            let current_tile = grid
                .get(from)
                .map(|cell| cell.top())
                .unwrap_or_else(|| target_cell.top());
            let context = MoveContext {
                from,
                to,
                current_tile,
                player: &state.player,
            };
            theme::recover(
                "check_movement_into",
                theme.check_movement_into(target_cell.top(), &context),
            )
            .flatten()
            .unwrap_or_else(|| fallback_rule(theme, grid, to))
        };

        match rule {
            MoveRule::Blocked { message } => {
                tracing::debug!(%to, ?message, "move blocked");
                MoveResolution::Blocked {
                    target: to,
                    message,
                }
            }
            MoveRule::Allowed => {
                arrive(grid, state, to);
                MoveResolution::Moved {
                    from,
                    to,
                    rewritten: false,
                    message: None,
                }
            }
            MoveRule::AllowedWithRewrite {
                source,
                destination,
                message,
            } => {
                let mut next = grid.clone();
                if let Some(cell) = source {
                    next.set(from, cell);
                }
                if let Some(cell) = destination {
                    next.set(to, cell);
                }
                *grid = next;
                arrive(grid, state, to);
                MoveResolution::Moved {
                    from,
                    to,
                    rewritten: true,
                    message,
                }
            }
            MoveRule::Hazard { message } => {
                let lives = state.player.lose_life();
                let failed = lives == 0 && state.fail();
                tracing::info!(%to, lives, failed, "hazard hit while moving");
                MoveResolution::Hazard {
                    target: to,
                    message,
                    lives,
                    failed,
                }
            }
        }
    }
}

fn arrive(grid: &Grid, state: &mut SessionState, to: Position) {
    state.player.position = to;
    state.moves += 1;
    if let Some(cell) = grid.get(to) {
        for location in cell.layers().filter_map(|tile| tile.config_str(LOCATION_ID_KEY)) {
            state.player.mark_reached(location);
        }
    }
}

/// Generic walkability check used when the theme declines to classify a move.
fn fallback_rule(theme: &dyn Theme, grid: &Grid, to: Position) -> MoveRule {
    let walkable = grid.get(to).is_some_and(|cell| {
        cell.layers()
            .all(|tile| BasicCatalogue::is_walkable(tile, theme::tile_def(theme, &tile.tile_type)))
    });
    if walkable {
        MoveRule::Allowed
    } else {
        MoveRule::Blocked { message: None }
    }
}
