//! Checkpoint evaluation of puzzle gates.

use serde::{Deserialize, Serialize};

use crate::state::{GateProgress, Grid, Position, SessionState};
use crate::theme::{self, GateBehavior, Theme};

use super::spec::{ActivationSpec, ConditionStep, Requirement, RequirementTarget};

/// What triggered an activation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "position", rename_all = "snake_case")]
pub enum Checkpoint {
    /// Session start; only used by [`initialize`].
    Start,
    PlayerMoved,
    ItemPlaced(Position),
    ItemRemoved(Position),
    /// A peer moved or a remote cell update arrived.
    Remote,
}

impl Checkpoint {
    fn dropped_at(self) -> Option<Position> {
        match self {
            Checkpoint::ItemPlaced(position) => Some(position),
            _ => None,
        }
    }
}

/// A gate changed state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateEvent {
    pub position: Position,
    pub opened: bool,
    /// Cursor value after the change.
    pub step: usize,
}

struct Gate {
    position: Position,
    spec: ActivationSpec,
    behavior: GateBehavior,
    is_open: bool,
}

fn discover(theme: &dyn Theme, grid: &Grid) -> Vec<Gate> {
    grid.iter()
        .filter_map(|(position, cell)| {
            let tile = cell.top();
            let spec = ActivationSpec::from_tile(tile)?;
            let behavior = theme::gate_behavior(theme, tile);
            Some(Gate {
                position,
                is_open: behavior.is_open(tile),
                spec,
                behavior,
            })
        })
        .collect()
}

fn set_gate(grid: &mut Grid, gate: &Gate, open: bool) {
    if let Some(cell) = grid.get_mut(gate.position) {
        gate.behavior.set_open(cell.top_mut(), open);
    }
}

/// Resets every gate cursor and opens gates flagged `startOpen`.
pub fn initialize(theme: &dyn Theme, grid: &mut Grid, state: &mut SessionState) -> Vec<GateEvent> {
    state.activation.clear();
    let mut events = Vec::new();
    let mut next: Option<Grid> = None;

    for gate in discover(theme, grid) {
        let mut progress = GateProgress::default();
        if gate.spec.start_open {
            progress.step = gate.spec.leading_open_steps();
            if !gate.is_open {
                set_gate(next.get_or_insert_with(|| grid.clone()), &gate, true);
                events.push(GateEvent {
                    position: gate.position,
                    opened: true,
                    step: progress.step,
                });
            }
        }
        state.activation.insert(gate.position.tile_key(), progress);
    }

    if let Some(next) = next {
        *grid = next;
    }
    tracing::debug!(gates = state.activation.len(), opened = events.len(), "activation initialized");
    events
}

/// Evaluates every gate against the current snapshot and applies the steps
/// that became satisfied.
pub fn run_checkpoint(
    theme: &dyn Theme,
    grid: &mut Grid,
    state: &mut SessionState,
    checkpoint: Checkpoint,
) -> Vec<GateEvent> {
    if state.is_terminal() {
        return Vec::new();
    }

    let participants = state.participant_positions();
    let mut events = Vec::new();
    let mut next: Option<Grid> = None;

    for gate in discover(theme, grid) {
        let key = gate.position.tile_key();
        let mut progress = state.activation.get(&key).copied().unwrap_or_default();

        let Some(step) = gate.spec.step(progress.step) else {
            continue;
        };
        if !step.enabled || step.direction.matches(gate.is_open) {
            continue;
        }

        let satisfied = if step.order_matters {
            advance_ordered(step, grid, &participants, &mut progress, checkpoint)
        } else {
            requirements_hold(&step.requirements, grid, &participants)
        };

        if satisfied {
            let open = step.direction.opens();
            set_gate(next.get_or_insert_with(|| grid.clone()), &gate, open);
            progress = GateProgress {
                step: progress.step + 1,
                fulfilled: 0,
            };
            tracing::info!(gate = %gate.position, open, step = progress.step, ?checkpoint, "gate changed");
            events.push(GateEvent {
                position: gate.position,
                opened: open,
                step: progress.step,
            });
        }
        state.activation.insert(key, progress);
    }

    if let Some(next) = next {
        *grid = next;
    }
    events
}

/// Advances the fulfilled-count cursor of an ordered step by at most one.
/// Returns true once every requirement has been fulfilled in order.
fn advance_ordered(
    step: &ConditionStep,
    grid: &Grid,
    participants: &[Position],
    progress: &mut GateProgress,
    checkpoint: Checkpoint,
) -> bool {
    let total = step.requirements.len();
    if total == 0 {
        return false;
    }

    let fulfilled = progress.fulfilled.min(total);
    if fulfilled < total {
        let expected = step.requirements[fulfilled].position();
        if checkpoint.dropped_at().is_some_and(|dropped| dropped != expected) {
            return false;
        }
        // Earlier requirements must still hold alongside the next one.
        if requirements_hold(&step.requirements[..=fulfilled], grid, participants) {
            progress.fulfilled = fulfilled + 1;
        }
    }
    progress.fulfilled >= total
}

/// True when every requirement holds at once, with each occupancy
/// requirement claimed by a distinct participant. An empty list never holds.
fn requirements_hold(requirements: &[Requirement], grid: &Grid, participants: &[Position]) -> bool {
    if requirements.is_empty() {
        return false;
    }

    let mut claimed = vec![false; participants.len()];
    requirements.iter().all(|requirement| {
        let position = requirement.position();
        match &requirement.item_id {
            RequirementTarget::Item(item_id) => grid.holds_item(position, item_id),
            RequirementTarget::Occupancy => {
                let free = participants
                    .iter()
                    .zip(claimed.iter_mut())
                    .find(|(at, used)| **at == position && !**used);
                match free {
                    Some((_, used)) => {
                        *used = true;
                        true
                    }
                    None => false,
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::activation::{ACTIVATION_KEY, GateDirection};
    use crate::state::{Cell, GridDimensions, PlayerId, PlayerState, TileRef};
    use crate::theme::{BasicTheme, OPEN_FLAG_KEY};

    const GATE: Position = Position::new(0, 0);

    fn world(spec: ActivationSpec) -> (Grid, SessionState) {
        let mut grid = Grid::filled(GridDimensions::new(8, 8), Cell::new(TileRef::new("floor")));
        let gate = TileRef::new("gate").with_config(ACTIVATION_KEY, serde_json::to_value(spec).unwrap());
        grid.set_object(GATE, Some(gate));
        let state = SessionState::new(PlayerState::new(
            PlayerId::from("p1"),
            Position::new(7, 7),
            3,
            4,
        ));
        (grid, state)
    }

    fn gate_open(grid: &Grid) -> bool {
        grid.get(GATE).unwrap().top().config_bool(OPEN_FLAG_KEY) == Some(true)
    }

    fn drop_item(grid: &mut Grid, position: Position, item: &str) {
        grid.set_object(position, Some(TileRef::new(item)));
    }

    #[test]
    fn start_open_gate_opens_and_skips_leading_open_steps() {
        let spec = ActivationSpec::new(
            true,
            vec![
                ConditionStep::new(GateDirection::Open, vec![Requirement::item(Position::new(1, 1), "a")]),
                ConditionStep::new(GateDirection::Close, vec![Requirement::item(Position::new(1, 1), "a")]),
            ],
        );
        let (mut grid, mut state) = world(spec);

        let events = initialize(&BasicTheme, &mut grid, &mut state);

        assert_eq!(events.len(), 1);
        assert!(gate_open(&grid));
        assert_eq!(state.activation[&GATE.tile_key()].step, 1);

        drop_item(&mut grid, Position::new(1, 1), "a");
        let events = run_checkpoint(&BasicTheme, &mut grid, &mut state, Checkpoint::ItemPlaced(Position::new(1, 1)));
        assert_eq!(events.len(), 1);
        assert!(!events[0].opened);
        assert!(!gate_open(&grid));
    }

    #[test]
    fn disabled_step_leaves_gate_inert() {
        let mut step = ConditionStep::new(GateDirection::Open, vec![Requirement::item(Position::new(1, 1), "a")]);
        step.enabled = false;
        let (mut grid, mut state) = world(ActivationSpec::new(false, vec![step]));
        initialize(&BasicTheme, &mut grid, &mut state);

        drop_item(&mut grid, Position::new(1, 1), "a");
        let events = run_checkpoint(&BasicTheme, &mut grid, &mut state, Checkpoint::ItemPlaced(Position::new(1, 1)));
        assert!(events.is_empty());
        assert!(!gate_open(&grid));
    }

    #[test]
    fn empty_requirement_list_never_satisfies() {
        let (mut grid, mut state) = world(ActivationSpec::new(
            false,
            vec![ConditionStep::new(GateDirection::Open, vec![])],
        ));
        initialize(&BasicTheme, &mut grid, &mut state);
        assert!(run_checkpoint(&BasicTheme, &mut grid, &mut state, Checkpoint::PlayerMoved).is_empty());
    }

    #[test]
    fn direction_matching_current_state_is_silent() {
        let (mut grid, mut state) = world(ActivationSpec::new(
            false,
            vec![ConditionStep::new(GateDirection::Close, vec![Requirement::item(Position::new(1, 1), "a")])],
        ));
        initialize(&BasicTheme, &mut grid, &mut state);
        drop_item(&mut grid, Position::new(1, 1), "a");

        assert!(run_checkpoint(&BasicTheme, &mut grid, &mut state, Checkpoint::PlayerMoved).is_empty());
        assert_eq!(state.activation[&GATE.tile_key()].step, 0);
    }

    #[test]
    fn doors_swap_tile_type() {
        let mut grid = Grid::filled(GridDimensions::new(4, 4), Cell::new(TileRef::new("floor")));
        let spec = ActivationSpec::new(
            false,
            vec![ConditionStep::new(GateDirection::Open, vec![Requirement::occupancy(Position::new(2, 2))])],
        );
        grid.set_object(
            GATE,
            Some(TileRef::new("door").with_config(ACTIVATION_KEY, serde_json::to_value(spec).unwrap())),
        );
        let mut state = SessionState::new(PlayerState::new(PlayerId::from("p1"), Position::new(2, 2), 3, 4));
        initialize(&BasicTheme, &mut grid, &mut state);

        let events = run_checkpoint(&BasicTheme, &mut grid, &mut state, Checkpoint::PlayerMoved);
        assert_eq!(events.len(), 1);
        assert_eq!(grid.get(GATE).unwrap().top().tile_type, "door_open");
    }

    #[test]
    fn occupancy_needs_distinct_participants() {
        let requirements = [Requirement::occupancy(Position::new(1, 1)), Requirement::occupancy(Position::new(1, 1))];
        let grid = Grid::filled(GridDimensions::new(4, 4), Cell::new(TileRef::new("floor")));

        assert!(!requirements_hold(&requirements, &grid, &[Position::new(1, 1)]));
        assert!(requirements_hold(
            &requirements,
            &grid,
            &[Position::new(1, 1), Position::new(1, 1)]
        ));
    }
}
