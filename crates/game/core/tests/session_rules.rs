//! End-to-end rule checks driven through the public session API.

use std::sync::Arc;

use escape_core::action::activation::{self, ACTIVATION_KEY};
use escape_core::{
    ActivationSpec, CardinalDirection, Cell, ConditionStep, ExecOutcome, GateDirection, Grid,
    GridDimensions, HazardCooldownScope, HazardDescriptor, Interaction, InteractionScratch,
    LevelDocument, Mission, MoveContext, MoveRule, PlayerId, PlayerState, Position, Requirement,
    Session, SessionConfig, SessionEvent, SessionOutcome, SessionState, SessionStatus, Theme,
    ThemeError, TileRef, Timestamp, mission,
};
use escape_core::theme::OPEN_FLAG_KEY;

// ============================================================================
// Fixtures
// ============================================================================

/// Small theme: lava hurts on entry, smoke hurts while standing in it,
/// levers can be pulled.
struct CellarTheme;

impl Theme for CellarTheme {
    fn name(&self) -> &str {
        "cellar"
    }

    fn check_movement_into(
        &self,
        target: &TileRef,
        _context: &MoveContext<'_>,
    ) -> Result<Option<MoveRule>, ThemeError> {
        Ok(target.is_type("lava").then(|| MoveRule::Hazard {
            message: Some("The lava burns".into()),
        }))
    }

    fn check_hazard_at(
        &self,
        grid: &Grid,
        position: Position,
        _player: &PlayerState,
    ) -> Result<Option<HazardDescriptor>, ThemeError> {
        let smoky = grid
            .get(position)
            .is_some_and(|cell| cell.has_tile_type("smoke"));
        Ok(smoky.then(|| HazardDescriptor::continuous("You cough")))
    }

    fn available_interactions(
        &self,
        _player: &PlayerState,
        grid: &Grid,
        target: Position,
        _self_only: bool,
    ) -> Result<Vec<Interaction>, ThemeError> {
        let lever = grid
            .get(target)
            .is_some_and(|cell| cell.has_tile_type("lever"));
        Ok(if lever {
            vec![Interaction::new("pull_lever", "Pull lever", 1_000)]
        } else {
            Vec::new()
        })
    }

    fn execute_interaction(
        &self,
        id: &str,
        scratch: &mut InteractionScratch,
        target: Position,
    ) -> Result<ExecOutcome, ThemeError> {
        if id != "pull_lever" {
            return Err(ThemeError::UnknownInteraction(id.to_owned()));
        }
        if let Some(cell) = scratch.grid.get_mut(target) {
            cell.top_mut().config.insert("pulled".into(), true.into());
        }
        scratch.player.collect("lever");
        Ok(ExecOutcome::success().with_message("Click"))
    }
}

fn floor_grid(width: u32, height: u32) -> Grid {
    Grid::filled(
        GridDimensions::new(width, height),
        Cell::new(TileRef::new("floor")),
    )
}

fn start(level: LevelDocument, config: SessionConfig) -> Session {
    Session::new(
        level,
        Arc::new(CellarTheme),
        config,
        PlayerId::from("solver"),
        Timestamp::ZERO,
    )
    .expect("level should be valid")
}

fn gate_world(spec: ActivationSpec) -> (Grid, SessionState) {
    let mut grid = floor_grid(8, 8);
    let gate = TileRef::new("gate").with_config(
        ACTIVATION_KEY,
        serde_json::to_value(spec).expect("spec serializes"),
    );
    grid.set_object(Position::new(0, 0), Some(gate));
    let state = SessionState::new(PlayerState::new(
        PlayerId::from("solver"),
        Position::new(7, 7),
        3,
        5,
    ));
    (grid, state)
}

fn gate_is_open(grid: &Grid) -> bool {
    grid.get(Position::new(0, 0))
        .and_then(|cell| cell.top().config_bool(OPEN_FLAG_KEY))
        .unwrap_or(false)
}

fn place(grid: &mut Grid, state: &mut SessionState, position: Position, item: &str) -> usize {
    grid.set_object(position, Some(TileRef::new(item)));
    activation::run_checkpoint(
        &CellarTheme,
        grid,
        state,
        escape_core::Checkpoint::ItemPlaced(position),
    )
    .len()
}

// ============================================================================
// Movement
// ============================================================================

#[test]
fn moves_off_the_grid_never_change_state() {
    let corners = [
        (Position::new(0, 0), CardinalDirection::North),
        (Position::new(0, 0), CardinalDirection::West),
        (Position::new(2, 2), CardinalDirection::South),
        (Position::new(2, 2), CardinalDirection::East),
    ];
    for (index, (corner, direction)) in corners.into_iter().enumerate() {
        let mut level = LevelDocument::new(floor_grid(3, 3)).with_spawn(corner);
        level.name = format!("corner-{index}");
        let mut session = start(level, SessionConfig::default());
        let before = session.state().clone();

        session.press(direction);
        let outcome = session.poll_movement(Timestamp(index as u64 * 1_000));

        assert!(outcome.delta.is_empty(), "{direction} from {corner} changed state");
        assert_eq!(session.state(), &before);
    }
}

#[test]
fn rapid_inputs_inside_cooldown_move_at_most_once() {
    let mut session = start(
        LevelDocument::new(floor_grid(5, 5)),
        SessionConfig::default(),
    );

    session.press(CardinalDirection::South);
    session.poll_movement(Timestamp(1_000));
    session.release(CardinalDirection::South);
    session.press(CardinalDirection::East);
    session.poll_movement(Timestamp(1_149));

    assert_eq!(session.player().position, Position::new(0, 1));
    assert_eq!(session.state().moves, 1);

    session.poll_movement(Timestamp(1_150));
    assert_eq!(session.player().position, Position::new(1, 1));
}

#[test]
fn walls_block_but_reveal_fog() {
    let mut grid = floor_grid(3, 3);
    grid.set_object(Position::new(1, 0), Some(TileRef::new("wall")));
    let mut session = start(LevelDocument::new(grid), SessionConfig::default());

    session.press(CardinalDirection::East);
    let outcome = session.poll_movement(Timestamp(0));

    assert!(matches!(
        outcome.events.as_slice(),
        [SessionEvent::MoveBlocked { .. }]
    ));
    assert_eq!(session.player().position, Position::ORIGIN);
    assert!(session.state().revealed.contains(&Position::new(2, 0)));
}

// ============================================================================
// Lives and terminal states
// ============================================================================

#[test]
fn last_life_lost_fails_and_freezes_session() {
    let mut grid = floor_grid(3, 1);
    grid.set(Position::new(1, 0), Cell::new(TileRef::new("lava")));
    let level = LevelDocument::new(grid).with_lives(2);
    let mut session = start(level, SessionConfig::default());

    session.press(CardinalDirection::East);
    session.poll_movement(Timestamp(0));
    assert_eq!(session.player().lives(), 1);
    assert_eq!(session.player().position, Position::ORIGIN);

    let outcome = session.poll_movement(Timestamp(200));
    assert!(outcome.events.contains(&SessionEvent::StatusChanged {
        status: SessionStatus::Failed
    }));
    assert_eq!(session.status(), SessionStatus::Failed);

    assert!(session.poll_movement(Timestamp(400)).is_empty());
    assert!(session.poll_hazards(Timestamp(400)).is_empty());
    assert_eq!(session.player().lives(), 0);
    assert_eq!(session.elapsed_ms(Timestamp(60_000)), 200);
}

#[test]
fn hazard_cooldown_is_per_tile_by_default() {
    let mut grid = floor_grid(3, 1);
    grid.set_object(Position::new(0, 0), Some(TileRef::new("smoke")));
    grid.set_object(Position::new(1, 0), Some(TileRef::new("smoke")));

    let mut per_tile = start(LevelDocument::new(grid.clone()), SessionConfig::default());
    let mut shared = start(
        LevelDocument::new(grid),
        SessionConfig::default().with_hazard_cooldown_scope(HazardCooldownScope::Shared),
    );

    for session in [&mut per_tile, &mut shared] {
        session.poll_hazards(Timestamp(0));
        session.press(CardinalDirection::East);
        session.poll_movement(Timestamp(100));
        session.poll_hazards(Timestamp(500));
    }

    assert_eq!(per_tile.player().lives(), 1);
    assert_eq!(shared.player().lives(), 2);
    assert!(per_tile.state().hazard_zones.contains(&Position::new(1, 0)));
}

// ============================================================================
// Activation
// ============================================================================

#[test]
fn unordered_gate_opens_once_when_all_items_present() {
    let a = Position::new(3, 4);
    let b = Position::new(5, 6);
    let (mut grid, mut state) = gate_world(ActivationSpec::new(
        false,
        vec![ConditionStep::new(
            GateDirection::Open,
            vec![Requirement::item(a, "A"), Requirement::item(b, "B")],
        )],
    ));
    activation::initialize(&CellarTheme, &mut grid, &mut state);

    assert_eq!(place(&mut grid, &mut state, a, "A"), 0);
    assert!(!gate_is_open(&grid));

    assert_eq!(place(&mut grid, &mut state, b, "B"), 1);
    assert!(gate_is_open(&grid));

    assert_eq!(place(&mut grid, &mut state, Position::new(6, 6), "C"), 0);
    assert!(gate_is_open(&grid));
}

#[test]
fn ordered_gate_advances_one_requirement_at_a_time() {
    let first = Position::new(1, 1);
    let second = Position::new(2, 2);
    let third = Position::new(3, 3);
    let (mut grid, mut state) = gate_world(ActivationSpec::new(
        false,
        vec![ConditionStep::new(
            GateDirection::Open,
            vec![
                Requirement::item(first, "a"),
                Requirement::item(second, "b"),
                Requirement::item(third, "c"),
            ],
        )
        .ordered()],
    ));
    activation::initialize(&CellarTheme, &mut grid, &mut state);
    let fulfilled = |state: &SessionState| state.activation["0,0"].fulfilled;

    place(&mut grid, &mut state, second, "b");
    assert_eq!(fulfilled(&state), 0);
    grid.set_object(second, None);

    place(&mut grid, &mut state, first, "a");
    assert_eq!(fulfilled(&state), 1);
    place(&mut grid, &mut state, second, "b");
    assert_eq!(fulfilled(&state), 2);
    assert!(!gate_is_open(&grid));

    assert_eq!(place(&mut grid, &mut state, third, "c"), 1);
    assert!(gate_is_open(&grid));
    assert_eq!(state.activation["0,0"].step, 1);
}

#[test]
fn occupancy_requirements_need_distinct_participants() {
    let left = Position::new(2, 2);
    let right = Position::new(4, 2);
    let (mut grid, mut state) = gate_world(ActivationSpec::new(
        false,
        vec![ConditionStep::new(
            GateDirection::Open,
            vec![Requirement::occupancy(left), Requirement::occupancy(right)],
        )],
    ));
    activation::initialize(&CellarTheme, &mut grid, &mut state);
    state.player.position = left;

    let events = activation::run_checkpoint(
        &CellarTheme,
        &mut grid,
        &mut state,
        escape_core::Checkpoint::PlayerMoved,
    );
    assert!(events.is_empty());
    assert!(!gate_is_open(&grid));

    state.peers.insert(PlayerId::from("helper"), right);
    let events = activation::run_checkpoint(
        &CellarTheme,
        &mut grid,
        &mut state,
        escape_core::Checkpoint::Remote,
    );
    assert_eq!(events.len(), 1);
    assert!(gate_is_open(&grid));
}

#[test]
fn legacy_flat_requirements_are_upgraded() {
    let mut grid = floor_grid(4, 4);
    grid.set_object(
        Position::new(0, 0),
        Some(TileRef::new("gate").with_config(
            ACTIVATION_KEY,
            serde_json::json!({"requirements": [{"x": 2, "y": 2, "itemId": "key"}]}),
        )),
    );
    let mut state = SessionState::new(PlayerState::new(
        PlayerId::from("solver"),
        Position::new(3, 3),
        3,
        5,
    ));
    activation::initialize(&CellarTheme, &mut grid, &mut state);

    assert_eq!(place(&mut grid, &mut state, Position::new(2, 2), "key"), 1);
    assert!(gate_is_open(&grid));
}

/// Two participants on the same level, as two networked clients would run it.
fn pair(level: &LevelDocument) -> (Session, Session) {
    let join = |id: &str| {
        Session::new(
            level.clone(),
            Arc::new(CellarTheme),
            SessionConfig::default(),
            PlayerId::from(id),
            Timestamp::ZERO,
        )
        .expect("level should be valid")
    };
    (join("ada"), join("bob"))
}

/// Delivers every cell a local outcome touched, the way a careless relay
/// would, gate cells included.
fn relay(from: &Session, outcome: &SessionOutcome, to: &mut Session, now: Timestamp) {
    for &position in &outcome.delta.cells {
        let cell = from.grid().get(position).expect("changed cells exist").clone();
        to.apply_remote_cell(position, cell, now);
    }
    to.update_peer(from.player_id().clone(), from.player().position, now);
}

#[test]
fn ordered_gate_stays_in_step_on_a_peer_fed_remote_updates() {
    let first = Position::new(2, 5);
    let second = Position::new(0, 4);
    let mut grid = floor_grid(8, 8);
    grid.set_object(
        Position::new(0, 0),
        Some(TileRef::new("gate").with_config(
            ACTIVATION_KEY,
            serde_json::to_value(ActivationSpec::new(
                false,
                vec![
                    ConditionStep::new(
                        GateDirection::Open,
                        vec![Requirement::item(first, "a"), Requirement::item(second, "b")],
                    )
                    .ordered(),
                    ConditionStep::new(
                        GateDirection::Close,
                        vec![Requirement::occupancy(Position::new(5, 5))],
                    ),
                ],
            ))
            .expect("spec serializes"),
        )),
    );
    grid.set_object(Position::new(2, 4), Some(TileRef::new("a")));
    grid.set_object(first, Some(TileRef::new("b")));
    let level = LevelDocument::new(grid).with_spawn(Position::new(2, 4));
    let (mut ada, mut bob) = pair(&level);
    let cursor = |session: &Session| session.state().activation["0,0"];

    // Pick up both items: "a" underfoot, then "b" from the faced cell.
    for at in [10, 20] {
        let outcome = ada.pick_up(Timestamp(at));
        relay(&ada, &outcome, &mut bob, Timestamp(at));
    }
    assert_eq!(ada.player().inventory.len(), 2);
    assert_eq!(bob.grid(), ada.grid());

    let outcome = ada.place_item(0, Timestamp(30));
    relay(&ada, &outcome, &mut bob, Timestamp(30));
    assert_eq!(cursor(&ada).fulfilled, 1);
    assert_eq!(cursor(&bob), cursor(&ada));

    ada.press(CardinalDirection::West);
    let outcome = ada.poll_movement(Timestamp(1_000));
    ada.release(CardinalDirection::West);
    relay(&ada, &outcome, &mut bob, Timestamp(1_000));
    assert_eq!(cursor(&bob), cursor(&ada));

    let outcome = ada.place_item(0, Timestamp(1_100));
    assert!(outcome.events.contains(&SessionEvent::GateChanged {
        position: Position::ORIGIN,
        opened: true,
    }));
    relay(&ada, &outcome, &mut bob, Timestamp(1_100));
    assert!(gate_is_open(bob.grid()));
    assert_eq!(cursor(&bob), cursor(&ada));
    assert_eq!(cursor(&ada).step, 1);

    // A peer on the closing plate shuts the gate for both.
    ada.update_peer(PlayerId::from("cleo"), Position::new(5, 5), Timestamp(1_200));
    bob.update_peer(PlayerId::from("cleo"), Position::new(5, 5), Timestamp(1_200));
    assert!(!gate_is_open(ada.grid()));
    assert!(!gate_is_open(bob.grid()));
    assert_eq!(cursor(&bob), cursor(&ada));
    assert_eq!(cursor(&ada).step, 2);
}

#[test]
fn remote_writes_to_gate_cells_are_ignored() {
    let (mut grid, _) = gate_world(ActivationSpec::new(
        false,
        vec![ConditionStep::new(
            GateDirection::Open,
            vec![Requirement::item(Position::new(3, 3), "key")],
        )],
    ));
    let level = LevelDocument::new(grid).with_spawn(Position::new(7, 7));
    let mut session = start(level, SessionConfig::default());

    let mut forced = session.grid().get(Position::ORIGIN).expect("gate cell").clone();
    forced.top_mut().config.insert(OPEN_FLAG_KEY.into(), true.into());
    let outcome = session.apply_remote_cell(Position::ORIGIN, forced, Timestamp(10));

    assert!(outcome.is_empty());
    assert!(!gate_is_open(session.grid()));
    assert_eq!(session.state().activation["0,0"].step, 0);
}

// ============================================================================
// Items
// ============================================================================

fn items_session(capacity: usize) -> Session {
    let mut grid = floor_grid(4, 4);
    grid.set_object(
        Position::new(0, 0),
        Some(TileRef::new("gate").with_config(
            ACTIVATION_KEY,
            serde_json::to_value(ActivationSpec::new(
                false,
                vec![ConditionStep::new(
                    GateDirection::Open,
                    vec![Requirement::occupancy(Position::new(1, 1))],
                )],
            ))
            .expect("spec serializes"),
        )),
    );
    grid.set_object(
        Position::new(1, 1),
        Some(TileRef::new("item").with_config("itemType", "key").with_config("color", "red")),
    );
    grid.set_object(Position::new(1, 2), Some(TileRef::new("gem")));
    let mut level = LevelDocument::new(grid)
        .with_spawn(Position::new(1, 1))
        .with_missions(vec![Mission::collect("key")]);
    level.inventory_capacity = Some(capacity);
    start(level, SessionConfig::default())
}

#[test]
fn picking_up_moves_the_item_into_the_inventory() {
    let mut session = items_session(5);

    let outcome = session.pick_up(Timestamp(100));

    assert!(outcome.events.contains(&SessionEvent::ItemPickedUp {
        position: Position::new(1, 1),
        item_type: "key".into(),
    }));
    let carried = session.player().inventory.get(0).expect("key carried");
    assert_eq!(carried.item_type, "key");
    assert_eq!(carried.fields.get("color"), Some(&serde_json::json!("red")));
    assert!(carried.fields.get("itemType").is_none());
    assert!(session.player().collected.contains("key"));
    assert_eq!(session.grid().get(Position::new(1, 1)).and_then(|cell| cell.object.as_ref()), None);
    assert!(outcome.delta.cells.contains(&Position::new(1, 1)));

    // The removal checkpoint ran: the occupancy step is now evaluated.
    assert!(gate_is_open(session.grid()));

    // Next pickup reaches the faced cell; gates are never carried off.
    session.pick_up(Timestamp(200));
    assert_eq!(session.player().inventory.len(), 2);
    assert!(session.grid().get(Position::ORIGIN).is_some_and(|cell| cell.object.is_some()));
}

#[test]
fn full_inventory_leaves_the_item_on_the_grid() {
    let mut session = items_session(1);
    session.pick_up(Timestamp(100));
    let grid_before = session.grid().clone();

    let outcome = session.pick_up(Timestamp(200));

    assert_eq!(
        outcome.events,
        vec![SessionEvent::message("Your inventory is full")]
    );
    assert!(outcome.delta.is_empty());
    assert_eq!(session.grid(), &grid_before);
    assert_eq!(session.player().inventory.len(), 1);
    assert!(!session.player().collected.contains("gem"));
}

// ============================================================================
// Missions
// ============================================================================

#[test]
fn mission_set_completion_ignores_achievement_order() {
    let grid = floor_grid(2, 2);
    let missions = vec![
        Mission::collect("gem"),
        Mission::reach("altar"),
        Mission::collect("key"),
    ];
    let orders: [[&str; 3]; 2] = [["gem", "altar", "key"], ["key", "altar", "gem"]];

    for order in orders {
        let mut state = SessionState::new(PlayerState::new(
            PlayerId::from("solver"),
            Position::ORIGIN,
            3,
            5,
        ));
        for id in order {
            let progress = mission::evaluate_all(&missions, &state, false, &grid, &CellarTheme);
            assert!(!progress.all_complete);
            if id == "altar" {
                state.player.mark_reached(id);
            } else {
                state.player.collect(id);
            }
        }
        assert!(mission::evaluate_all(&missions, &state, false, &grid, &CellarTheme).all_complete);
    }
}

// ============================================================================
// Interactions
// ============================================================================

fn lever_session() -> Session {
    let mut grid = floor_grid(3, 3);
    grid.set_object(Position::new(1, 2), Some(TileRef::new("lever")));
    let level = LevelDocument::new(grid).with_spawn(Position::new(1, 1));
    start(level, SessionConfig::default())
}

#[test]
fn releasing_before_completion_cancels_without_mutation() {
    let mut session = lever_session();
    let grid_before = session.grid().clone();

    let outcome = session.request_interaction(false, Timestamp(0));
    assert!(matches!(
        outcome.events.as_slice(),
        [SessionEvent::InteractionStarted { .. }]
    ));
    let tick = session.poll_interaction(Timestamp(400));
    assert!(matches!(
        tick.events.as_slice(),
        [SessionEvent::InteractionProgress { progress, .. }] if (*progress - 0.4).abs() < 1e-6
    ));
    assert!(tick.delta.is_empty());

    let outcome = session.release_interaction(Timestamp(500));
    assert!(matches!(
        outcome.events.as_slice(),
        [SessionEvent::InteractionCancelled { .. }]
    ));

    session.poll_interaction(Timestamp(2_000));
    assert_eq!(session.grid(), &grid_before);
    assert!(!session.player().collected.contains("lever"));
}

#[test]
fn holding_to_completion_commits_exactly_once() {
    let mut session = lever_session();
    session.request_interaction(false, Timestamp(0));

    let outcome = session.poll_interaction(Timestamp(1_000));
    assert!(outcome.events.contains(&SessionEvent::InteractionCompleted {
        id: "pull_lever".into(),
        message: Some("Click".into()),
    }));
    assert!(outcome.delta.cells.contains(&Position::new(1, 2)));
    assert!(session.player().collected.contains("lever"));

    let outcome = session.request_interaction(false, Timestamp(1_100));
    assert!(outcome.events.is_empty());
    assert!(session.poll_interaction(Timestamp(3_000)).is_empty());
}
