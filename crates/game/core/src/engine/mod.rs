//! Session loop.
//!
//! [`Session`] owns everything one play-through needs and exposes the
//! per-tick callbacks the scheduler invokes in a fixed order:
//! [`Session::poll_movement`], [`Session::poll_interaction`],
//! [`Session::recompute_hazard_zones`] and [`Session::poll_hazards`]. Input,
//! interaction and network entry points sit alongside them.
//!
//! Every callback snapshots the state before running and returns a
//! [`SessionOutcome`] holding the emitted events plus a [`SessionDelta`] of
//! what changed. Time is always passed in by the caller.

mod events;
mod input;

pub use events::{SessionEvent, SessionOutcome};
pub use input::InputTracker;

use std::sync::Arc;

use serde_json::Value;

use crate::action::activation::ActivationSpec;
use crate::action::{
    self, Checkpoint, HazardTracker, InteractionEngine, InteractionPhase, InteractionRequest,
    InteractionUpdate, MoveAction, MoveResolution, activation,
};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::level::LevelDocument;
use crate::mission::{self, Mission, MissionProgress};
use crate::state::{
    CardinalDirection, Cell, Grid, ITEM_TYPE_KEY, ItemInstance, PlayerId, PlayerState, Position,
    SessionDelta, SessionFields, SessionState, SessionStatus, TileRef, Timestamp,
};
use crate::theme::{self, BasicCatalogue, Interaction, Theme, TileCategory};

/// One in-progress play-through of a level.
pub struct Session {
    theme: Arc<dyn Theme>,
    config: SessionConfig,
    level: LevelDocument,
    missions: Vec<Mission>,
    grid: Grid,
    state: SessionState,
    interaction: InteractionEngine,
    input: InputTracker,
    hazards: HazardTracker,
    progress: MissionProgress,
    started_at: Timestamp,
    finished_at: Option<Timestamp>,
}

impl Session {
    /// Builds a session from level defaults.
    pub fn new(
        level: LevelDocument,
        theme: Arc<dyn Theme>,
        config: SessionConfig,
        player_id: PlayerId,
        now: Timestamp,
    ) -> Result<Self, SessionError> {
        level.validate(theme.as_ref(), &config)?;
        let missions = mission::with_default_escape(level.missions.clone(), theme.as_ref());
        let (grid, state) = fresh_state(&level, theme.as_ref(), &config, player_id);
        let progress =
            mission::evaluate_all(&missions, &state, level.fixed_order, &grid, theme.as_ref());

        tracing::info!(
            level = %level.name,
            theme = theme.name(),
            player = %state.player.id,
            missions = missions.len(),
            "session started"
        );

        Ok(Self {
            hazards: HazardTracker::new(config.hazard_cooldown_scope),
            theme,
            config,
            level,
            missions,
            grid,
            state,
            interaction: InteractionEngine::new(),
            input: InputTracker::new(),
            progress,
            started_at: now,
            finished_at: None,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn player(&self) -> &PlayerState {
        &self.state.player
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.state.player.id
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn mission_progress(&self) -> MissionProgress {
        self.progress
    }

    pub fn level(&self) -> &LevelDocument {
        &self.level
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn theme(&self) -> &Arc<dyn Theme> {
        &self.theme
    }

    pub fn interaction_phase(&self) -> &InteractionPhase {
        self.interaction.phase()
    }

    pub fn interaction_progress(&self, now: Timestamp) -> Option<f32> {
        self.interaction.progress(now)
    }

    /// Cell the player is facing.
    pub fn facing_target(&self) -> Position {
        self.state.player.facing.step(self.state.player.position)
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn press(&mut self, direction: CardinalDirection) {
        self.input.press(direction);
    }

    pub fn release(&mut self, direction: CardinalDirection) {
        self.input.release(direction);
    }

    // ------------------------------------------------------------------
    // Tick callbacks
    // ------------------------------------------------------------------

    /// Attempts one move in the most recently pressed held direction,
    /// subject to the movement cooldown.
    pub fn poll_movement(&mut self, now: Timestamp) -> SessionOutcome {
        if self.state.is_terminal() || self.interaction.is_busy() {
            return SessionOutcome::default();
        }
        let Some(direction) = self.input.current() else {
            return SessionOutcome::default();
        };
        if !self.input.ready(now, self.config.move_cooldown_ms) {
            return SessionOutcome::default();
        }

        self.input.mark_attempt(now);
        self.observe(|session, events| session.step(direction, now, events))
    }

    /// Advances the active interaction timer and commits it when complete.
    pub fn poll_interaction(&mut self, now: Timestamp) -> SessionOutcome {
        if self.state.is_terminal() || !self.interaction.is_busy() {
            return SessionOutcome::default();
        }
        // Progress ticks mutate nothing; only a commit is worth a snapshot.
        if let InteractionPhase::InProgress(active) = self.interaction.phase() {
            if !active.finished(now) {
                let (id, progress) = (active.interaction.id.clone(), active.progress(now));
                tracing::trace!(%id, progress, "interaction progress");
                return SessionOutcome {
                    events: vec![SessionEvent::InteractionProgress { id, progress }],
                    delta: SessionDelta::empty(),
                };
            }
        }

        self.observe(|session, events| {
            let theme = Arc::clone(&session.theme);
            let update = session.interaction.update(
                theme.as_ref(),
                &mut session.grid,
                &mut session.state.player,
                now,
            );
            match update {
                InteractionUpdate::Idle => {}
                InteractionUpdate::Progress { id, progress } => {
                    tracing::trace!(%id, progress, "interaction progress");
                    events.push(SessionEvent::InteractionProgress { id, progress });
                }
                InteractionUpdate::Committed {
                    id,
                    message,
                    checkpoint,
                    ..
                } => {
                    events.push(SessionEvent::InteractionCompleted { id, message });
                    if let Some(checkpoint) = checkpoint {
                        session.checkpoint(checkpoint, events);
                    }
                    session.evaluate(now, events);
                }
                InteractionUpdate::Failed { id, message } => {
                    events.push(SessionEvent::InteractionFailed { id, message });
                }
            }
        })
    }

    /// Refreshes the display cache of hazardous cells.
    pub fn recompute_hazard_zones(&mut self) -> SessionOutcome {
        let theme = Arc::clone(&self.theme);
        let mut outcome = SessionOutcome::default();
        if action::recompute_hazard_zones(theme.as_ref(), &self.grid, &mut self.state) {
            outcome.delta.fields.insert(SessionFields::HAZARDS);
        }
        outcome
    }

    /// Applies continuous hazard damage at the player's cell.
    pub fn poll_hazards(&mut self, now: Timestamp) -> SessionOutcome {
        if self.state.is_terminal() {
            return SessionOutcome::default();
        }

        // Polled often and rarely hits, so the delta is built by hand instead
        // of diffing snapshots.
        let theme = Arc::clone(&self.theme);
        let (lives, status) = (self.state.player.lives(), self.state.status());
        let Some(hit) = self.hazards.check(
            theme.as_ref(),
            &self.grid,
            &mut self.state,
            now,
            self.config.hazard_interval_ms,
        ) else {
            return SessionOutcome::default();
        };

        let mut events = vec![SessionEvent::Damaged {
            position: hit.position,
            lives: hit.lives,
            message: hit.message,
        }];
        if hit.failed {
            self.finish(now, &mut events);
        }

        let mut delta = SessionDelta::empty();
        delta.fields.set(SessionFields::LIVES, self.state.player.lives() != lives);
        delta.fields.set(SessionFields::STATUS, self.state.status() != status);
        SessionOutcome { events, delta }
    }

    /// Elapsed play time in milliseconds; frozen once the session ends.
    pub fn elapsed_ms(&self, now: Timestamp) -> u64 {
        self.finished_at.unwrap_or(now).since(self.started_at)
    }

    /// Elapsed play time as `mm:ss`.
    pub fn elapsed_display(&self, now: Timestamp) -> String {
        let seconds = self.elapsed_ms(now) / 1000;
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }

    // ------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------

    /// Asks for the interactions at the facing cell, or on the player
    /// itself when `self_only` is set.
    pub fn request_interaction(&mut self, self_only: bool, now: Timestamp) -> SessionOutcome {
        if self.state.is_terminal() {
            return SessionOutcome::default();
        }
        let target = if self_only {
            self.state.player.position
        } else {
            self.facing_target()
        };
        if !self.grid.contains(target) {
            return SessionOutcome::default();
        }

        let theme = Arc::clone(&self.theme);
        let request = self.interaction.request(
            theme.as_ref(),
            &self.grid,
            &self.state.player,
            target,
            self_only,
            now,
        );
        self.request_outcome(request)
    }

    pub fn select_interaction(&mut self, id: &str, now: Timestamp) -> SessionOutcome {
        if self.state.is_terminal() {
            return SessionOutcome::default();
        }
        let request = self.interaction.select(id, now);
        self.request_outcome(request)
    }

    pub fn dismiss_interaction(&mut self) {
        self.interaction.dismiss();
    }

    /// The interaction input was let go.
    pub fn release_interaction(&mut self, now: Timestamp) -> SessionOutcome {
        let events = self
            .interaction
            .release(now)
            .map(|cancelled| SessionEvent::InteractionCancelled {
                id: cancelled.id,
                message: cancelled.message,
            })
            .into_iter()
            .collect();
        SessionOutcome {
            events,
            delta: SessionDelta::empty(),
        }
    }

    fn request_outcome(&self, request: InteractionRequest) -> SessionOutcome {
        let event = match request {
            InteractionRequest::Choose(choices) => Some(SessionEvent::InteractionChoices { choices }),
            InteractionRequest::Started(interaction) => Some(self.started_event(interaction)),
            InteractionRequest::Unavailable
            | InteractionRequest::Busy
            | InteractionRequest::AwaitingRelease
            | InteractionRequest::UnknownChoice(_) => None,
        };
        SessionOutcome {
            events: event.into_iter().collect(),
            delta: SessionDelta::empty(),
        }
    }

    fn started_event(&self, interaction: Interaction) -> SessionEvent {
        let target = match self.interaction.phase() {
            InteractionPhase::InProgress(active) => active.target,
            _ => self.state.player.position,
        };
        SessionEvent::InteractionStarted {
            id: interaction.id,
            target,
            duration_ms: interaction.duration_ms,
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Puts inventory slot `index` down on the facing cell.
    pub fn place_item(&mut self, index: usize, now: Timestamp) -> SessionOutcome {
        if self.state.is_terminal() {
            return SessionOutcome::default();
        }

        self.observe(|session, events| {
            let target = session.facing_target();
            let theme = Arc::clone(&session.theme);
            let free = session.grid.get(target).is_some_and(|cell| {
                cell.object.is_none()
                    && BasicCatalogue::is_walkable(
                        &cell.floor,
                        theme::tile_def(theme.as_ref(), &cell.floor.tile_type),
                    )
            });
            if !free {
                events.push(SessionEvent::message("There is no room to put that down"));
                return;
            }
            let Some(item) = session.state.player.inventory.remove(index) else {
                return;
            };

            let mut tile = TileRef::new(item.item_type.clone());
            tile.config = item.fields;
            tile.config
                .insert(ITEM_TYPE_KEY.to_owned(), item.item_type.clone().into());
            session.grid.set_object(target, Some(tile));
            tracing::debug!(item = %item.item_type, %target, "item placed");

            events.push(SessionEvent::ItemPlaced {
                position: target,
                item_type: item.item_type,
            });
            session.checkpoint(Checkpoint::ItemPlaced(target), events);
            session.evaluate(now, events);
        })
    }

    /// Takes the item lying on the player's cell, or on the facing cell when
    /// the player stands on nothing to pick up.
    pub fn pick_up(&mut self, now: Timestamp) -> SessionOutcome {
        if self.state.is_terminal() {
            return SessionOutcome::default();
        }

        self.observe(|session, events| {
            let here = session.state.player.position;
            let Some(target) = [here, session.facing_target()]
                .into_iter()
                .find(|&position| session.holds_loose_item(position))
            else {
                return;
            };
            let Some(tile) = session.grid.get(target).and_then(|cell| cell.object.clone()) else {
                return;
            };

            let mut fields = tile.config;
            let item_type = match fields.remove(ITEM_TYPE_KEY) {
                Some(Value::String(item_type)) => item_type,
                _ => tile.tile_type,
            };
            let item = ItemInstance {
                item_type: item_type.clone(),
                fields,
            };
            if let Err(full) = session.state.player.inventory.push(item) {
                tracing::debug!(item = %item_type, capacity = full.capacity, "pickup refused");
                events.push(SessionEvent::message("Your inventory is full"));
                return;
            }

            session.grid.set_object(target, None);
            session.state.player.collect(item_type.clone());
            tracing::debug!(item = %item_type, %target, "item picked up");

            events.push(SessionEvent::ItemPickedUp {
                position: target,
                item_type,
            });
            session.checkpoint(Checkpoint::ItemRemoved(target), events);
            session.evaluate(now, events);
        })
    }

    /// True when the object at `position` is a plain carryable tile: walkable,
    /// of the basic category and not a puzzle gate.
    fn holds_loose_item(&self, position: Position) -> bool {
        let Some(object) = self.grid.get(position).and_then(|cell| cell.object.as_ref()) else {
            return false;
        };
        if object.config_str(ITEM_TYPE_KEY).is_some() {
            return true;
        }
        let def = theme::tile_def(self.theme.as_ref(), &object.tile_type);
        def.category == TileCategory::Basic
            && BasicCatalogue::is_walkable(object, def)
            && ActivationSpec::from_tile(object).is_none()
    }

    // ------------------------------------------------------------------
    // Peers
    // ------------------------------------------------------------------

    /// Records a peer's position and re-evaluates occupancy requirements.
    pub fn update_peer(&mut self, peer: PlayerId, position: Position, now: Timestamp) -> SessionOutcome {
        if peer == self.state.player.id {
            return SessionOutcome::default();
        }

        self.observe(|session, events| {
            if session.state.peers.insert(peer, position) == Some(position) {
                return;
            }
            session.checkpoint(Checkpoint::Remote, events);
            session.evaluate(now, events);
        })
    }

    pub fn remove_peer(&mut self, peer: &PlayerId, now: Timestamp) -> SessionOutcome {
        self.observe(|session, events| {
            if session.state.peers.remove(peer).is_some() {
                session.checkpoint(Checkpoint::Remote, events);
                session.evaluate(now, events);
            }
        })
    }

    /// Applies a cell change made by a peer.
    ///
    /// Gate cells are driven by the local activation engine alone, so updates
    /// addressed to them are ignored.
    pub fn apply_remote_cell(&mut self, position: Position, cell: Cell, now: Timestamp) -> SessionOutcome {
        if self.state.activation.contains_key(&position.tile_key()) {
            tracing::debug!(%position, "ignoring remote update of a gate cell");
            return SessionOutcome::default();
        }

        self.observe(|session, events| {
            if session.grid.get(position) == Some(&cell) || !session.grid.set(position, cell) {
                return;
            }
            session.checkpoint(Checkpoint::Remote, events);
            session.evaluate(now, events);
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Discards all session state and rebuilds it from the level defaults.
    /// Known peers stay connected and keep their positions.
    pub fn restart(&mut self, now: Timestamp) -> SessionOutcome {
        self.observe(|session, events| {
            let peers = std::mem::take(&mut session.state.peers);
            let (grid, mut state) = fresh_state(
                &session.level,
                session.theme.as_ref(),
                &session.config,
                session.state.player.id.clone(),
            );
            state.peers = peers;
            session.grid = grid;
            session.state = state;
            session.interaction.reset();
            session.input.clear();
            session.hazards.reset();
            session.started_at = now;
            session.finished_at = None;
            session.progress = session.evaluate_missions();

            tracing::info!(player = %session.state.player.id, "session restarted");
            events.push(SessionEvent::StatusChanged {
                status: SessionStatus::Playing,
            });
            events.push(SessionEvent::objectives(session.progress));
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn observe<F>(&mut self, callback: F) -> SessionOutcome
    where
        F: FnOnce(&mut Self, &mut Vec<SessionEvent>),
    {
        let before_state = self.state.clone();
        let before_grid = self.grid.clone();
        let mut events = Vec::new();

        callback(self, &mut events);

        let delta = SessionDelta::from_states(&before_state, &before_grid, &self.state, &self.grid);
        SessionOutcome { events, delta }
    }

    fn step(&mut self, direction: CardinalDirection, now: Timestamp, events: &mut Vec<SessionEvent>) {
        let theme = Arc::clone(&self.theme);
        let resolution =
            MoveAction::new(direction).resolve(theme.as_ref(), &mut self.grid, &mut self.state);

        match resolution {
            MoveResolution::Inactive | MoveResolution::OutOfBounds => {}
            MoveResolution::Blocked { target, message } => {
                events.push(SessionEvent::MoveBlocked { target, message });
            }
            MoveResolution::Moved {
                from, to, message, ..
            } => {
                events.push(SessionEvent::Moved { from, to });
                if let Some(text) = message {
                    events.push(SessionEvent::message(text));
                }
                self.arrive_at_exit(to, events);
                self.checkpoint(Checkpoint::PlayerMoved, events);
                self.evaluate(now, events);
            }
            MoveResolution::Hazard {
                target,
                message,
                lives,
                failed,
            } => {
                events.push(SessionEvent::Damaged {
                    position: target,
                    lives,
                    message,
                });
                if failed {
                    self.finish(now, events);
                }
            }
        }
    }

    fn arrive_at_exit(&mut self, to: Position, events: &mut Vec<SessionEvent>) {
        let theme = self.theme.as_ref();
        let on_exit = self
            .grid
            .get(to)
            .is_some_and(|cell| cell.layers().any(|tile| theme::is_exit(theme, tile)));
        if !on_exit || self.state.player.reached_exit {
            return;
        }

        let unlocked = mission::exit_unlocked(&self.missions, &self.state, &self.grid, theme)
            && theme::recover(
                "exit_requirement_met",
                theme.exit_requirement_met(&self.state.player),
            )
            .unwrap_or(false);

        if unlocked {
            self.state.player.reached_exit = true;
            events.push(SessionEvent::ExitReached);
        } else {
            events.push(SessionEvent::ExitLocked);
        }
    }

    fn checkpoint(&mut self, checkpoint: Checkpoint, events: &mut Vec<SessionEvent>) {
        let theme = Arc::clone(&self.theme);
        let changes =
            activation::run_checkpoint(theme.as_ref(), &mut self.grid, &mut self.state, checkpoint);
        events.extend(changes.into_iter().map(|gate| SessionEvent::GateChanged {
            position: gate.position,
            opened: gate.opened,
        }));
    }

    fn evaluate_missions(&self) -> MissionProgress {
        mission::evaluate_all(
            &self.missions,
            &self.state,
            self.level.fixed_order,
            &self.grid,
            self.theme.as_ref(),
        )
    }

    /// Re-evaluates objectives and the win/fail conditions.
    fn evaluate(&mut self, now: Timestamp, events: &mut Vec<SessionEvent>) {
        if self.state.is_terminal() {
            return;
        }
        if !self.state.player.is_alive() && self.state.fail() {
            self.finish(now, events);
            return;
        }

        let progress = self.evaluate_missions();
        if progress != self.progress {
            self.progress = progress;
            events.push(SessionEvent::objectives(progress));
        }
        if progress.all_complete && self.state.win() {
            self.finish(now, events);
        }
    }

    fn finish(&mut self, now: Timestamp, events: &mut Vec<SessionEvent>) {
        self.finished_at = Some(now);
        self.interaction.reset();
        let status = self.state.status();
        tracing::info!(
            %status,
            moves = self.state.moves,
            elapsed_ms = self.elapsed_ms(now),
            "session finished"
        );
        events.push(SessionEvent::StatusChanged { status });
    }
}

fn fresh_state(
    level: &LevelDocument,
    theme: &dyn Theme,
    config: &SessionConfig,
    player_id: PlayerId,
) -> (Grid, SessionState) {
    let mut grid = level.grid.clone();
    let spawn = level.spawn_position();
    let player = PlayerState::new(
        player_id,
        spawn,
        level.lives_or_default(config),
        level.inventory_capacity_or_default(config),
    );
    let mut state = SessionState::new(player);
    state.reveal_around(spawn, &grid);
    activation::initialize(theme, &mut grid, &mut state);
    action::recompute_hazard_zones(theme, &grid, &mut state);
    (grid, state)
}
