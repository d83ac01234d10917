//! Session worker that owns the authoritative [`Session`].
//!
//! One tokio task runs every session callback to completion, in a fixed
//! order: movement, interaction, hazard zones, hazard damage, clock. Commands
//! from [`RuntimeHandle`](crate::RuntimeHandle) and inbound network messages
//! are interleaved between ticks, never inside one.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use escape_core::{
    CardinalDirection, Session, SessionEvent, SessionOutcome, SessionStatus, Timestamp,
};
use escape_net::{ConnectionState, InboundMessage, NetClient, RosterMessage};

use crate::config::TickRates;
use crate::events::{ClockEvent, Event, EventBus, NetworkEvent};
use crate::handle::SessionSnapshot;
use crate::repository::{ScoreEntry, ScoreRepository};
use crate::sync::{self, GameMessage};

/// Commands that can be sent to the session worker
pub(crate) enum Command {
    Press(CardinalDirection),
    Release(CardinalDirection),
    Interact { self_only: bool },
    SelectInteraction(String),
    DismissInteraction,
    ReleaseInteraction,
    PlaceItem(usize),
    PickUp,
    Restart,
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
    Shutdown,
}

/// Where an outcome came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Local,
    Remote,
}

pub(crate) struct SessionWorker {
    session: Session,
    level_id: String,
    clock: Instant,
    command_rx: mpsc::Receiver<Command>,
    inbound_rx: Option<mpsc::UnboundedReceiver<InboundMessage>>,
    net: Option<NetClient>,
    net_state: Option<watch::Receiver<ConnectionState>>,
    event_bus: EventBus,
    scores: Option<Arc<dyn ScoreRepository>>,
    ticks: TickRates,
    last_clock: Option<String>,
}

impl SessionWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session: Session,
        level_id: String,
        clock: Instant,
        command_rx: mpsc::Receiver<Command>,
        inbound_rx: Option<mpsc::UnboundedReceiver<InboundMessage>>,
        net: Option<NetClient>,
        event_bus: EventBus,
        scores: Option<Arc<dyn ScoreRepository>>,
        ticks: TickRates,
    ) -> Self {
        info!(
            "SessionWorker initialized for level '{}' as {}",
            level_id,
            session.player_id()
        );
        let net_state = net.as_ref().map(NetClient::watch_state);

        Self {
            session,
            level_id,
            clock,
            command_rx,
            inbound_rx,
            net,
            net_state,
            event_bus,
            scores,
            ticks,
            last_clock: None,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_millis(u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX))
    }

    /// Main worker loop.
    pub(crate) async fn run(mut self) {
        let mut movement = ticker(self.ticks.movement);
        let mut interaction = ticker(self.ticks.interaction);
        let mut hazard_zones = ticker(self.ticks.hazard_zones);
        let mut hazards = ticker(self.ticks.hazard_period(self.session.config()));
        let mut clock = ticker(self.ticks.clock);

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                _ = movement.tick() => {
                    let now = self.now();
                    let outcome = self.session.poll_movement(now);
                    self.dispatch(outcome, Origin::Local).await;
                }
                _ = interaction.tick() => {
                    let now = self.now();
                    let outcome = self.session.poll_interaction(now);
                    self.dispatch(outcome, Origin::Local).await;
                }
                _ = hazard_zones.tick() => {
                    let outcome = self.session.recompute_hazard_zones();
                    self.dispatch(outcome, Origin::Local).await;
                }
                _ = hazards.tick() => {
                    let now = self.now();
                    let outcome = self.session.poll_hazards(now);
                    self.dispatch(outcome, Origin::Local).await;
                }
                _ = clock.tick() => self.publish_clock(),
                Some(message) = next_inbound(&mut self.inbound_rx) => {
                    self.handle_inbound(message).await;
                }
                Some(state) = next_state(&mut self.net_state) => {
                    self.handle_connection(state).await;
                }
            }
        }

        debug!("SessionWorker stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        let now = self.now();
        let outcome = match cmd {
            Command::Press(direction) => {
                self.session.press(direction);
                return;
            }
            Command::Release(direction) => {
                self.session.release(direction);
                return;
            }
            Command::Interact { self_only } => self.session.request_interaction(self_only, now),
            Command::SelectInteraction(id) => self.session.select_interaction(&id, now),
            Command::DismissInteraction => {
                self.session.dismiss_interaction();
                return;
            }
            Command::ReleaseInteraction => self.session.release_interaction(now),
            Command::PlaceItem(index) => self.session.place_item(index, now),
            Command::PickUp => self.session.pick_up(now),
            Command::Restart => {
                self.last_clock = None;
                self.session.restart(now)
            }
            Command::Snapshot { reply } => {
                if reply.send(self.snapshot(now)).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
                return;
            }
            Command::Shutdown => return,
        };
        self.dispatch(outcome, Origin::Local).await;
    }

    fn snapshot(&self, now: Timestamp) -> SessionSnapshot {
        SessionSnapshot {
            grid: self.session.grid().clone(),
            state: self.session.state().clone(),
            status: self.session.status(),
            missions: self.session.mission_progress(),
            elapsed_ms: self.session.elapsed_ms(now),
        }
    }

    async fn handle_inbound(&mut self, message: InboundMessage) {
        let is_roster = RosterMessage::KINDS.contains(&message.kind());

        let now = self.now();
        if let Some(outcome) = sync::apply_inbound(&mut self.session, &message, now) {
            self.dispatch(outcome, Origin::Remote).await;
        }

        if !is_roster {
            return;
        }
        if let Some(net) = &self.net {
            let peers = net.roster().await.ids().map(str::to_owned).collect();
            self.event_bus
                .publish(Event::Network(NetworkEvent::RosterChanged { peers }));
        }
    }

    async fn handle_connection(&mut self, state: ConnectionState) {
        self.event_bus
            .publish(Event::Network(NetworkEvent::ConnectionChanged(state)));

        // Peers learn where we are as soon as we (re)join.
        if state == ConnectionState::Joined {
            self.broadcast(&[GameMessage::position_of(&self.session)]).await;
        }
    }

    /// Publishes an outcome and, for local ones, mirrors it to the room.
    async fn dispatch(&mut self, outcome: SessionOutcome, origin: Origin) {
        if outcome.is_empty() {
            return;
        }

        let won = outcome.events.iter().any(|event| {
            matches!(
                event,
                SessionEvent::StatusChanged {
                    status: SessionStatus::Won
                }
            )
        });

        if origin == Origin::Local {
            let messages = sync::outbound(&self.session, &outcome);
            self.broadcast(&messages).await;
        }

        for event in outcome.events {
            self.event_bus.publish(Event::Session(event));
        }
        if !outcome.delta.is_empty() {
            self.event_bus.publish(Event::Changed(outcome.delta));
        }

        if won {
            self.publish_clock();
            self.submit_score().await;
        }
    }

    async fn broadcast(&self, messages: &[GameMessage]) {
        let Some(net) = &self.net else {
            return;
        };
        for message in messages {
            net.send(message).await;
        }
    }

    fn publish_clock(&mut self) {
        let now = self.now();
        let display = self.session.elapsed_display(now);
        if self.last_clock.as_deref() == Some(display.as_str()) {
            return;
        }
        self.last_clock = Some(display.clone());
        self.event_bus.publish(Event::Clock(ClockEvent {
            elapsed_ms: self.session.elapsed_ms(now),
            display,
        }));
    }

    async fn submit_score(&self) {
        let Some(scores) = &self.scores else {
            return;
        };
        let entry = ScoreEntry {
            level_id: self.level_id.clone(),
            player_id: self.session.player_id().to_string(),
            time_ms: self.session.elapsed_ms(self.now()),
            moves: self.session.state().moves,
        };
        match scores.submit(&entry).await {
            Ok(improved) if !improved.is_empty() => {
                info!("New personal best on '{}': {:?}", self.level_id, improved);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to submit score: {}", e),
        }
    }
}

fn ticker(period: std::time::Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn next_inbound(
    rx: &mut Option<mpsc::UnboundedReceiver<InboundMessage>>,
) -> Option<InboundMessage> {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    let message = inner.recv().await;
    if message.is_none() {
        *rx = None;
    }
    message
}

async fn next_state(
    rx: &mut Option<watch::Receiver<ConnectionState>>,
) -> Option<ConnectionState> {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    if inner.changed().await.is_err() {
        *rx = None;
        return None;
    }
    let state = *inner.borrow_and_update();
    Some(state)
}
