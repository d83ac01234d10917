//! Multiplayer glue between a [`Session`] and the network client.
//!
//! Only changes caused by the local participant are broadcast. Gate cells are
//! never part of that: every participant opens and closes gates through its
//! own activation engine, from the same rules and the same inputs. Changes
//! that follow from remote input are never echoed back.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use escape_core::{
    Cell, PlayerId, Position, Session, SessionEvent, SessionFields, SessionOutcome, Timestamp,
};
use escape_net::{InboundMessage, RosterMessage};
use tracing::{debug, warn};

/// Gameplay messages exchanged between participants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum GameMessage {
    PlayerPosition {
        player_id: PlayerId,
        x: i32,
        y: i32,
    },
    CellUpdate {
        player_id: PlayerId,
        x: i32,
        y: i32,
        cell: Cell,
    },
}

impl GameMessage {
    pub const KINDS: [&'static str; 2] = ["player_position", "cell_update"];

    pub fn position_of(session: &Session) -> Self {
        let position = session.player().position;
        GameMessage::PlayerPosition {
            player_id: session.player_id().clone(),
            x: position.x,
            y: position.y,
        }
    }
}

/// Messages announcing what a local callback changed.
///
/// Cells rewritten by gate activation are left out.
pub fn outbound(session: &Session, outcome: &SessionOutcome) -> Vec<GameMessage> {
    let mut messages = Vec::new();
    let delta = &outcome.delta;

    if delta.fields.contains(SessionFields::POSITION) {
        messages.push(GameMessage::position_of(session));
    }

    let gates: BTreeSet<Position> = outcome
        .events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::GateChanged { position, .. } => Some(*position),
            _ => None,
        })
        .collect();
    for &position in delta.cells.difference(&gates) {
        if let Some(cell) = session.grid().get(position) {
            messages.push(GameMessage::CellUpdate {
                player_id: session.player_id().clone(),
                x: position.x,
                y: position.y,
                cell: cell.clone(),
            });
        }
    }

    messages
}

/// Applies one inbound message to the session.
///
/// Returns `None` when the message has no gameplay meaning here.
pub fn apply_inbound(
    session: &mut Session,
    message: &InboundMessage,
    now: Timestamp,
) -> Option<SessionOutcome> {
    if let Some(roster) = RosterMessage::interpret(message) {
        return roster.ok().map(|roster| apply_roster(session, &roster, now));
    }
    if !GameMessage::KINDS.contains(&message.kind()) {
        debug!("Ignoring message of kind '{}'", message.kind());
        return None;
    }

    let game = match message.decode::<GameMessage>() {
        Ok(game) => game,
        Err(e) => {
            warn!("Dropping malformed gameplay message: {}", e);
            return None;
        }
    };

    match game {
        GameMessage::PlayerPosition { player_id, x, y } => {
            Some(session.update_peer(player_id, Position::new(x, y), now))
        }
        GameMessage::CellUpdate {
            player_id,
            x,
            y,
            cell,
        } => {
            if &player_id == session.player_id() {
                return None;
            }
            Some(session.apply_remote_cell(Position::new(x, y), cell, now))
        }
    }
}

/// Drops peers the room no longer lists.
fn apply_roster(session: &mut Session, roster: &RosterMessage, now: Timestamp) -> SessionOutcome {
    let gone: Vec<PlayerId> = match roster {
        RosterMessage::RoomState { players } => session
            .state()
            .peers
            .keys()
            .filter(|peer| !players.iter().any(|entry| entry.id() == peer.as_str()))
            .cloned()
            .collect(),
        RosterMessage::PlayerLeft { player_id } => vec![PlayerId::new(player_id.as_str())],
        RosterMessage::PlayerJoined { .. } => Vec::new(),
    };

    let mut outcome = SessionOutcome::default();
    for peer in gone {
        outcome.merge(session.remove_peer(&peer, now));
    }
    outcome
}
