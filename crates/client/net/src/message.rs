//! Wire messages.
//!
//! Every frame is a JSON object carrying a string `type`. Only the control
//! messages (`join`) and the roster broadcasts are understood here; anything
//! else is forwarded untouched.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;

/// One parsed inbound frame, kept verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    kind: String,
    body: Value,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let body: Value = serde_json::from_str(text)?;
        Self::from_value(body)
    }

    pub fn from_value(body: Value) -> Result<Self, FrameError> {
        let object = body.as_object().ok_or(FrameError::NotAnObject)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingType)?
            .to_owned();
        Ok(Self { kind, body })
    }

    /// Value of the `type` field.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The whole frame, `type` included.
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// Decodes the frame into a typed message.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        T::deserialize(&self.body).map_err(|source| FrameError::Payload {
            kind: self.kind.clone(),
            source,
        })
    }
}

/// Messages the client itself sends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlMessage {
    Join { room_id: String, player_id: String },
}

/// Roster broadcasts interpreted locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RosterMessage {
    /// Full snapshot of the room.
    RoomState { players: Vec<RosterEntry> },
    PlayerJoined { player_id: String },
    PlayerLeft { player_id: String },
}

impl RosterMessage {
    pub const KINDS: [&'static str; 3] = ["room_state", "player_joined", "player_left"];

    /// Interprets `message` if it is a roster broadcast.
    ///
    /// Returns `None` for every other kind, and an error when a roster kind
    /// carries a payload that does not decode.
    pub fn interpret(message: &InboundMessage) -> Option<Result<Self, FrameError>> {
        Self::KINDS
            .contains(&message.kind())
            .then(|| message.decode())
    }
}

/// Participant listed in a `room_state` snapshot, either a bare id or an
/// object carrying one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RosterEntry {
    Id(String),
    Player {
        #[serde(rename = "playerId", alias = "id")]
        player_id: String,
    },
}

impl RosterEntry {
    pub fn id(&self) -> &str {
        match self {
            RosterEntry::Id(id) => id,
            RosterEntry::Player { player_id } => player_id,
        }
    }
}
