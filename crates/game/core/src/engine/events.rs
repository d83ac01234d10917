use serde::{Deserialize, Serialize};

use crate::mission::MissionProgress;
use crate::state::{Position, SessionDelta, SessionStatus};
use crate::theme::Interaction;

/// Something a session callback wants the presentation layer to know.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Moved {
        from: Position,
        to: Position,
    },
    MoveBlocked {
        target: Position,
        message: Option<String>,
    },
    Damaged {
        position: Position,
        lives: u32,
        message: Option<String>,
    },
    InteractionChoices {
        choices: Vec<Interaction>,
    },
    InteractionStarted {
        id: String,
        target: Position,
        duration_ms: u64,
    },
    InteractionProgress {
        id: String,
        progress: f32,
    },
    InteractionCompleted {
        id: String,
        message: Option<String>,
    },
    InteractionFailed {
        id: String,
        message: Option<String>,
    },
    InteractionCancelled {
        id: String,
        message: String,
    },
    ItemPlaced {
        position: Position,
        item_type: String,
    },
    ItemPickedUp {
        position: Position,
        item_type: String,
    },
    GateChanged {
        position: Position,
        opened: bool,
    },
    /// Stepped on the exit before every other mission was complete.
    ExitLocked,
    ExitReached,
    ObjectivesChanged {
        all_complete: bool,
        current_index: Option<usize>,
    },
    StatusChanged {
        status: SessionStatus,
    },
    /// Informational text with no rule effect.
    Message {
        text: String,
    },
}

impl SessionEvent {
    pub fn message(text: impl Into<String>) -> Self {
        SessionEvent::Message { text: text.into() }
    }

    pub(crate) fn objectives(progress: MissionProgress) -> Self {
        SessionEvent::ObjectivesChanged {
            all_complete: progress.all_complete,
            current_index: progress.current_index,
        }
    }
}

/// Complete outcome of one session callback.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionOutcome {
    pub events: Vec<SessionEvent>,
    /// Which parts of the session changed.
    pub delta: SessionDelta,
}

impl SessionOutcome {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.delta.is_empty()
    }

    pub fn merge(&mut self, other: SessionOutcome) {
        self.events.extend(other.events);
        self.delta.merge(other.delta);
    }
}
