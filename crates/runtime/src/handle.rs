//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! feeding input into the session or streaming events from specific topics.
use tokio::sync::{broadcast, mpsc, oneshot};

use escape_core::{CardinalDirection, Grid, MissionProgress, SessionState, SessionStatus};

use crate::error::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::worker::Command;

/// Read-only copy of the session at one instant.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub grid: Grid,
    pub state: SessionState,
    pub status: SessionStatus,
    pub missions: MissionProgress,
    pub elapsed_ms: u64,
}

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    /// A direction key went down.
    pub async fn press(&self, direction: CardinalDirection) -> Result<()> {
        self.send(Command::Press(direction)).await
    }

    /// A direction key went up.
    pub async fn release(&self, direction: CardinalDirection) -> Result<()> {
        self.send(Command::Release(direction)).await
    }

    /// Interact with the faced tile, or with the player itself when `self_only`.
    pub async fn interact(&self, self_only: bool) -> Result<()> {
        self.send(Command::Interact { self_only }).await
    }

    /// Pick one of the offered interaction choices.
    pub async fn select_interaction(&self, id: impl Into<String>) -> Result<()> {
        self.send(Command::SelectInteraction(id.into())).await
    }

    pub async fn dismiss_interaction(&self) -> Result<()> {
        self.send(Command::DismissInteraction).await
    }

    /// The interact input was released.
    pub async fn release_interaction(&self) -> Result<()> {
        self.send(Command::ReleaseInteraction).await
    }

    /// Drop the inventory item at `index` onto the faced tile.
    pub async fn place_item(&self, index: usize) -> Result<()> {
        self.send(Command::PlaceItem(index)).await
    }

    /// Pick up the item underfoot or on the faced tile.
    pub async fn pick_up(&self) -> Result<()> {
        self.send(Command::PickUp).await
    }

    pub async fn restart(&self) -> Result<()> {
        self.send(Command::Restart).await
    }

    /// Query the current session (read-only snapshot)
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Session` - Rule events and state deltas
    /// - `Topic::Clock` - Elapsed time display
    /// - `Topic::Network` - Connection and roster changes
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}
