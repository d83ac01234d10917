//! Hold-to-perform interactions.
//!
//! An interaction is requested for a target cell, optionally chosen from a
//! menu, then timed while the input stays held. On completion it runs
//! against cloned scratch copies of the grid and player; the copies replace
//! the live ones only when execution succeeds.

use crate::state::{Grid, PlayerState, Position, Timestamp};
use crate::theme::{self, ExecOutcome, Interaction, InteractionScratch, Theme};

use super::Checkpoint;

/// Interaction currently being timed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveInteraction {
    pub interaction: Interaction,
    pub target: Position,
    pub started_at: Timestamp,
}

impl ActiveInteraction {
    /// Progress in `[0, 1]`. Zero-duration interactions are complete at once.
    pub fn progress(&self, now: Timestamp) -> f32 {
        if self.interaction.duration_ms == 0 {
            return 1.0;
        }
        (now.since(self.started_at) as f32 / self.interaction.duration_ms as f32).min(1.0)
    }

    pub fn finished(&self, now: Timestamp) -> bool {
        now.since(self.started_at) >= self.interaction.duration_ms
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InteractionPhase {
    #[default]
    Idle,
    /// Several interactions apply; waiting for the player to pick one.
    Choosing {
        target: Position,
        choices: Vec<Interaction>,
    },
    InProgress(ActiveInteraction),
}

/// Result of requesting or selecting an interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionRequest {
    /// Nothing to do at the target.
    Unavailable,
    /// A choice menu is now open.
    Choose(Vec<Interaction>),
    Started(Interaction),
    /// Another interaction is already in progress.
    Busy,
    /// The same interaction just finished; release the input first.
    AwaitingRelease,
    /// The selected id is not on the open menu.
    UnknownChoice(String),
}

/// Result of polling the active interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionUpdate {
    Idle,
    Progress { id: String, progress: f32 },
    Committed {
        id: String,
        target: Position,
        message: Option<String>,
        checkpoint: Option<Checkpoint>,
    },
    Failed { id: String, message: Option<String> },
}

/// An interaction was aborted before completing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cancelled {
    pub id: String,
    pub message: String,
}

pub const CANCELLED_MESSAGE: &str = "Interaction cancelled";

#[derive(Clone, Debug, Default)]
pub struct InteractionEngine {
    phase: InteractionPhase,
    /// Id of the last committed interaction until its input is released.
    awaiting_release: Option<String>,
}

impl InteractionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &InteractionPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, InteractionPhase::InProgress(_))
    }

    pub fn progress(&self, now: Timestamp) -> Option<f32> {
        match &self.phase {
            InteractionPhase::InProgress(active) => Some(active.progress(now)),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.phase = InteractionPhase::Idle;
        self.awaiting_release = None;
    }

    /// Asks the theme what can be done at `target` and starts or offers it.
    pub fn request(
        &mut self,
        theme: &dyn Theme,
        grid: &Grid,
        player: &PlayerState,
        target: Position,
        self_only: bool,
        now: Timestamp,
    ) -> InteractionRequest {
        if self.is_busy() {
            return InteractionRequest::Busy;
        }

        let mut choices = theme::recover(
            "available_interactions",
            theme.available_interactions(player, grid, target, self_only),
        )
        .unwrap_or_default();

        match choices.len() {
            0 => {
                self.phase = InteractionPhase::Idle;
                InteractionRequest::Unavailable
            }
            1 => {
                let interaction = choices.remove(0);
                self.begin(interaction, target, now)
            }
            _ => {
                self.phase = InteractionPhase::Choosing {
                    target,
                    choices: choices.clone(),
                };
                InteractionRequest::Choose(choices)
            }
        }
    }

    /// Picks an entry from the open choice menu and starts timing it.
    pub fn select(&mut self, id: &str, now: Timestamp) -> InteractionRequest {
        let InteractionPhase::Choosing { target, choices } = &self.phase else {
            return InteractionRequest::UnknownChoice(id.to_owned());
        };
        let target = *target;
        let Some(choice) = choices.iter().find(|choice| choice.id == id).cloned() else {
            return InteractionRequest::UnknownChoice(id.to_owned());
        };
        self.begin(choice, target, now)
    }

    /// Closes the choice menu without starting anything.
    pub fn dismiss(&mut self) {
        if matches!(self.phase, InteractionPhase::Choosing { .. }) {
            self.phase = InteractionPhase::Idle;
        }
    }

    pub fn begin(&mut self, interaction: Interaction, target: Position, now: Timestamp) -> InteractionRequest {
        if self.is_busy() {
            return InteractionRequest::Busy;
        }
        if self.awaiting_release.as_deref() == Some(interaction.id.as_str()) {
            return InteractionRequest::AwaitingRelease;
        }

        tracing::debug!(id = %interaction.id, %target, duration_ms = interaction.duration_ms, "interaction started");
        self.phase = InteractionPhase::InProgress(ActiveInteraction {
            interaction: interaction.clone(),
            target,
            started_at: now,
        });
        InteractionRequest::Started(interaction)
    }

    /// Advances the active timer and commits when it completes.
    pub fn update(
        &mut self,
        theme: &dyn Theme,
        grid: &mut Grid,
        player: &mut PlayerState,
        now: Timestamp,
    ) -> InteractionUpdate {
        let InteractionPhase::InProgress(active) = &self.phase else {
            return InteractionUpdate::Idle;
        };
        if !active.finished(now) {
            return InteractionUpdate::Progress {
                id: active.interaction.id.clone(),
                progress: active.progress(now),
            };
        }

        let active = active.clone();
        self.phase = InteractionPhase::Idle;
        self.awaiting_release = Some(active.interaction.id.clone());
        let id = active.interaction.id;

        let mut scratch = InteractionScratch {
            grid: grid.clone(),
            player: player.clone(),
        };
        let outcome = theme::recover(
            "execute_interaction",
            theme.execute_interaction(&id, &mut scratch, active.target),
        );

        match outcome {
            Some(ExecOutcome {
                success: true,
                message,
                checkpoint,
            }) => {
                *grid = scratch.grid;
                *player = scratch.player;
                tracing::info!(%id, target = %active.target, "interaction committed");
                InteractionUpdate::Committed {
                    id,
                    target: active.target,
                    message,
                    checkpoint,
                }
            }
            Some(ExecOutcome { message, .. }) => InteractionUpdate::Failed { id, message },
            None => InteractionUpdate::Failed { id, message: None },
        }
    }

    /// The triggering input was released. Cancels an unfinished interaction.
    pub fn release(&mut self, now: Timestamp) -> Option<Cancelled> {
        self.awaiting_release = None;
        let InteractionPhase::InProgress(active) = &self.phase else {
            return None;
        };
        if active.finished(now) {
            return None;
        }

        let id = active.interaction.id.clone();
        self.phase = InteractionPhase::Idle;
        tracing::debug!(%id, "interaction cancelled");
        Some(Cancelled {
            id,
            message: CANCELLED_MESSAGE.to_owned(),
        })
    }
}
