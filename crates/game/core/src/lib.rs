//! Deterministic escape-room session rules.
//!
//! `escape-core` holds the grid/tile model, the theme capability interface
//! and the resolvers that drive one play-through: movement and hazards,
//! missions, timed interactions and multi-step puzzle gates. All mutation of
//! a running session flows through [`engine::Session`]; the runtime only
//! schedules its callbacks. Nothing in this crate reads a clock or performs
//! I/O.
pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod level;
pub mod mission;
pub mod state;
pub mod theme;

pub use action::{
    Checkpoint, GateEvent, HazardHit, HazardTracker, InteractionEngine, InteractionPhase,
    InteractionRequest, InteractionUpdate, MoveAction, MoveResolution,
};
pub use action::activation::{
    ActivationSpec, ConditionStep, GateDirection, PLAYER_OCCUPANCY, Requirement,
    RequirementTarget,
};
pub use config::{HazardCooldownScope, SessionConfig};
pub use engine::{InputTracker, Session, SessionEvent, SessionOutcome};
pub use error::{ErrorSeverity, GameError, SessionError, ThemeError};
pub use level::LevelDocument;
pub use mission::{Mission, MissionKind, MissionProgress};
pub use state::{
    CardinalDirection, Cell, GateProgress, Grid, GridDimensions, GridError, InventoryState,
    ItemInstance, PlayerId, PlayerState, Position, SessionDelta, SessionFields, SessionState,
    SessionStatus, TileRef, Timestamp,
};
pub use theme::{
    BasicCatalogue, BasicTheme, ExecOutcome, GateBehavior, HazardDescriptor, Interaction,
    InteractionScratch, MoveContext, MoveRule, Theme, TileCategory, TileTypeDef,
};
