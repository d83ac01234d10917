//! Rule resolvers.
//!
//! Each resolver takes the theme, the grid and the session state explicitly
//! and mutates them in place; none of them keep references between calls.
//!
//! - `movement`: bounds, walkability, theme rewrites and instant hazards
//! - `hazard`: continuous hazard damage with per-tile or shared cooldowns
//! - `interact`: timed, hold-to-perform theme interactions
//! - `activation`: multi-step puzzle gates
pub mod activation;
pub mod hazard;
pub mod interact;
pub mod movement;

pub use activation::{Checkpoint, GateEvent};
pub use hazard::{HazardHit, HazardTracker, recompute_hazard_zones};
pub use interact::{
    ActiveInteraction, CANCELLED_MESSAGE, Cancelled, InteractionEngine, InteractionPhase,
    InteractionRequest, InteractionUpdate,
};
pub use movement::{LOCATION_ID_KEY, MoveAction, MoveResolution};
