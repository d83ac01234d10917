//! Puzzle-gate state machine.
//!
//! Gates carry an [`ActivationSpec`] in their tile config. Each gate keeps a
//! cursor into its condition sequence in [`SessionState::activation`]; the
//! cursor never moves backwards and a gate whose cursor ran past the end is
//! inert for the rest of the session.
//!
//! [`SessionState::activation`]: crate::state::SessionState::activation
mod engine;
mod spec;

pub use engine::{Checkpoint, GateEvent, initialize, run_checkpoint};
pub use spec::{
    ACTIVATION_KEY, ActivationSpec, ConditionStep, GateDirection, PLAYER_OCCUPANCY, Requirement,
    RequirementTarget,
};
