//! Gate activation specs as stored in tile config.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{Position, TileRef};

/// Config key holding a gate's activation spec.
pub const ACTIVATION_KEY: &str = "activationRequirements";

/// Requirement token meaning "any participant stands here".
pub const PLAYER_OCCUPANCY: &str = "player";

/// Desired gate state once a step is satisfied.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateDirection {
    #[default]
    Open,
    Close,
}

impl GateDirection {
    pub const fn opens(self) -> bool {
        matches!(self, GateDirection::Open)
    }

    /// True when a gate already in state `is_open` needs no change.
    pub const fn matches(self, is_open: bool) -> bool {
        self.opens() == is_open
    }
}

/// What must be present at a requirement's cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequirementTarget {
    /// A participant stands on the cell.
    Occupancy,
    /// The cell's item layer represents this item id.
    Item(String),
}

impl From<String> for RequirementTarget {
    fn from(value: String) -> Self {
        if value == PLAYER_OCCUPANCY {
            RequirementTarget::Occupancy
        } else {
            RequirementTarget::Item(value)
        }
    }
}

impl From<RequirementTarget> for String {
    fn from(target: RequirementTarget) -> Self {
        match target {
            RequirementTarget::Occupancy => PLAYER_OCCUPANCY.to_owned(),
            RequirementTarget::Item(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub x: i32,
    pub y: i32,
    pub item_id: RequirementTarget,
}

impl Requirement {
    pub fn item(position: Position, item_id: impl Into<String>) -> Self {
        Self {
            x: position.x,
            y: position.y,
            item_id: RequirementTarget::Item(item_id.into()),
        }
    }

    pub fn occupancy(position: Position) -> Self {
        Self {
            x: position.x,
            y: position.y,
            item_id: RequirementTarget::Occupancy,
        }
    }

    pub const fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

const fn enabled_by_default() -> bool {
    true
}

/// One open-or-close objective in a gate's sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionStep {
    #[serde(default)]
    pub direction: GateDirection,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub order_matters: bool,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl ConditionStep {
    pub fn new(direction: GateDirection, requirements: Vec<Requirement>) -> Self {
        Self {
            direction,
            enabled: true,
            order_matters: false,
            requirements,
        }
    }

    #[must_use]
    pub fn ordered(mut self) -> Self {
        self.order_matters = true;
        self
    }
}

/// Normalized activation spec of one gate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationSpec {
    #[serde(default)]
    pub start_open: bool,
    #[serde(default)]
    pub condition_sequence: Vec<ConditionStep>,
}

/// Shapes accepted in level data.
#[derive(Deserialize)]
#[serde(untagged)]
enum ActivationRepr {
    Sequence {
        #[serde(default, rename = "startOpen")]
        start_open: bool,
        #[serde(rename = "conditionSequence")]
        condition_sequence: Vec<ConditionStep>,
    },
    /// Older levels: a single flat requirement list.
    Flat {
        #[serde(default, rename = "startOpen")]
        start_open: bool,
        #[serde(default, rename = "orderMatters")]
        order_matters: bool,
        #[serde(default)]
        direction: GateDirection,
        requirements: Vec<Requirement>,
    },
    /// Bare array of requirements.
    List(Vec<Requirement>),
}

impl From<ActivationRepr> for ActivationSpec {
    fn from(repr: ActivationRepr) -> Self {
        match repr {
            ActivationRepr::Sequence {
                start_open,
                condition_sequence,
            } => Self {
                start_open,
                condition_sequence,
            },
            ActivationRepr::Flat {
                start_open,
                order_matters,
                direction,
                requirements,
            } => Self {
                start_open,
                condition_sequence: vec![ConditionStep {
                    direction,
                    enabled: true,
                    order_matters,
                    requirements,
                }],
            },
            ActivationRepr::List(requirements) => Self {
                start_open: false,
                condition_sequence: vec![ConditionStep::new(GateDirection::Open, requirements)],
            },
        }
    }
}

impl ActivationSpec {
    pub fn new(start_open: bool, condition_sequence: Vec<ConditionStep>) -> Self {
        Self {
            start_open,
            condition_sequence,
        }
    }

    /// Parses any accepted shape. Unrecognized data yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match ActivationRepr::deserialize(value) {
            Ok(repr) => Some(repr.into()),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed activation spec");
                None
            }
        }
    }

    /// Reads the spec attached to a tile, if any.
    pub fn from_tile(tile: &TileRef) -> Option<Self> {
        tile.config_value(ACTIVATION_KEY).and_then(Self::from_value)
    }

    pub fn step(&self, index: usize) -> Option<&ConditionStep> {
        self.condition_sequence.get(index)
    }

    /// Number of leading open steps skipped by a gate that starts open.
    pub fn leading_open_steps(&self) -> usize {
        self.condition_sequence
            .iter()
            .take_while(|step| step.direction.opens())
            .count()
    }
}
