use serde::{Deserialize, Serialize};

/// How continuous-hazard cooldowns are keyed.
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
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HazardCooldownScope {
    /// Each hazard cell keeps its own "last damage" timestamp.
    #[default]
    PerTile,
    /// One timestamp shared by every continuous hazard.
    Shared,
}

/// Session rule constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum time between two evaluated movement attempts.
    pub move_cooldown_ms: u64,
    /// Period of the continuous-hazard damage check.
    pub hazard_tick_ms: u64,
    /// Damage interval used when the theme does not supply one.
    pub hazard_interval_ms: u64,
    pub hazard_cooldown_scope: HazardCooldownScope,
    /// Lives used when the level does not declare them.
    pub default_lives: u32,
    /// Inventory capacity used when the level does not declare it.
    pub default_inventory_capacity: usize,
}

impl SessionConfig {
    pub const DEFAULT_MOVE_COOLDOWN_MS: u64 = 150;
    pub const DEFAULT_HAZARD_TICK_MS: u64 = 500;
    pub const DEFAULT_HAZARD_INTERVAL_MS: u64 = 5000;
    pub const DEFAULT_LIVES: u32 = 3;
    pub const DEFAULT_INVENTORY_CAPACITY: usize = 5;

    pub fn new() -> Self {
        Self {
            move_cooldown_ms: Self::DEFAULT_MOVE_COOLDOWN_MS,
            hazard_tick_ms: Self::DEFAULT_HAZARD_TICK_MS,
            hazard_interval_ms: Self::DEFAULT_HAZARD_INTERVAL_MS,
            hazard_cooldown_scope: HazardCooldownScope::default(),
            default_lives: Self::DEFAULT_LIVES,
            default_inventory_capacity: Self::DEFAULT_INVENTORY_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_move_cooldown_ms(mut self, millis: u64) -> Self {
        self.move_cooldown_ms = millis;
        self
    }

    #[must_use]
    pub fn with_hazard_interval_ms(mut self, millis: u64) -> Self {
        self.hazard_interval_ms = millis;
        self
    }

    #[must_use]
    pub fn with_hazard_cooldown_scope(mut self, scope: HazardCooldownScope) -> Self {
        self.hazard_cooldown_scope = scope;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
