//! Runtime configuration structures and loaders.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use escape_core::SessionConfig;
use escape_net::NetConfig;

/// Configuration required to run one session.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub session_id: Option<String>,
    /// Directory holding `session.toml` and `levels/`.
    pub data_dir: PathBuf,
    pub level_id: String,
    pub player_id: String,
    pub ticks: TickRates,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    /// Mirror logs to stderr in addition to the session log file.
    pub log_to_stderr: bool,
    /// Present when the session should join a networked room.
    pub net: Option<NetConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            data_dir: PathBuf::from("data"),
            level_id: "cellar".to_owned(),
            player_id: "player-1".to_owned(),
            ticks: TickRates::default(),
            command_buffer_size: 32,
            event_buffer_size: 256,
            log_to_stderr: false,
            net: None,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `GAME_SESSION_ID` - Session identifier for log files (default: auto-generated)
    /// - `ESCAPE_DATA_DIR` - Content directory (default: `data`)
    /// - `ESCAPE_LEVEL` - Level id to load (default: `cellar`)
    /// - `PLAYER_ID` - Local participant id (default: `player-1`)
    /// - `MOVEMENT_TICK_MS`, `INTERACTION_TICK_MS`, `HAZARD_ZONE_TICK_MS`,
    ///   `HAZARD_TICK_MS`, `CLOCK_TICK_MS` - Scheduler periods (`HAZARD_TICK_MS`
    ///   overrides `hazard_tick_ms` from `session.toml`)
    /// - `RUNTIME_COMMAND_BUFFER`, `RUNTIME_EVENT_BUFFER` - Channel capacities
    /// - `LOG_STDERR` - Also log to stderr (default: false)
    /// - `RELAY_URL`, `ROOM_ID` - Enable networking when both are set
    /// - `RECONNECT_DELAY_MS` - Fixed reconnect delay (default: 3000)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.session_id = env::var("GAME_SESSION_ID").ok();
        if let Ok(dir) = env::var("ESCAPE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(level) = env::var("ESCAPE_LEVEL") {
            config.level_id = level;
        }
        if let Ok(player) = env::var("PLAYER_ID") {
            config.player_id = player;
        }

        config.ticks = TickRates::from_env();

        if let Some(capacity) = read_env::<usize>("RUNTIME_COMMAND_BUFFER") {
            config.command_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("RUNTIME_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        if let Some(enable) = read_env::<bool>("LOG_STDERR") {
            config.log_to_stderr = enable;
        }

        if let (Ok(url), Ok(room)) = (env::var("RELAY_URL"), env::var("ROOM_ID")) {
            let mut net = NetConfig::new(url, room, config.player_id.clone());
            if let Some(delay) = read_env::<u64>("RECONNECT_DELAY_MS") {
                net = net.with_reconnect_delay(Duration::from_millis(delay));
            }
            config.net = Some(net);
        }

        config
    }
}

/// Scheduler periods for the session task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickRates {
    pub movement: Duration,
    pub interaction: Duration,
    pub hazard_zones: Duration,
    /// Override for the session's `hazard_tick_ms`.
    pub hazards: Option<Duration>,
    pub clock: Duration,
}

impl Default for TickRates {
    fn default() -> Self {
        Self {
            movement: Duration::from_millis(16),
            interaction: Duration::from_millis(16),
            hazard_zones: Duration::from_millis(500),
            hazards: None,
            clock: Duration::from_millis(100),
        }
    }
}

impl TickRates {
    fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str| read_env::<u64>(key).map(|millis| Duration::from_millis(millis.max(1)));
        let period = |key: &str, default: Duration| millis(key).unwrap_or(default);

        Self {
            movement: period("MOVEMENT_TICK_MS", defaults.movement),
            interaction: period("INTERACTION_TICK_MS", defaults.interaction),
            hazard_zones: period("HAZARD_ZONE_TICK_MS", defaults.hazard_zones),
            hazards: millis("HAZARD_TICK_MS").or(defaults.hazards),
            clock: period("CLOCK_TICK_MS", defaults.clock),
        }
    }

    /// Period of the hazard check: the override if set, else the session tuning.
    pub fn hazard_period(&self, session: &SessionConfig) -> Duration {
        self.hazards
            .unwrap_or_else(|| Duration::from_millis(session.hazard_tick_ms.max(1)))
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
