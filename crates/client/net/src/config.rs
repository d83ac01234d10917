//! Network session settings.
use std::time::Duration;

/// Connection parameters for one networked session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetConfig {
    /// Relay endpoint, e.g. `ws://localhost:8787/room`.
    pub url: String,
    pub room_id: String,
    pub player_id: String,
    /// Fixed wait between a close and the next connection attempt.
    pub reconnect_delay: Duration,
    /// Capacity of the outbound frame queue handed to the transport.
    pub channel_capacity: usize,
}

impl NetConfig {
    pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

    pub fn new(
        url: impl Into<String>,
        room_id: impl Into<String>,
        player_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            room_id: room_id.into(),
            player_id: player_id.into(),
            reconnect_delay: Self::DEFAULT_RECONNECT_DELAY,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}
