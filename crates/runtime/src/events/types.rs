//! Event payloads for the clock and network topics.

use escape_net::ConnectionState;

/// Elapsed session time, published when the displayed value changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockEvent {
    pub elapsed_ms: u64,
    /// `mm:ss`
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    ConnectionChanged(ConnectionState),
    /// Current peer roster after a roster broadcast.
    RosterChanged { peers: Vec<String> },
}
