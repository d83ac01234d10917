//! Networked-session client.
//!
//! Keeps one transport connection per multiplayer session, announces the
//! local participant to the room, maintains the peer roster from roster
//! broadcasts, and forwards every parsed inbound message to a registered
//! handler. Gameplay payloads are opaque here; the runtime decodes them.
//!
//! - [`client`] drives the connect / join / receive / reconnect loop
//! - [`transport`] abstracts the physical link ([`WebSocketTransport`], [`MemoryTransport`])
//! - [`message`] parses inbound frames and encodes control messages
//! - [`roster`] tracks the other participants in the room
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod roster;
pub mod transport;

pub use client::{ConnectionState, NetClient};
pub use config::NetConfig;
pub use error::{FrameError, TransportError};
pub use message::{ControlMessage, InboundMessage, RosterEntry, RosterMessage};
pub use roster::PeerRoster;
pub use transport::{Link, MemoryPeer, MemoryTransport, Transport, WebSocketTransport};
