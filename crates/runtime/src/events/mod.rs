//! Topic-based event bus for runtime events.
//!
//! Session callbacks, the clock, and the network client publish here;
//! renderers and tools subscribe only to the topics they need.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{ClockEvent, NetworkEvent};
