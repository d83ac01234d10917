//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::Arc;

use escape_core::{SessionDelta, SessionEvent};
use tokio::sync::broadcast;

use super::types::{ClockEvent, NetworkEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Topic {
    /// Rule events and state deltas
    Session,
    /// Elapsed-time display updates
    Clock,
    /// Connection and roster changes
    Network,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Session, Topic::Clock, Topic::Network];
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone)]
pub enum Event {
    Session(SessionEvent),
    /// What one callback changed; published after its events.
    Changed(SessionDelta),
    Clock(ClockEvent),
    Network(NetworkEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Session(_) | Event::Changed(_) => Topic::Session,
            Event::Clock(_) => Topic::Clock,
            Event::Network(_) => Topic::Network,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Publishing never blocks; lagging subscribers
/// lose the oldest events.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<HashMap<Topic, broadcast::Sender<Event>>>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::ALL
            .into_iter()
            .map(|topic| (topic, broadcast::channel(capacity.max(1)).0))
            .collect();

        Self {
            channels: Arc::new(channels),
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        // Every topic is inserted by the constructor.
        &self.channels[&topic]
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_only_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut session = bus.subscribe(Topic::Session);
        let mut clock = bus.subscribe(Topic::Clock);

        bus.publish(Event::Session(SessionEvent::ExitReached));
        bus.publish(Event::Clock(ClockEvent {
            elapsed_ms: 1_000,
            display: "00:01".into(),
        }));

        assert!(matches!(
            session.recv().await.unwrap(),
            Event::Session(SessionEvent::ExitReached)
        ));
        assert!(session.try_recv().is_err());
        assert!(matches!(clock.recv().await.unwrap(), Event::Clock(_)));
    }
}
