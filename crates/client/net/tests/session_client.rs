//! Connection lifecycle tests over the in-memory transport.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use escape_net::{
    ConnectionState, InboundMessage, Link, MemoryPeer, MemoryTransport, NetClient, NetConfig,
    Transport, TransportError,
};
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    client: NetClient,
    transport: MemoryTransport,
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
    inbox: mpsc::UnboundedReceiver<InboundMessage>,
    state: watch::Receiver<ConnectionState>,
}

async fn harness() -> Harness {
    let (transport, peers) = MemoryTransport::new();
    let config = NetConfig::new("memory://relay", "cellar", "ada");
    let client = NetClient::new(config, Arc::new(transport.clone()));

    let (tx, inbox) = mpsc::unbounded_channel();
    client
        .set_on_message(move |message| {
            let _ = tx.send(message);
        })
        .await;
    let state = client.watch_state();

    Harness {
        client,
        transport,
        peers,
        inbox,
        state,
    }
}

/// Connection attempts hang for `delay` before reaching the in-memory relay.
struct SlowTransport {
    inner: MemoryTransport,
    delay: Duration,
}

#[async_trait]
impl Transport for SlowTransport {
    async fn open(&self, url: &str, capacity: usize) -> Result<Link, TransportError> {
        tokio::time::sleep(self.delay).await;
        self.inner.open(url, capacity).await
    }
}

async fn accept(peers: &mut mpsc::UnboundedReceiver<MemoryPeer>) -> MemoryPeer {
    peers.recv().await.expect("client should connect")
}

async fn next_json(peer: &mut MemoryPeer) -> Value {
    let text = peer.recv().await.expect("client should send a frame");
    serde_json::from_str(&text).expect("frames are JSON")
}

async fn wait_for(state: &mut watch::Receiver<ConnectionState>, expected: ConnectionState) {
    state
        .wait_for(|current| *current == expected)
        .await
        .expect("client alive");
}

// ============================================================================
// Join & roster
// ============================================================================

#[tokio::test(start_paused = true)]
async fn join_is_announced_and_roster_tracks_broadcasts() {
    let mut h = harness().await;
    h.client.enable().await;

    let mut peer = accept(&mut h.peers).await;
    assert_eq!(
        next_json(&mut peer).await,
        json!({"type": "join", "roomId": "cellar", "playerId": "ada"})
    );
    wait_for(&mut h.state, ConnectionState::Joined).await;

    peer.send(r#"{"type": "room_state", "players": ["ada", "bob"]}"#)
        .await;
    peer.send(r#"{"type": "player_joined", "playerId": "cy"}"#).await;
    peer.send(r#"{"type": "player_left", "playerId": "bob"}"#).await;

    for expected in ["room_state", "player_joined", "player_left"] {
        let message = h.inbox.recv().await.unwrap();
        assert_eq!(message.kind(), expected);
    }

    let roster = h.client.roster().await;
    assert_eq!(roster.ids().collect::<Vec<_>>(), ["cy"]);
}

#[tokio::test(start_paused = true)]
async fn messages_are_forwarded_in_order_and_garbage_is_dropped() {
    let mut h = harness().await;
    h.client.enable().await;
    let mut peer = accept(&mut h.peers).await;
    next_json(&mut peer).await;

    peer.send(r#"{"type": "player_position", "playerId": "bob", "x": 1, "y": 2}"#)
        .await;
    peer.send("{ not json").await;
    peer.send(r#"{"playerId": "bob", "x": 5}"#).await;
    peer.send(r#"{"type": "room_state"}"#).await;
    peer.send(r#"{"type": "cell_update", "playerId": "bob", "x": 0, "y": 0, "cell": {}}"#)
        .await;

    let first = h.inbox.recv().await.unwrap();
    assert_eq!(first.kind(), "player_position");
    assert_eq!(first.body()["x"], 1);
    let second = h.inbox.recv().await.unwrap();
    assert_eq!(second.kind(), "cell_update");
    assert!(h.inbox.try_recv().is_err());
}

// ============================================================================
// Outbound
// ============================================================================

#[tokio::test(start_paused = true)]
async fn sends_are_dropped_unless_joined() {
    let mut h = harness().await;
    assert!(!h.client.send(&json!({"type": "ping"})).await);

    h.client.enable().await;
    let mut peer = accept(&mut h.peers).await;
    next_json(&mut peer).await;
    wait_for(&mut h.state, ConnectionState::Joined).await;

    assert!(h.client.send(&json!({"type": "ping"})).await);
    assert_eq!(next_json(&mut peer).await, json!({"type": "ping"}));
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test(start_paused = true)]
async fn close_clears_roster_and_reconnects_after_fixed_delay() {
    let mut h = harness().await;
    h.client.enable().await;

    let mut peer = accept(&mut h.peers).await;
    next_json(&mut peer).await;
    peer.send(r#"{"type": "room_state", "players": ["ada", "bob"]}"#)
        .await;
    h.inbox.recv().await.unwrap();
    assert!(h.client.roster().await.contains("bob"));

    drop(peer);
    wait_for(&mut h.state, ConnectionState::Disconnected).await;
    assert!(h.client.roster().await.is_empty());
    let closed_at = Instant::now();

    let mut peer = accept(&mut h.peers).await;
    assert!(closed_at.elapsed() >= NetConfig::DEFAULT_RECONNECT_DELAY);
    assert_eq!(next_json(&mut peer).await["type"], "join");
    wait_for(&mut h.state, ConnectionState::Joined).await;
    assert!(h.client.roster().await.is_empty());

    peer.send(r#"{"type": "room_state", "players": ["bob"]}"#).await;
    h.inbox.recv().await.unwrap();
    assert!(h.client.roster().await.contains("bob"));
}

#[tokio::test(start_paused = true)]
async fn refused_connection_is_retried() {
    let mut h = harness().await;
    h.transport.shut_down().await;
    h.client.enable().await;

    wait_for(&mut h.state, ConnectionState::Disconnected).await;
    tokio::time::sleep(NetConfig::DEFAULT_RECONNECT_DELAY + Duration::from_millis(1)).await;
    assert_ne!(h.client.state(), ConnectionState::Joined);
    assert!(h.peers.try_recv().is_err());

    h.client.disable().await;
    assert_eq!(h.client.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn disable_stops_reconnecting() {
    let mut h = harness().await;
    h.client.enable().await;
    let mut peer = accept(&mut h.peers).await;
    next_json(&mut peer).await;

    h.client.disable().await;
    assert_eq!(h.client.state(), ConnectionState::Idle);
    assert_eq!(peer.recv().await, None);

    tokio::time::sleep(NetConfig::DEFAULT_RECONNECT_DELAY * 3).await;
    assert!(h.peers.try_recv().is_err());
    assert!(!h.client.send(&json!({"type": "ping"})).await);
}

#[tokio::test(start_paused = true)]
async fn disable_abandons_a_pending_connection_attempt() {
    let (inner, mut peers) = MemoryTransport::new();
    let client = NetClient::new(
        NetConfig::new("memory://relay", "cellar", "ada"),
        Arc::new(SlowTransport {
            inner,
            delay: Duration::from_secs(30),
        }),
    );
    client.enable().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.state(), ConnectionState::Connecting);

    let started = Instant::now();
    client.disable().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(client.state(), ConnectionState::Idle);

    // The attempt was dropped: nothing ever reaches the relay.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(peers.try_recv().is_err());
}
