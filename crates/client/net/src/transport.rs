//! Physical links.
//!
//! A [`Transport`] opens a [`Link`]: a pair of text-frame channels. The link
//! is closed from the remote side when `inbound` yields `None`, and from the
//! local side by dropping `outbound`.
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info};

use crate::error::TransportError;

/// An open connection.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<String>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str, capacity: usize) -> Result<Link, TransportError>;
}

// ============================================================================
// WebSocket
// ============================================================================

/// Text-frame WebSocket transport built on tokio-tungstenite.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str, capacity: usize) -> Result<Link, TransportError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        info!("Connected to relay at {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(capacity);

        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Relay closed connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            debug!("WebSocket read task finished");
        });

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    error!("Failed to send frame: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
            debug!("WebSocket write task finished");
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Transport whose connections are handed to the caller as [`MemoryPeer`]s.
///
/// Used to run a networked session without a relay, e.g. in tests.
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    accepted: Arc<Mutex<Option<mpsc::UnboundedSender<MemoryPeer>>>>,
}

impl MemoryTransport {
    /// Returns the transport and the stream of connections it accepts.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            accepted: Arc::new(Mutex::new(Some(tx))),
        };
        (transport, rx)
    }

    /// Refuses every further connection attempt.
    pub async fn shut_down(&self) {
        self.accepted.lock().await.take();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, url: &str, capacity: usize) -> Result<Link, TransportError> {
        let refused = || TransportError::Refused {
            url: url.to_owned(),
        };
        let accepted = self.accepted.lock().await;
        let acceptor = accepted.as_ref().ok_or_else(refused)?;

        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let peer = MemoryPeer {
            url: url.to_owned(),
            received: outbound_rx,
            push: inbound_tx,
        };
        acceptor.send(peer).map_err(|_| refused())?;

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Remote end of one in-memory connection. Dropping it closes the link.
#[derive(Debug)]
pub struct MemoryPeer {
    pub url: String,
    received: mpsc::Receiver<String>,
    push: mpsc::Sender<String>,
}

impl MemoryPeer {
    /// Next frame sent by the client, or `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<String> {
        self.received.recv().await
    }

    /// Delivers a frame to the client. Returns `false` if it hung up.
    pub async fn send(&self, text: impl Into<String>) -> bool {
        self.push.send(text.into()).await.is_ok()
    }
}
