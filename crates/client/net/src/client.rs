//! Session connection lifecycle.
//!
//! ```text
//! Idle ──enable──▶ Connecting ──open+join──▶ Joined
//!                      ▲                        │ close / error
//!                      └──── reconnect delay ◀── Disconnected
//! ```
//!
//! `disable` tears the connection down intentionally; no reconnect follows.
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::NetConfig;
use crate::error::FrameError;
use crate::message::{ControlMessage, InboundMessage, RosterMessage};
use crate::roster::PeerRoster;
use crate::transport::{Link, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not enabled, or torn down intentionally.
    Idle,
    Connecting,
    /// Connected and the join announcement was sent.
    Joined,
    /// Connection lost; a reconnect is pending.
    Disconnected,
}

type MessageHandler = Box<dyn Fn(InboundMessage) + Send + Sync>;

/// Network client for one multiplayer session.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct NetClient {
    shared: Arc<Shared>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

struct Shared {
    config: NetConfig,
    transport: Arc<dyn Transport>,
    state: watch::Sender<ConnectionState>,
    roster: RwLock<PeerRoster>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    on_message: Mutex<Option<MessageHandler>>,
    /// `true` once `disable` was called; cancels waits and stops reconnects.
    intentional_disconnect: watch::Sender<bool>,
}

impl NetClient {
    pub fn new(config: NetConfig, transport: Arc<dyn Transport>) -> Self {
        let roster = PeerRoster::new(config.player_id.clone());
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                state: watch::Sender::new(ConnectionState::Idle),
                roster: RwLock::new(roster),
                outbound: Mutex::new(None),
                on_message: Mutex::new(None),
                intentional_disconnect: watch::Sender::new(false),
            }),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &NetConfig {
        &self.shared.config
    }

    /// Registers the callback that receives every parsed inbound message.
    pub async fn set_on_message<F>(&self, callback: F)
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        *self.shared.on_message.lock().await = Some(Box::new(callback));
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver notified on every lifecycle transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub async fn roster(&self) -> PeerRoster {
        self.shared.roster.read().await.clone()
    }

    /// Starts connecting. Calling it while already enabled does nothing.
    pub async fn enable(&self) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        self.shared.intentional_disconnect.send_replace(false);
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(shared.run()));
    }

    /// Tears the connection down for good and waits for the loop to stop.
    pub async fn disable(&self) {
        self.shared.intentional_disconnect.send_replace(true);
        self.shared.outbound.lock().await.take();
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Network task ended abnormally: {}", e);
            }
        }
        self.shared.roster.write().await.clear();
        self.shared.state.send_replace(ConnectionState::Idle);
    }

    /// Sends `message` if currently joined. Nothing is queued or retried.
    ///
    /// Returns whether the frame was handed to the transport.
    pub async fn send<T: Serialize>(&self, message: &T) -> bool {
        if self.state() != ConnectionState::Joined {
            trace!("Dropping outbound message: not joined");
            return false;
        }
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode outbound message: {}", e);
                return false;
            }
        };
        // Clone the sender to avoid holding the lock across await
        let tx = self.shared.outbound.lock().await.clone();
        match tx {
            Some(tx) => tx.send(text).await.is_ok(),
            None => false,
        }
    }
}

impl Shared {
    fn is_disabled(&self) -> bool {
        *self.intentional_disconnect.borrow()
    }

    async fn run(self: Arc<Self>) {
        let mut cancelled = self.intentional_disconnect.subscribe();

        loop {
            if self.is_disabled() {
                break;
            }
            self.state.send_replace(ConnectionState::Connecting);

            let opened = tokio::select! {
                result = self.transport.open(&self.config.url, self.config.channel_capacity) => result,
                _ = disabled(&mut cancelled) => {
                    debug!("Connection attempt abandoned");
                    break;
                }
            };
            match opened {
                Ok(link) if self.is_disabled() => drop(link),
                Ok(link) => self.serve(link, &mut cancelled).await,
                Err(e) => warn!("Connection attempt failed: {}", e),
            }

            self.outbound.lock().await.take();
            self.roster.write().await.clear();
            if self.is_disabled() {
                break;
            }
            self.state.send_replace(ConnectionState::Disconnected);

            info!(
                "Reconnecting to {} in {}ms",
                self.config.url,
                self.config.reconnect_delay.as_millis()
            );
            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = disabled(&mut cancelled) => break,
            }
        }

        debug!("Network loop stopped");
    }

    /// Joins the room and pumps inbound frames until the link closes.
    async fn serve(&self, mut link: Link, cancelled: &mut watch::Receiver<bool>) {
        let join = ControlMessage::Join {
            room_id: self.config.room_id.clone(),
            player_id: self.config.player_id.clone(),
        };
        let text = match serde_json::to_string(&join) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode join message: {}", e);
                return;
            }
        };
        if link.outbound.send(text).await.is_err() {
            warn!("Link closed before join was sent");
            return;
        }
        *self.outbound.lock().await = Some(link.outbound.clone());
        self.state.send_replace(ConnectionState::Joined);
        info!(
            "Joined room {} as {}",
            self.config.room_id, self.config.player_id
        );

        loop {
            tokio::select! {
                frame = link.inbound.recv() => match frame {
                    Some(text) => self.handle_frame(&text).await,
                    None => {
                        info!("Connection closed");
                        break;
                    }
                },
                _ = disabled(cancelled) => break,
            }
        }
    }

    async fn handle_frame(&self, text: &str) {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(FrameError::MissingType) => {
                debug!("Dropping frame without a type: {}", text);
                return;
            }
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        match RosterMessage::interpret(&message) {
            Some(Ok(update)) => self.roster.write().await.apply(&update),
            Some(Err(e)) => {
                warn!("Dropping malformed roster message: {}", e);
                return;
            }
            None => {}
        }

        let callback = self.on_message.lock().await;
        if let Some(ref cb) = *callback {
            cb(message);
        }
    }
}

/// Resolves once `disable` has been called.
async fn disabled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
