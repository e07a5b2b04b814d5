// src/livereload/broadcaster.rs

//! Fan-out of reload messages to connected browsers.
//!
//! A single coordinator task owns the client table. Everything else talks
//! to it through a cloneable [`Broadcaster`] handle, so registration,
//! removal and delivery never race.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::errors::{DevloopError, Result};
use crate::process::AppProcess;

use super::message::ReloadMessage;

pub type ClientKey = u64;

/// Per-client queue depth. A client that has not picked up the previous
/// message misses the next one.
const CLIENT_QUEUE_DEPTH: usize = 1;

/// A registered connection: its key and the receiving end of its queue.
#[derive(Debug)]
pub struct LiveClient {
    pub key: ClientKey,
    pub rx: mpsc::Receiver<ReloadMessage>,
}

enum Command {
    Register(oneshot::Sender<LiveClient>),
    Unregister(ClientKey),
    Broadcast(ReloadMessage),
    Count(oneshot::Sender<usize>),
}

#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Register(_) => f.write_str("Register"),
            Command::Unregister(key) => write!(f, "Unregister({key})"),
            Command::Broadcast(msg) => write!(f, "Broadcast({})", msg.change_type),
            Command::Count(_) => f.write_str("Count"),
        }
    }
}

impl Broadcaster {
    /// Start the coordinator. It runs until every handle is dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(coordinator(rx));
        (Self { tx }, handle)
    }

    pub async fn register(&self) -> Result<LiveClient> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Register(reply_tx))?;
        reply_rx.await.map_err(|_| stopped())
    }

    /// Remove a client. Unknown keys are ignored.
    pub fn unregister(&self, key: ClientKey) {
        let _ = self.send(Command::Unregister(key));
    }

    /// Queue `msg` for every client. Never blocks on slow clients.
    pub fn broadcast(&self, msg: ReloadMessage) {
        if self.send(Command::Broadcast(msg)).is_err() {
            debug!("live-reload coordinator gone; message dropped");
        }
    }

    pub async fn client_count(&self) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Count(reply_tx))?;
        reply_rx.await.map_err(|_| stopped())
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).map_err(|_| stopped())
    }
}

fn stopped() -> DevloopError {
    DevloopError::Other(anyhow::anyhow!("live-reload coordinator has stopped"))
}

async fn coordinator(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut clients: HashMap<ClientKey, mpsc::Sender<ReloadMessage>> = HashMap::new();
    let mut next_key: ClientKey = 0;

    while let Some(cmd) = rx.recv().await {
        trace!(?cmd, clients = clients.len(), "coordinator command");
        match cmd {
            Command::Register(reply) => {
                next_key += 1;
                let (tx, client_rx) = mpsc::channel(CLIENT_QUEUE_DEPTH);
                clients.insert(next_key, tx);
                debug!(client = next_key, total = clients.len(), "live-reload client connected");
                let _ = reply.send(LiveClient {
                    key: next_key,
                    rx: client_rx,
                });
            }
            Command::Unregister(key) => {
                if clients.remove(&key).is_some() {
                    debug!(client = key, total = clients.len(), "live-reload client disconnected");
                }
            }
            Command::Broadcast(msg) => {
                clients.retain(|key, tx| match tx.try_send(msg.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(client = *key, "client queue full; message dropped");
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(client = *key, "client gone; removing");
                        false
                    }
                });
            }
            Command::Count(reply) => {
                let _ = reply.send(clients.len());
            }
        }
    }

    debug!("live-reload coordinator stopped");
}

/// Broadcast `msg` once the app answers its health check.
///
/// A readiness timeout is logged and returned; nothing is sent.
pub async fn must_reload_broadcast(
    process: &dyn AppProcess,
    broadcaster: &Broadcaster,
    msg: ReloadMessage,
) -> Result<()> {
    if let Err(err) = process.wait_for_readiness().await {
        error!(error = %err, change = %msg.change_type, "app not ready; reload not sent");
        return Err(err);
    }
    broadcaster.broadcast(msg);
    Ok(())
}
