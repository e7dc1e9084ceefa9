//! Display transport -- the WebSocket server connecting the bridge to the TV.
//!
//! One display slot (last connection wins), any number of sender clients
//! (classified by a `sender-hello` handshake), a single-writer broadcast
//! toward the display, and ping/pong zombie detection. Commands with no
//! display connected are dropped silently: command loss beats a crash.

pub mod messages;

pub use messages::{DisplayCommand, PlayerStatus};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;

use embercast_protocol::WS_MAX_PAYLOAD;

/// Callback invoked with a parsed inbound JSON message.
pub type MessageCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// The WebSocket server. Cheap to clone; all clones share one slot/map.
#[derive(Clone)]
pub struct DisplayServer {
    inner: Arc<Inner>,
}

struct Inner {
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    heartbeat_interval: Duration,
    next_conn_id: AtomicU64,
    state: Mutex<Shared>,
}

#[derive(Default)]
struct Shared {
    /// Connection currently holding the display slot.
    display: Option<u64>,
    /// Sender session id -> connection.
    senders: HashMap<String, u64>,
    clients: HashMap<u64, ClientEntry>,
    status_listeners: Vec<MessageCallback>,
    sender_listeners: Vec<MessageCallback>,
}

struct ClientEntry {
    tx: mpsc::UnboundedSender<Message>,
    /// Cleared on each ping tick, set again by the pong.
    alive: bool,
    /// Set once the connection identifies as a sender.
    sender_id: Option<String>,
}

impl DisplayServer {
    /// Bind the WebSocket listener. Call `spawn` to start serving.
    pub async fn bind(addr: SocketAddr, heartbeat_interval: Duration) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            inner: Arc::new(Inner {
                listener: Mutex::new(Some(listener)),
                local_addr,
                heartbeat_interval,
                next_conn_id: AtomicU64::new(1),
                state: Mutex::new(Shared::default()),
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Register a callback for display (non-sender) messages.
    pub fn on_status(&self, cb: MessageCallback) {
        self.inner.state.lock().unwrap().status_listeners.push(cb);
    }

    /// Register a callback for messages from identified sender clients.
    pub fn on_sender_message(&self, cb: MessageCallback) {
        self.inner.state.lock().unwrap().sender_listeners.push(cb);
    }

    /// Send a command to the display. Dropped silently when no display is
    /// connected.
    pub fn send_command(&self, cmd: &DisplayCommand) {
        let json = match serde_json::to_string(cmd) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize {} command: {e}", cmd.kind());
                return;
            }
        };

        let tx = {
            let state = self.inner.state.lock().unwrap();
            state
                .display
                .and_then(|id| state.clients.get(&id))
                .map(|c| c.tx.clone())
        };

        match tx {
            Some(tx) => {
                if tx.send(Message::Text(json)).is_err() {
                    tracing::debug!("display write channel closed, dropping {}", cmd.kind());
                }
            }
            None => {
                tracing::debug!("no display connected, dropping {}", cmd.kind());
            }
        }
    }

    /// Whether a connection currently holds the display slot.
    pub fn has_display(&self) -> bool {
        self.inner.state.lock().unwrap().display.is_some()
    }

    /// Number of connections identified as senders.
    pub fn sender_count(&self) -> usize {
        self.inner.state.lock().unwrap().senders.len()
    }

    /// Start the accept loop and the heartbeat. Returns the spawned handles.
    pub fn spawn(&self, shutdown: &broadcast::Sender<()>) -> Vec<tokio::task::JoinHandle<()>> {
        let accept = {
            let inner = self.inner.clone();
            let mut shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                let listener = match inner.listener.lock().unwrap().take() {
                    Some(listener) => listener,
                    None => return,
                };

                loop {
                    tokio::select! {
                        accepted = listener.accept() => {
                            match accepted {
                                Ok((stream, peer)) => {
                                    tracing::debug!(remote = %peer, "websocket connection");
                                    let inner = inner.clone();
                                    tokio::spawn(async move {
                                        handle_socket(inner, stream).await;
                                    });
                                }
                                Err(e) => {
                                    tracing::warn!("websocket accept failed: {e}");
                                }
                            }
                        }
                        _ = shutdown.recv() => {
                            tracing::info!("shutdown signal, closing websocket server");
                            break;
                        }
                    }
                }

                inner.close_all();
            })
        };

        let heartbeat = {
            let inner = self.inner.clone();
            let mut shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(inner.heartbeat_interval);
                ticker.tick().await; // immediate first tick

                loop {
                    tokio::select! {
                        _ = ticker.tick() => inner.heartbeat_sweep(),
                        _ = shutdown.recv() => break,
                    }
                }
            })
        };

        vec![accept, heartbeat]
    }
}

impl Inner {
    fn register(&self, conn_id: u64, tx: mpsc::UnboundedSender<Message>) {
        let mut state = self.state.lock().unwrap();

        // Last display wins: displace the previous holder with a normal close.
        if let Some(prev) = state.display.take() {
            if let Some(entry) = state.clients.get(&prev) {
                let _ = entry.tx.send(Message::Close(None));
            }
            tracing::debug!(conn = prev, "displaced previous display connection");
        }

        state.clients.insert(
            conn_id,
            ClientEntry {
                tx,
                alive: true,
                sender_id: None,
            },
        );
        state.display = Some(conn_id);
        tracing::debug!(conn = conn_id, "connected, provisionally the display");
    }

    fn remove(&self, conn_id: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.clients.remove(&conn_id) {
            if let Some(sid) = entry.sender_id {
                if state.senders.get(&sid) == Some(&conn_id) {
                    state.senders.remove(&sid);
                }
            }
        }
        if state.display == Some(conn_id) {
            state.display = None;
        }
    }

    fn mark_alive(&self, conn_id: u64) {
        if let Some(entry) = self.state.lock().unwrap().clients.get_mut(&conn_id) {
            entry.alive = true;
        }
    }

    /// Terminate clients that missed the previous ping, then ping the rest.
    fn heartbeat_sweep(&self) {
        let mut pings = Vec::new();
        let mut dead = Vec::new();

        {
            let mut state = self.state.lock().unwrap();
            for (id, entry) in state.clients.iter_mut() {
                if entry.alive {
                    entry.alive = false;
                    pings.push(entry.tx.clone());
                } else {
                    dead.push(*id);
                }
            }

            for id in &dead {
                tracing::info!(conn = id, "terminating unresponsive websocket client");
                if let Some(entry) = state.clients.get(id) {
                    let _ = entry.tx.send(Message::Close(None));
                }
            }
            for id in dead {
                if let Some(entry) = state.clients.remove(&id) {
                    if let Some(sid) = entry.sender_id {
                        if state.senders.get(&sid) == Some(&id) {
                            state.senders.remove(&sid);
                        }
                    }
                }
                if state.display == Some(id) {
                    state.display = None;
                }
            }
        }

        for tx in pings {
            let _ = tx.send(Message::Ping(Vec::new()));
        }
    }

    fn reclassify(&self, conn_id: u64, sender_session: &str) {
        let mut state = self.state.lock().unwrap();
        if state.display == Some(conn_id) {
            state.display = None;
        }
        if let Some(entry) = state.clients.get_mut(&conn_id) {
            entry.sender_id = Some(sender_session.to_string());
        }
        state.senders.insert(sender_session.to_string(), conn_id);
        tracing::info!(conn = conn_id, session = sender_session, "client identified as sender");
    }

    fn route_text(&self, conn_id: u64, raw: &str) {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v @ Value::Object(_)) => v,
            _ => {
                tracing::debug!(conn = conn_id, "dropping unparseable websocket frame");
                return;
            }
        };

        if value.get("type").and_then(Value::as_str) == Some("sender-hello") {
            match value.get("sessionId").and_then(Value::as_str) {
                Some(sid) => self.reclassify(conn_id, sid),
                None => tracing::debug!(conn = conn_id, "sender-hello without sessionId"),
            }
            return;
        }

        // Senders get their own callback stream; everything else is status.
        let callbacks = {
            let state = self.state.lock().unwrap();
            let is_sender = state
                .clients
                .get(&conn_id)
                .map(|c| c.sender_id.is_some())
                .unwrap_or(false);
            if is_sender {
                state.sender_listeners.clone()
            } else {
                state.status_listeners.clone()
            }
        };

        for cb in callbacks {
            cb(&value);
        }
    }

    fn close_all(&self) {
        let mut state = self.state.lock().unwrap();
        for entry in state.clients.values() {
            let _ = entry.tx.send(Message::Close(None));
        }
        state.clients.clear();
        state.senders.clear();
        state.display = None;
    }
}

async fn handle_socket(inner: Arc<Inner>, stream: TcpStream) {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(WS_MAX_PAYLOAD);
    config.max_frame_size = Some(WS_MAX_PAYLOAD);

    let ws = match tokio_tungstenite::accept_async_with_config(stream, Some(config)).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!("websocket handshake failed: {e}");
            return;
        }
    };

    let conn_id = inner.next_conn_id.fetch_add(1, Ordering::Relaxed);
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    inner.register(conn_id, tx);

    let (mut sink, mut reader) = ws.split();

    // Single writer task: serializes every outbound frame for this socket.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(item) = reader.next().await {
        match item {
            Ok(Message::Text(text)) => inner.route_text(conn_id, &text),
            Ok(Message::Pong(_)) => inner.mark_alive(conn_id),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn = conn_id, "websocket read error: {e}");
                break;
            }
        }
    }

    // Dropping the map entry drops the writer's sender, ending the writer.
    inner.remove(conn_id);
    let _ = writer.await;
    tracing::debug!(conn = conn_id, "websocket disconnected");
}
