//! Reconnecting chat WebSocket client.
//!
//! One [`ChatSocket`] carries one conversation, addressed by the
//! counterpart id and a bearer token. The connection loop runs in a
//! spawned task: it connects, drives the read loop until the stream ends,
//! then reschedules itself per the [`ReconnectPolicy`] unless the close
//! was intentional.
//!
//! Each `connect` bumps a generation counter and every loop iteration
//! re-checks it, so a reconnect scheduled for an old identity key is a
//! no-op once a newer connect or disconnect has happened.

use crate::frames::{ChatFrame, ConnectionStatus, Frame};
use crate::reconnect::ReconnectPolicy;
use crate::{SocketError, SocketResult};
use futures_util::{SinkExt, StreamExt};
use souk_config::ClientConfig;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Chat socket configuration.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Realtime base URL (e.g., wss://api.souk.app/ws).
    pub url: String,
    /// Fixed delay between reconnect attempts in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Maximum consecutive failed attempts before giving up.
    pub max_reconnect_attempts: u32,
}

impl SocketConfig {
    pub fn from_client(config: &ClientConfig) -> Self {
        Self {
            url: config.realtime_url.clone(),
            reconnect_delay_ms: config.reconnect_delay_ms,
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Events emitted by the chat socket.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Connection established.
    Connected,
    /// Connection ended, with the close reason when known.
    Disconnected(Option<String>),
    /// Server-reported connection status frame.
    Status(ConnectionStatus),
    /// Incoming chat message.
    Message(ChatFrame),
    /// Transport error.
    Error(String),
}

/// WebSocket chat client with automatic reconnection.
pub struct ChatSocket {
    config: SocketConfig,
    policy: ReconnectPolicy,
    state: Arc<RwLock<SocketState>>,
    /// Identity of the current conversation: (counterpart_id, token).
    key: Arc<RwLock<Option<(String, String)>>>,
    sender: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
    event_tx: broadcast::Sender<SocketEvent>,
    /// Bumped by connect and disconnect; stale connection loops exit.
    generation: Arc<AtomicU64>,
    intentional: Arc<AtomicBool>,
    attempts: Arc<AtomicU32>,
    conn_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSocket {
    pub fn new(config: SocketConfig) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let policy = ReconnectPolicy::new(config.reconnect_delay_ms, config.max_reconnect_attempts);

        Self {
            config,
            policy,
            state: Arc::new(RwLock::new(SocketState::Idle)),
            key: Arc::new(RwLock::new(None)),
            sender: Arc::new(Mutex::new(None)),
            event_tx,
            generation: Arc::new(AtomicU64::new(0)),
            intentional: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicU32::new(0)),
            conn_task: Mutex::new(None),
        }
    }

    /// Subscribe to socket events.
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.event_tx.subscribe()
    }

    /// Current connection state.
    pub async fn state(&self) -> SocketState {
        *self.state.read().await
    }

    /// Whether the connection is open.
    pub async fn is_open(&self) -> bool {
        *self.state.read().await == SocketState::Open
    }

    /// Consecutive failed connection attempts so far.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Open the conversation with `counterpart_id`, authenticating with
    /// `token`. Refuses silently when either argument is empty; no-ops when
    /// already connecting or open.
    pub async fn connect(&self, counterpart_id: &str, token: &str) {
        if counterpart_id.is_empty() || token.is_empty() {
            debug!("Missing counterpart id or token, not connecting");
            return;
        }

        {
            let state = *self.state.read().await;
            if state == SocketState::Open || state == SocketState::Connecting {
                debug!(?state, "Already connecting or connected");
                return;
            }
        }

        *self.key.write().await = Some((counterpart_id.to_string(), token.to_string()));
        self.intentional.store(false, Ordering::SeqCst);
        self.attempts.store(0, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write().await = SocketState::Connecting;

        let handle = self.spawn_connection(generation);
        if let Some(old) = self.conn_task.lock().await.replace(handle) {
            old.abort();
        }
    }

    fn spawn_connection(&self, my_generation: u64) -> JoinHandle<()> {
        let config = self.config.clone();
        let policy = self.policy;
        let state = self.state.clone();
        let key = self.key.clone();
        let sender = self.sender.clone();
        let event_tx = self.event_tx.clone();
        let generation = self.generation.clone();
        let intentional = self.intentional.clone();
        let attempts = self.attempts.clone();

        tokio::spawn(async move {
            loop {
                if generation.load(Ordering::SeqCst) != my_generation
                    || intentional.load(Ordering::SeqCst)
                {
                    debug!("Connection loop superseded, exiting");
                    return;
                }
                let Some((counterpart_id, token)) = key.read().await.clone() else {
                    return;
                };

                *state.write().await = SocketState::Connecting;
                let url = format!(
                    "{}/chat/{}/?token={}",
                    config.url.trim_end_matches('/'),
                    counterpart_id,
                    token
                );
                debug!(counterpart_id = %counterpart_id, "Connecting chat socket");

                match connect_async(&url).await {
                    Ok((ws_stream, _)) => {
                        attempts.store(0, Ordering::SeqCst);
                        *state.write().await = SocketState::Open;
                        info!(counterpart_id = %counterpart_id, "Chat socket open");
                        let _ = event_tx.send(SocketEvent::Connected);

                        let reason = drive(ws_stream, &sender, &event_tx).await;

                        *sender.lock().await = None;
                        *state.write().await = SocketState::Closed;
                        let _ = event_tx.send(SocketEvent::Disconnected(reason));
                    }
                    Err(e) => {
                        warn!(error = %e, "Chat socket connection failed");
                        *state.write().await = SocketState::Closed;
                        let _ = event_tx.send(SocketEvent::Error(e.to_string()));
                    }
                }

                let failures = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let Some(delay) = policy.next_delay(failures, intentional.load(Ordering::SeqCst))
                else {
                    if !intentional.load(Ordering::SeqCst) {
                        warn!(failures, "Max reconnect attempts reached, staying closed");
                    }
                    return;
                };

                info!(
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                tokio::time::sleep(delay).await;
            }
        })
    }

    /// Send a chat message; returns the generated correlation id.
    pub async fn send_chat(&self, body: &str) -> SocketResult<String> {
        if *self.state.read().await != SocketState::Open {
            return Err(SocketError::NotConnected);
        }

        let sender = self.sender.lock().await;
        let sender = sender.as_ref().ok_or(SocketError::NotConnected)?;

        let (frame, message_id) = Frame::outgoing_chat(body);
        let json = frame.to_json()?;
        sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))?;
        Ok(message_id)
    }

    /// Close the conversation. Cancels any pending reconnect; a later
    /// `connect` starts over from a clean slate.
    pub async fn disconnect(&self) {
        self.intentional.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write().await = SocketState::Closing;

        if let Some(handle) = self.conn_task.lock().await.take() {
            handle.abort();
        }

        *self.sender.lock().await = None;
        *self.key.write().await = None;
        self.attempts.store(0, Ordering::SeqCst);
        *self.state.write().await = SocketState::Closed;

        info!("Chat socket closed");
        let _ = self
            .event_tx
            .send(SocketEvent::Disconnected(Some("closed by client".to_string())));
    }
}

/// Drive one open connection: writer task plus the read loop. Returns the
/// close reason, when known.
async fn drive(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    sender_slot: &Arc<Mutex<Option<mpsc::Sender<Message>>>>,
    event_tx: &broadcast::Sender<SocketEvent>,
) -> Option<String> {
    let (mut write, mut read) = ws_stream.split();
    let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(100);
    *sender_slot.lock().await = Some(msg_tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if write.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut reason = None;
    while let Some(result) = read.next().await {
        match result {
            Ok(Message::Text(text)) => match Frame::from_json(&text) {
                Ok(Frame::Connection { status }) => {
                    debug!(?status, "Connection status frame");
                    let _ = event_tx.send(SocketEvent::Status(status));
                }
                Ok(Frame::Chat(frame)) => {
                    let _ = event_tx.send(SocketEvent::Message(frame));
                }
                Err(e) => {
                    warn!(error = %e, "Dropping malformed frame");
                }
            },
            Ok(Message::Ping(data)) => {
                let _ = msg_tx.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(frame)) => {
                info!("Chat socket closed by server");
                reason = frame.map(|f| f.reason.to_string());
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "WebSocket error");
                reason = Some(e.to_string());
                break;
            }
        }
    }

    writer.abort();
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::Sender;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    fn test_config(url: &str) -> SocketConfig {
        SocketConfig {
            url: url.to_string(),
            reconnect_delay_ms: 30,
            max_reconnect_attempts: 3,
        }
    }

    /// Local WebSocket server that echoes text frames back. Records accepted
    /// connections and the request path of the most recent handshake.
    async fn spawn_ws_server(
        close_immediately: bool,
    ) -> (String, Arc<AtomicUsize>, Arc<StdMutex<Option<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = Arc::new(AtomicUsize::new(0));
        let last_uri: Arc<StdMutex<Option<String>>> = Arc::new(StdMutex::new(None));

        let accepts_clone = accepts.clone();
        let last_uri_clone = last_uri.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                accepts_clone.fetch_add(1, Ordering::SeqCst);

                let uri_slot = last_uri_clone.clone();
                tokio::spawn(async move {
                    let callback = move |req: &Request, resp: Response| {
                        *uri_slot.lock().unwrap() = Some(req.uri().to_string());
                        Ok(resp)
                    };
                    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                    else {
                        return;
                    };

                    if close_immediately {
                        let _ = ws.close(None).await;
                        return;
                    }

                    while let Some(Ok(msg)) = ws.next().await {
                        match msg {
                            Message::Text(text) => {
                                let _ = ws.send(Message::Text(text)).await;
                            }
                            Message::Close(_) => break,
                            _ => {}
                        }
                    }
                });
            }
        });

        (format!("ws://{}", addr), accepts, last_uri)
    }

    async fn wait_for<F>(rx: &mut broadcast::Receiver<SocketEvent>, pred: F) -> SocketEvent
    where
        F: Fn(&SocketEvent) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                let event = rx.recv().await.unwrap();
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for socket event")
    }

    #[tokio::test]
    async fn test_connect_refuses_empty_arguments() {
        let socket = ChatSocket::new(test_config("ws://127.0.0.1:1"));

        socket.connect("", "token").await;
        assert_eq!(socket.state().await, SocketState::Idle);

        socket.connect("42", "").await;
        assert_eq!(socket.state().await, SocketState::Idle);
    }

    #[tokio::test]
    async fn test_send_chat_requires_open_connection() {
        let socket = ChatSocket::new(test_config("ws://127.0.0.1:1"));
        let result = socket.send_chat("hello").await;
        assert!(matches!(result, Err(SocketError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_send_and_receive() {
        let (url, _accepts, last_uri) = spawn_ws_server(false).await;
        let socket = ChatSocket::new(test_config(&url));
        let mut rx = socket.subscribe();

        socket.connect("42", "tok-1").await;
        wait_for(&mut rx, |e| matches!(e, SocketEvent::Connected)).await;
        assert!(socket.is_open().await);
        assert_eq!(
            last_uri.lock().unwrap().as_deref(),
            Some("/chat/42/?token=tok-1")
        );

        let id = socket.send_chat("hello").await.unwrap();

        // The echo server reflects our own frame back.
        let event = wait_for(&mut rx, |e| matches!(e, SocketEvent::Message(_))).await;
        match event {
            SocketEvent::Message(frame) => {
                assert_eq!(frame.message_id, id);
                assert_eq!(frame.message, "hello");
                assert_eq!(frame.sender, Sender::Own);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        socket.disconnect().await;
    }

    #[tokio::test]
    async fn test_connect_while_open_is_a_noop() {
        let (url, accepts, _) = spawn_ws_server(false).await;
        let socket = ChatSocket::new(test_config(&url));
        let mut rx = socket.subscribe();

        socket.connect("42", "tok-1").await;
        wait_for(&mut rx, |e| matches!(e, SocketEvent::Connected)).await;

        socket.connect("42", "tok-1").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(accepts.load(Ordering::SeqCst), 1);

        socket.disconnect().await;
    }

    #[tokio::test]
    async fn test_intentional_disconnect_does_not_reconnect() {
        let (url, accepts, _) = spawn_ws_server(false).await;
        let socket = ChatSocket::new(test_config(&url));
        let mut rx = socket.subscribe();

        socket.connect("42", "tok-1").await;
        wait_for(&mut rx, |e| matches!(e, SocketEvent::Connected)).await;

        socket.disconnect().await;
        assert_eq!(socket.state().await, SocketState::Closed);

        // Well past the reconnect delay: no new connection may appear.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(accepts.load(Ordering::SeqCst), 1);
        assert_eq!(socket.state().await, SocketState::Closed);
    }

    #[tokio::test]
    async fn test_server_close_triggers_reconnect() {
        let (url, accepts, _) = spawn_ws_server(true).await;
        let socket = ChatSocket::new(test_config(&url));

        socket.connect("42", "tok-1").await;

        // Each accepted connection is closed immediately by the server, so
        // the socket keeps reconnecting on the fixed delay.
        tokio::time::timeout(Duration::from_secs(3), async {
            while accepts.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("no reconnect happened");

        socket.disconnect().await;
    }

    #[tokio::test]
    async fn test_reconnect_attempts_are_bounded() {
        // Grab a port with nothing listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let socket = ChatSocket::new(SocketConfig {
            url: format!("ws://{}", addr),
            reconnect_delay_ms: 10,
            max_reconnect_attempts: 3,
        });

        socket.connect("42", "tok-1").await;

        tokio::time::timeout(Duration::from_secs(3), async {
            while socket.reconnect_attempts() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("attempts never reached the bound");

        // No further attempts past the bound.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(socket.reconnect_attempts(), 3);
        assert_eq!(socket.state().await, SocketState::Closed);
    }

    #[tokio::test]
    async fn test_manual_connect_after_giving_up_starts_over() {
        let (url, accepts, _) = spawn_ws_server(false).await;
        let socket = ChatSocket::new(test_config(&url));
        let mut rx = socket.subscribe();

        socket.connect("42", "tok-1").await;
        wait_for(&mut rx, |e| matches!(e, SocketEvent::Connected)).await;
        socket.disconnect().await;

        // A fresh connect after a closed socket reconnects cleanly.
        socket.connect("42", "tok-2").await;
        wait_for(&mut rx, |e| matches!(e, SocketEvent::Connected)).await;

        assert!(socket.is_open().await);
        assert!(accepts.load(Ordering::SeqCst) >= 2);
        socket.disconnect().await;
    }
}
