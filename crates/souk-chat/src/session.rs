//! One open chat surface: HTTP history merged with the live stream.

use crate::error::{ChatError, ChatResult};
use crate::log::{ChatMessage, MessageLog};
use souk_auth::ApiClient;
use souk_realtime::{ChatSocket, ConnectionStatus, Sender, SocketEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A conversation with one counterpart.
///
/// Opening a session fetches the message history over HTTP, connects the
/// realtime transport and spawns an event pump that folds connection and
/// chat events into the shared [`MessageLog`].
pub struct ChatSession {
    socket: Arc<ChatSocket>,
    counterpart_id: String,
    log: Arc<Mutex<MessageLog>>,
    connected: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl ChatSession {
    pub async fn open(
        api: Arc<ApiClient>,
        socket: Arc<ChatSocket>,
        counterpart_id: &str,
    ) -> ChatResult<Self> {
        let Some(token) = api.store().access_token()? else {
            return Err(ChatError::Auth(souk_auth::AuthError::SessionExpired));
        };

        let response = api
            .get(&format!("chat/{}/messages/", counterpart_id))
            .await?;
        if !response.status().is_success() {
            return Err(ChatError::Protocol(format!(
                "history fetch returned {}",
                response.status()
            )));
        }
        let history: Vec<souk_realtime::ChatFrame> = response
            .json()
            .await
            .map_err(|e| ChatError::Protocol(format!("bad history response: {}", e)))?;

        let log = Arc::new(Mutex::new(MessageLog::new()));
        {
            let mut log = log.lock().unwrap();
            for frame in history {
                log.upsert(frame.into());
            }
            debug!(counterpart_id, count = log.len(), "Seeded chat history");
        }

        let connected = Arc::new(AtomicBool::new(false));

        // Subscribe before connecting so the Connected event is not missed.
        let mut rx = socket.subscribe();
        let pump_log = log.clone();
        let pump_connected = connected.clone();
        let pump = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(SocketEvent::Connected) => {
                        pump_connected.store(true, Ordering::SeqCst);
                    }
                    Ok(SocketEvent::Disconnected(_)) => {
                        pump_connected.store(false, Ordering::SeqCst);
                    }
                    Ok(SocketEvent::Status(status)) => {
                        pump_connected
                            .store(status == ConnectionStatus::Connected, Ordering::SeqCst);
                    }
                    Ok(SocketEvent::Message(frame)) => {
                        pump_log.lock().unwrap().upsert(frame.into());
                    }
                    Ok(SocketEvent::Error(e)) => {
                        warn!(error = %e, "Chat socket error");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Chat event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        socket.connect(counterpart_id, &token).await;

        Ok(Self {
            socket,
            counterpart_id: counterpart_id.to_string(),
            log,
            connected,
            pump: Some(pump),
        })
    }

    /// Send a message. Fails with `NotConnected` while the transport is not
    /// open; nothing is appended in that case. On success the message is
    /// appended optimistically under its correlation id, which also dedupes
    /// the server's echo of the same frame.
    pub async fn send(&self, body: &str) -> ChatResult<String> {
        let message_id = self.socket.send_chat(body).await?;
        self.log.lock().unwrap().upsert(ChatMessage {
            id: message_id.clone(),
            body: body.to_string(),
            sender: Sender::Own,
            timestamp: None,
        });
        Ok(message_id)
    }

    /// Snapshot of the rendered log.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.log.lock().unwrap().messages().to_vec()
    }

    /// Whether the live transport is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn counterpart_id(&self) -> &str {
        &self.counterpart_id
    }

    /// Close the surface: stop the pump and disconnect the transport,
    /// cancelling any pending reconnect.
    pub async fn close(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.socket.disconnect().await;
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
