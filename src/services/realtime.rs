//! Realtime resync listener for Bookmarkr.
//!
//! Maintains a websocket subscription to the change-notification channel of
//! the bookmarks table. Every decoded insert/update/delete lands on a
//! broadcast channel; the sync layer answers each with a full refetch.
//! The connection heartbeats, reconnects with capped backoff, and can be
//! forced to rejoin via [`RealtimeListener::resubscribe`] when the tab
//! regains visibility.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::store::CHANGE_CHANNEL_CAPACITY;
use crate::types::change::{ChangeEvent, ChangeKind};
use crate::types::errors::RealtimeError;

/// Channel topic carrying bookmarks-table notifications.
pub const BOOKMARKS_TOPIC: &str = "realtime:public:bookmarks";

/// Reserved topic for connection heartbeats.
const HEARTBEAT_TOPIC: &str = "phoenix";

/// Reference assigned to the join frame; its reply acknowledges the
/// subscription.
const JOIN_REF: &str = "1";

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// A single websocket frame of the channel protocol, both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub frame_ref: Option<String>,
}

/// Builds the join frame subscribing to all events on the bookmarks table.
pub fn join_frame() -> Frame {
    Frame {
        topic: BOOKMARKS_TOPIC.to_string(),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": "bookmarks" }
                ]
            }
        }),
        frame_ref: Some(JOIN_REF.to_string()),
    }
}

/// Builds a heartbeat frame with the given reference counter.
pub fn heartbeat_frame(counter: u64) -> Frame {
    Frame {
        topic: HEARTBEAT_TOPIC.to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        frame_ref: Some(counter.to_string()),
    }
}

/// True when the frame acknowledges our join request.
pub fn is_join_ack(frame: &Frame) -> bool {
    frame.event == "phx_reply"
        && frame.frame_ref.as_deref() == Some(JOIN_REF)
        && frame.payload.get("status").and_then(|s| s.as_str()) == Some("ok")
}

/// Decodes a table-change notification, if the frame carries one.
///
/// The record id is taken from `record` for inserts/updates and from
/// `old_record` for deletes; either may be absent on trimmed payloads.
pub fn decode_change(frame: &Frame) -> Option<ChangeEvent> {
    if frame.event != "postgres_changes" {
        return None;
    }
    let data = frame.payload.get("data")?;
    let kind = ChangeKind::parse(data.get("type")?.as_str()?)?;
    let bookmark_id = data
        .get("record")
        .and_then(|r| r.get("id"))
        .or_else(|| data.get("old_record").and_then(|r| r.get("id")))
        .and_then(|id| id.as_str())
        .map(str::to_string);
    Some(ChangeEvent::new(kind, bookmark_id))
}

/// Delay before reconnect attempt `attempt` (1-based): doubles from one
/// second, capped at [`MAX_RECONNECT_DELAY`].
pub fn reconnect_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(10);
    Duration::from_secs(1u64 << exp).min(MAX_RECONNECT_DELAY)
}

fn encode(frame: &Frame) -> Result<String, RealtimeError> {
    serde_json::to_string(frame).map_err(|e| RealtimeError::Protocol(e.to_string()))
}

/// Owns the websocket task and surfaces its state: a broadcast receiver of
/// change events and a watch receiver of the boolean connection status.
pub struct RealtimeListener {
    endpoint: String,
    events: broadcast::Sender<ChangeEvent>,
    connected: Arc<watch::Sender<bool>>,
    resubscribe: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeListener {
    /// Creates a listener with its own change channel.
    pub fn new(endpoint: String) -> Self {
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self::with_publisher(endpoint, events)
    }

    /// Creates a listener publishing into an existing change channel — used
    /// to feed the remote store's `subscribe_changes` receivers.
    pub fn with_publisher(endpoint: String, events: broadcast::Sender<ChangeEvent>) -> Self {
        let (connected, _) = watch::channel(false);
        Self {
            endpoint,
            events,
            connected: Arc::new(connected),
            resubscribe: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }

    /// Starts the connection task. Calling again while it runs is a no-op.
    pub fn spawn(&self) {
        let mut task = self.task_slot();
        if task.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return;
        }
        let endpoint = self.endpoint.clone();
        let events = self.events.clone();
        let connected = Arc::clone(&self.connected);
        let resubscribe = Arc::clone(&self.resubscribe);
        *task = Some(tokio::spawn(run_listener(
            endpoint,
            events,
            connected,
            resubscribe,
        )));
    }

    /// Subscribes to decoded change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Watch side of the boolean connection status, for UI display.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Forces the current connection to drop and rejoin immediately.
    ///
    /// Called on tab-visibility regain to recover from silently dropped
    /// connections.
    pub fn resubscribe(&self) {
        self.resubscribe.notify_one();
    }

    /// Aborts the connection task and marks the feed disconnected.
    pub fn shutdown(&self) {
        if let Some(task) = self.task_slot().take() {
            task.abort();
        }
        let _ = self.connected.send(false);
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RealtimeListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum ConnectionEnd {
    Resubscribe,
    Closed,
}

async fn run_listener(
    endpoint: String,
    events: broadcast::Sender<ChangeEvent>,
    connected: Arc<watch::Sender<bool>>,
    resubscribe: Arc<Notify>,
) {
    let mut attempt: u32 = 0;
    loop {
        match connect_async(endpoint.as_str()).await {
            Ok((socket, _)) => {
                attempt = 0;
                debug!("realtime: connected, joining {}", BOOKMARKS_TOPIC);
                let end = run_connection(socket, &events, &connected, &resubscribe).await;
                let _ = connected.send(false);
                match end {
                    Ok(ConnectionEnd::Resubscribe) => {
                        info!("realtime: resubscribing");
                        continue;
                    }
                    Ok(ConnectionEnd::Closed) => warn!("realtime: connection closed by server"),
                    Err(e) => warn!("realtime: {}", e),
                }
            }
            Err(e) => {
                warn!("realtime: connect failed: {}", e);
            }
        }

        attempt += 1;
        let delay = reconnect_delay(attempt);
        debug!("realtime: retrying in {:?}", delay);
        tokio::select! {
            _ = sleep(delay) => {}
            _ = resubscribe.notified() => {}
        }
    }
}

async fn run_connection(
    socket: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    events: &broadcast::Sender<ChangeEvent>,
    connected: &watch::Sender<bool>,
    resubscribe: &Notify,
) -> Result<ConnectionEnd, RealtimeError> {
    let (mut write, mut read) = socket.split();

    write
        .send(Message::Text(encode(&join_frame())?))
        .await
        .map_err(|e| RealtimeError::Connect(e.to_string()))?;

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    let mut heartbeat_ref: u64 = 1;

    loop {
        tokio::select! {
            _ = resubscribe.notified() => {
                let _ = write.close().await;
                return Ok(ConnectionEnd::Resubscribe);
            }
            _ = heartbeat.tick() => {
                heartbeat_ref += 1;
                write
                    .send(Message::Text(encode(&heartbeat_frame(heartbeat_ref))?))
                    .await
                    .map_err(|e| RealtimeError::Closed(e.to_string()))?;
            }
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => handle_text(&text, events, connected),
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(ConnectionEnd::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(RealtimeError::Closed(e.to_string())),
            }
        }
    }
}

fn handle_text(text: &str, events: &broadcast::Sender<ChangeEvent>, connected: &watch::Sender<bool>) {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("realtime: undecodable frame: {}", e);
            return;
        }
    };

    if is_join_ack(&frame) {
        info!("realtime: subscription to {} acknowledged", frame.topic);
        let _ = connected.send(true);
        return;
    }

    if frame.event == "phx_error" {
        warn!("realtime: channel error on {}", frame.topic);
        let _ = connected.send(false);
        return;
    }

    if let Some(event) = decode_change(&frame) {
        debug!("realtime: {:?} for {:?}", event.kind, event.bookmark_id);
        let _ = events.send(event);
    }
}
