//! Identity-detection events pushed over a WebSocket.
//!
//! The listener owns one background task that reads the socket until it is
//! closed from either side. Nothing is retried: a dropped connection ends
//! the stream of events and is only logged.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::context::ServerEndpoint;
use crate::error::{ClientError, Result};
use crate::wire;

pub const NOTIFICATIONS_PATH: &str = "/ws/notifications/";
pub const UNKNOWN_IDENTITY: &str = "Unknown";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub camera_id: String,
    pub identity: String,
    #[serde(default)]
    pub confidence: f64,
}

impl NotificationEvent {
    pub fn is_unknown(&self) -> bool {
        self.identity == UNKNOWN_IDENTITY
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Camera ID: {} - Identity: {}, Confidence: {:.2}%",
            self.camera_id,
            self.identity,
            self.confidence * 100.0
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    Detection(NotificationEvent),
    /// The unknown counter reached the configured threshold and was reset.
    Escalation { camera_id: String, count: u64 },
}

#[derive(Debug, Clone)]
pub struct ListenerOptions {
    pub path: String,
    /// `None` keeps escalation off; unknowns are only counted.
    pub unknown_alert_threshold: Option<u32>,
    pub buffer: usize,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            path: NOTIFICATIONS_PATH.to_string(),
            unknown_alert_threshold: None,
            buffer: 64,
        }
    }
}

#[derive(Debug, Default)]
pub struct ListenerStats {
    received: AtomicU64,
    unknown: AtomicU64,
}

impl ListenerStats {
    /// Messages successfully parsed.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Unknown identities seen since the last escalation.
    pub fn unknown(&self) -> u64 {
        self.unknown.load(Ordering::Relaxed)
    }

    fn record(&self, event: &NotificationEvent, threshold: Option<u32>) -> Option<u64> {
        self.received.fetch_add(1, Ordering::Relaxed);
        if !event.is_unknown() {
            return None;
        }
        let count = self.unknown.fetch_add(1, Ordering::Relaxed) + 1;
        match threshold {
            Some(t) if t > 0 && count >= u64::from(t) => {
                self.unknown.store(0, Ordering::Relaxed);
                Some(count)
            }
            _ => None,
        }
    }
}

pub struct NotificationListener {
    events: mpsc::Receiver<ListenerEvent>,
    stats: Arc<ListenerStats>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NotificationListener {
    pub async fn connect(endpoint: &ServerEndpoint, opts: ListenerOptions) -> Result<Self> {
        if !endpoint.is_configured() {
            return Err(ClientError::NotConfigured);
        }
        let url = endpoint.ws_url(&opts.path);
        let (socket, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        log::info!("listening for notifications on {url}");

        let (tx, rx) = mpsc::channel(opts.buffer.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stats = Arc::new(ListenerStats::default());
        let task = tokio::spawn(read_loop(
            socket,
            tx,
            shutdown_rx,
            Arc::clone(&stats),
            opts.unknown_alert_threshold,
        ));

        Ok(Self {
            events: rx,
            stats,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Next event, or `None` once the socket has ended.
    pub async fn next_event(&mut self) -> Option<ListenerEvent> {
        self.events.recv().await
    }

    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Close the socket and wait for the reader to stop. No message is
    /// processed after this returns.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("notification reader ended abnormally: {e}");
            }
        }
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn read_loop(
    mut socket: Socket,
    tx: mpsc::Sender<ListenerEvent>,
    mut shutdown: oneshot::Receiver<()>,
    stats: Arc<ListenerStats>,
    threshold: Option<u32>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => return close_socket(&mut socket).await,
            msg = socket.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    // A slow consumer holds the reader back; nothing is dropped.
                    for event in on_text(text.as_str(), &stats, threshold) {
                        tokio::select! {
                            biased;
                            _ = &mut shutdown => return close_socket(&mut socket).await,
                            sent = tx.send(event) => {
                                if sent.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    log::info!("notification socket closed by server: {frame:?}");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::error!("notification socket error: {e}");
                    return;
                }
                None => {
                    log::info!("notification socket ended");
                    return;
                }
            }
        }
    }
}

async fn close_socket(socket: &mut Socket) {
    if let Err(e) = socket.close(None).await {
        log::debug!("closing notification socket: {e}");
    }
    log::info!("notification socket closed");
}

fn on_text(text: &str, stats: &ListenerStats, threshold: Option<u32>) -> Vec<ListenerEvent> {
    let event: NotificationEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("ignoring malformed notification {text:?}: {e}");
            return Vec::new();
        }
    };
    log::debug!("received notification: {event}");

    let escalation = stats.record(&event, threshold).map(|count| ListenerEvent::Escalation {
        camera_id: event.camera_id.clone(),
        count,
    });
    let mut events = vec![ListenerEvent::Detection(event)];
    events.extend(escalation);
    events
}
