use crate::error::ViewerError;
use crate::models::websocket::{ ChannelState, LiveEvent };
use crate::store::StoreUpdate;
use async_trait::async_trait;
use futures::{ SinkExt, StreamExt };
use log::{ debug, error, info, warn };
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{ mpsc, watch };
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::{ Message, WebSocketConfig };
use tokio_tungstenite::{ connect_async_with_config, MaybeTlsStream, WebSocketStream };
use url::Url;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(3000);
/// Frames larger than this fail the connection instead of being delivered.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// An open push connection yielding the text payloads sent by the server.
#[async_trait]
pub trait Connection: Send {
    /// Next text payload; `None` once the connection is closed.
    async fn next_text(&mut self) -> Option<Result<String, ViewerError>>;

    async fn close(&mut self);
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>, ViewerError>;
}

pub struct WsConnector {
    url: Url,
    max_message_size: usize,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self::with_max_message_size(url, DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(url: Url, max_message_size: usize) -> Self {
        Self { url, max_message_size }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, ViewerError> {
        let config = WebSocketConfig {
            max_message_size: Some(self.max_message_size),
            ..Default::default()
        };
        let (stream, _response) = connect_async_with_config(
            self.url.as_str(),
            Some(config),
            false
        ).await?;
        Ok(Box::new(WsConnection { stream, url: self.url.clone() }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: Url,
}

#[async_trait]
impl Connection for WsConnection {
    async fn next_text(&mut self) -> Option<Result<String, ViewerError>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(message) => {
                    match message {
                        Message::Text(text) => {
                            return Some(Ok(text));
                        }
                        Message::Close(_) => {
                            info!("Received close frame from {}", self.url);
                            return None;
                        }
                        Message::Ping(ping_data) => {
                            if let Err(e) = self.stream.send(Message::Pong(ping_data)).await {
                                return Some(Err(e.into()));
                            }
                        }
                        Message::Pong(_) => {}
                        Message::Binary(_) => {
                            warn!("Ignoring binary message from {}", self.url);
                        }
                        Message::Frame(_) => {}
                    }
                }
                Err(e) => {
                    match e {
                        | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                        | tokio_tungstenite::tungstenite::Error::AlreadyClosed => {
                            info!("WebSocket connection to {} closed", self.url);
                            return None;
                        }
                        tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                            io_err.kind() == std::io::ErrorKind::ConnectionReset
                        => {
                            info!("WebSocket connection reset by {}", self.url);
                            return None;
                        }
                        _ => {
                            return Some(Err(e.into()));
                        }
                    }
                }
            }
        }
        None
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Error while closing connection to {}: {}", self.url, e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, interval: DEFAULT_RETRY_INTERVAL }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Connection attempts made this session against a fixed-interval policy.
///
/// The budget covers the whole session: a connection that opens and later
/// drops has still used its attempt.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// What to do once the current attempt failed or its connection closed.
    pub fn after_disconnect(&self) -> RetryDecision {
        if self.attempts >= self.policy.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.policy.interval)
        }
    }
}

enum SessionEnd {
    Shutdown,
    Closed,
    ConsumerGone,
}

/// Keeps one logical connection to the server's chat list socket and forwards
/// every recognised event to the store queue.
pub struct LiveChannel {
    connector: Arc<dyn Connector>,
    retry: RetryState,
    updates: mpsc::UnboundedSender<StoreUpdate>,
    state: ChannelState,
}

impl LiveChannel {
    pub fn new(
        connector: Arc<dyn Connector>,
        policy: RetryPolicy,
        updates: mpsc::UnboundedSender<StoreUpdate>
    ) -> Self {
        Self {
            connector,
            retry: RetryState::new(policy),
            updates,
            state: ChannelState::Disconnected,
        }
    }

    pub fn spawn(
        connector: Arc<dyn Connector>,
        policy: RetryPolicy,
        updates: mpsc::UnboundedSender<StoreUpdate>
    ) -> LiveChannelHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let channel = Self::new(connector, policy, updates);
        let task = tokio::spawn(channel.run(shutdown_rx));
        LiveChannelHandle { shutdown: shutdown_tx, task: Some(task) }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(ChannelState::Connecting);
            let attempt_no = self.retry.begin_attempt();
            let attempt = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = self.connector.connect() => result,
            };

            match attempt {
                Ok(mut connection) => {
                    info!("Live channel connected (attempt {})", attempt_no);
                    self.set_state(ChannelState::Connected);
                    let end = self.pump(connection.as_mut(), &mut shutdown).await;
                    connection.close().await;
                    match end {
                        SessionEnd::Shutdown => {
                            break;
                        }
                        SessionEnd::ConsumerGone => {
                            info!("Update consumer is gone; stopping live channel");
                            return;
                        }
                        SessionEnd::Closed => {
                            warn!("Live channel connection closed");
                        }
                    }
                }
                Err(e) => {
                    warn!("Live channel connection attempt {} failed: {}", attempt_no, e);
                }
            }

            self.set_state(ChannelState::Disconnected);
            match self.retry.after_disconnect() {
                RetryDecision::GiveUp => {
                    error!(
                        "Live channel giving up after {} connection attempts",
                        self.retry.attempts()
                    );
                    self.set_state(ChannelState::Failed);
                    return;
                }
                RetryDecision::RetryAfter(delay) => {
                    info!("Retrying live channel in {:?} (attempt {} ended)", delay, attempt_no);
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
        self.set_state(ChannelState::Disconnected);
    }

    async fn pump(
        &mut self,
        connection: &mut dyn Connection,
        shutdown: &mut watch::Receiver<bool>
    ) -> SessionEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                next = connection.next_text() => next,
            };

            let text = match next {
                None => {
                    return SessionEnd::Closed;
                }
                Some(Err(e)) => {
                    warn!("Live channel error: {}", e);
                    return SessionEnd::Closed;
                }
                Some(Ok(text)) => text,
            };

            match LiveEvent::parse(&text) {
                Ok(LiveEvent::Unrecognized) => {
                    debug!("Ignoring event with unrecognised frontend_type: {}", text);
                }
                Ok(event) => {
                    if self.updates.send(StoreUpdate::Live(event)).is_err() {
                        return SessionEnd::ConsumerGone;
                    }
                }
                Err(e) => {
                    warn!("Dropping malformed live event: {}", e);
                }
            }
        }
    }

    fn set_state(&mut self, state: ChannelState) {
        if self.state == state {
            return;
        }
        debug!("Live channel state {:?} -> {:?}", self.state, state);
        self.state = state;
        if self.updates.send(StoreUpdate::Channel(state)).is_err() {
            debug!("Update consumer is gone; state change not delivered");
        }
    }
}

/// Owner of a running live channel. Closing or dropping it stops the channel
/// and any pending retry.
pub struct LiveChannelHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LiveChannelHandle {
    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Live channel task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for LiveChannelHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
