//! Reconnecting WebSocket connection.
//!
//! A single task owns the socket and reacts to one thing at a time: a command
//! from a handle, the in-flight open finishing, an inbound frame, or the
//! reconnect timer firing. Nothing outside the task touches the socket.

use crate::{ClientConfig, ClientError};
use futures_util::{SinkExt, StreamExt};
use infinity_core::{ClientMessage, ConnectionState};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Channel = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingOpen = Pin<Box<dyn Future<Output = Result<Channel, tungstenite::Error>> + Send>>;

/// Notifications from the connection task, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The channel opened.
    Established,
    /// The channel dropped; a reconnect fires after `retry_in`.
    Lost { retry_in: Duration },
    /// A text payload arrived.
    Frame(String),
}

#[derive(Debug)]
enum Command {
    Connect,
    Send(String),
    Shutdown,
}

/// Cheap, cloneable access to a running [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    /// Open a fresh channel, closing the current one first.
    pub fn connect(&self) {
        if self.commands.send(Command::Connect).is_err() {
            tracing::warn!("connect requested after shutdown");
        }
    }

    /// Serialize and transmit `message`.
    ///
    /// Only transmits while connected. Otherwise the message is dropped, not
    /// queued, and `NotConnected` is returned.
    pub fn send(&self, message: &ClientMessage) -> Result<(), ClientError> {
        if self.state() != ConnectionState::Connected {
            tracing::warn!(kind = message.kind(), "not connected, dropping request");
            return Err(ClientError::NotConnected);
        }
        let text = serde_json::to_string(message)?;
        self.commands
            .send(Command::Send(text))
            .map_err(|_| ClientError::Closed)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// Owner of the connection task.
///
/// Dropping the manager without calling [`shutdown`](Self::shutdown) leaves
/// the task running for as long as any [`ConnectionHandle`] is alive; once
/// the last one goes away the task tears down on its own.
pub struct ConnectionManager {
    handle: ConnectionHandle,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Start the connection task. Nothing connects until [`connect`](Self::connect).
    ///
    /// The returned receiver is the single event subscription.
    pub fn spawn(config: ClientConfig) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let worker = Worker {
            config,
            commands: command_rx,
            events: event_tx,
            state: state_tx,
            channel: None,
            opening: None,
            reconnect: None,
            teardown: false,
        };
        let task = tokio::spawn(worker.run());

        let handle = ConnectionHandle {
            commands: command_tx,
            state: state_rx,
        };
        (Self { handle, task }, event_rx)
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    pub fn connect(&self) {
        self.handle.connect();
    }

    pub fn send(&self, message: &ClientMessage) -> Result<(), ClientError> {
        self.handle.send(message)
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    /// Stop reconnecting, close the channel and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.handle.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!("connection task ended abnormally: {}", e);
        }
    }
}

struct Worker {
    config: ClientConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    state: watch::Sender<ConnectionState>,
    channel: Option<Channel>,
    opening: Option<PendingOpen>,
    reconnect: Option<Pin<Box<Sleep>>>,
    teardown: bool,
}

impl Worker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect) => self.connect().await,
                    Some(Command::Send(text)) => self.transmit(text).await,
                    Some(Command::Shutdown) | None => {
                        self.shutdown().await;
                        break;
                    }
                },

                opened = wait_open(&mut self.opening) => {
                    self.opening = None;
                    match opened {
                        Ok(channel) => self.on_open(channel),
                        Err(e) => {
                            tracing::warn!("failed to connect to {}: {}", self.config.endpoint, e);
                            self.on_lost();
                        }
                    }
                }

                frame = next_frame(&mut self.channel) => self.on_frame(frame).await,

                () = wait_reconnect(&mut self.reconnect) => {
                    self.reconnect = None;
                    tracing::info!("reconnecting");
                    self.connect().await;
                }
            }
        }
    }

    async fn connect(&mut self) {
        if self.teardown {
            return;
        }
        self.reconnect = None;
        self.opening = None;
        if let Some(channel) = self.channel.take() {
            tracing::debug!("closing current channel before reconnecting");
            self.close(channel).await;
        }

        tracing::info!("connecting to {}", self.config.endpoint);
        self.set_state(ConnectionState::Connecting);

        let endpoint = self.config.endpoint.clone();
        self.opening = Some(Box::pin(async move {
            tokio_tungstenite::connect_async(endpoint)
                .await
                .map(|(channel, _response)| channel)
        }));
    }

    fn on_open(&mut self, channel: Channel) {
        tracing::info!("connection established");
        self.channel = Some(channel);
        self.set_state(ConnectionState::Connected);
        self.emit(ConnectionEvent::Established);
    }

    async fn on_frame(&mut self, frame: Option<Result<Message, tungstenite::Error>>) {
        match frame {
            Some(Ok(Message::Text(text))) => {
                self.emit(ConnectionEvent::Frame(text.as_str().to_owned()));
            }
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(text) => self.emit(ConnectionEvent::Frame(text)),
                Err(_) => tracing::warn!("skipping {} byte binary frame", data.len()),
            },
            Some(Ok(Message::Close(frame))) => {
                tracing::info!("server closed the connection: {:?}", frame);
                // Flush the close reply tungstenite queued.
                if let Some(channel) = self.channel.take() {
                    self.close(channel).await;
                }
                self.on_lost();
            }
            // Ping/pong are answered by tungstenite itself.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!("connection error: {}", e);
                self.on_lost();
            }
            None => {
                tracing::info!("connection closed");
                self.on_lost();
            }
        }
    }

    /// Close and error are handled the same way.
    fn on_lost(&mut self) {
        self.channel = None;
        self.opening = None;
        self.set_state(ConnectionState::Disconnected);
        if self.teardown {
            return;
        }

        let delay = self.config.reconnect_delay;
        tracing::warn!("connection lost, reconnecting in {:?}", delay);
        self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
        self.emit(ConnectionEvent::Lost { retry_in: delay });
    }

    async fn transmit(&mut self, text: String) {
        let Some(channel) = self.channel.as_mut() else {
            tracing::warn!("channel not open, dropping request");
            return;
        };
        let sent = tokio::time::timeout(
            self.config.send_timeout,
            channel.send(Message::Text(text.into())),
        )
        .await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("send failed: {}", e);
                self.on_lost();
            }
            Err(_) => {
                let stalled = self.config.send_timeout;
                tracing::warn!("send stalled for {:?}, dropping channel", stalled);
                self.on_lost();
            }
        }
    }

    /// Best-effort close, bounded by the send timeout.
    async fn close(&mut self, mut channel: Channel) {
        match tokio::time::timeout(self.config.send_timeout, channel.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("close failed: {}", e),
            Err(_) => tracing::debug!("close timed out"),
        }
    }

    async fn shutdown(&mut self) {
        self.teardown = true;
        self.reconnect = None;
        self.opening = None;
        if let Some(channel) = self.channel.take() {
            self.close(channel).await;
        }
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("connection manager shut down");
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("state {:?} -> {:?}", previous, state);
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }
}

async fn wait_open(opening: &mut Option<PendingOpen>) -> Result<Channel, tungstenite::Error> {
    match opening {
        Some(open) => open.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(channel: &mut Option<Channel>) -> Option<Result<Message, tungstenite::Error>> {
    match channel {
        Some(channel) => channel.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_reconnect(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
