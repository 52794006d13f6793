//! Connection manager against a local WebSocket server.

use futures_util::{SinkExt, StreamExt};
use infinity_client::{
    ClientConfig, ClientError, ClientMessage, ConnectionEvent, ConnectionManager, ConnectionState,
    Session,
};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, endpoint)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn next_event(events: &mut UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
    timeout(WAIT, events.recv()).await.unwrap().unwrap()
}

async fn no_connection_within(listener: &TcpListener, window: Duration) {
    assert!(
        timeout(window, listener.accept()).await.is_err(),
        "unexpected reconnect"
    );
}

fn text(frame: &str) -> Message {
    Message::Text(frame.to_owned().into())
}

fn config(endpoint: String, delay_ms: u64) -> ClientConfig {
    ClientConfig::new(endpoint).with_reconnect_delay(Duration::from_millis(delay_ms))
}

#[tokio::test]
async fn exchanges_frames_once_connected() {
    let (listener, endpoint) = listen().await;
    let (manager, mut events) = ConnectionManager::spawn(config(endpoint, 100));
    manager.connect();

    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);
    assert_eq!(manager.state(), ConnectionState::Connected);

    manager.send(&ClientMessage::chat("hello", None)).unwrap();
    let received = timeout(WAIT, server.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(
        received.into_text().unwrap().as_str(),
        r#"{"type":"chat","payload":{"prompt":"hello"}}"#
    );

    server
        .send(text(r#"{"type":"system","payload":{"message":"Node online"}}"#))
        .await
        .unwrap();
    server.send(text("not json")).await.unwrap();

    let mut session = Session::new();
    session.apply(next_event(&mut events).await);
    session.apply(next_event(&mut events).await);
    assert_eq!(session.system_log()[0].text, "Node online");
    assert_eq!(session.chat()[0].text, "not json");

    manager.shutdown().await;
}

#[tokio::test]
async fn send_while_disconnected_is_dropped() {
    let (listener, endpoint) = listen().await;
    let (manager, _events) = ConnectionManager::spawn(config(endpoint, 100));

    let result = manager.send(&ClientMessage::synth("bass"));
    assert!(matches!(result, Err(ClientError::NotConnected)));
    no_connection_within(&listener, Duration::from_millis(200)).await;

    manager.shutdown().await;
}

#[tokio::test]
async fn failed_open_schedules_default_delay() {
    let (listener, endpoint) = listen().await;
    drop(listener);

    let (manager, mut events) = ConnectionManager::spawn(ClientConfig::new(endpoint));
    manager.connect();

    assert_eq!(
        next_event(&mut events).await,
        ConnectionEvent::Lost {
            retry_in: Duration::from_millis(5000)
        }
    );
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    manager.shutdown().await;
}

#[tokio::test]
async fn default_delay_fires_one_attempt() {
    let (listener, endpoint) = listen().await;
    drop(listener);

    let (manager, mut events) = ConnectionManager::spawn(ClientConfig::new(endpoint));
    manager.connect();
    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::Lost { .. }
    ));

    // No other timers may be live from here on: the clock only moves when told.
    tokio::time::pause();
    tokio::time::advance(Duration::from_millis(4900)).await;
    tokio::task::yield_now().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(events.try_recv().is_err());

    tokio::time::advance(Duration::from_millis(200)).await;
    assert_eq!(
        events.recv().await.unwrap(),
        ConnectionEvent::Lost {
            retry_in: Duration::from_millis(5000)
        }
    );
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    tokio::task::yield_now().await;
    assert!(events.try_recv().is_err());

    manager.shutdown().await;
}

#[tokio::test]
async fn server_close_is_answered() {
    let (listener, endpoint) = listen().await;
    let (manager, mut events) = ConnectionManager::spawn(config(endpoint, 1000));
    manager.connect();

    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);

    server.send(Message::Close(None)).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::Lost { .. }
    ));
    let reply = timeout(WAIT, server.next()).await.unwrap();
    assert!(matches!(reply, Some(Ok(Message::Close(_)))));

    manager.shutdown().await;
}

#[tokio::test]
async fn stalled_peer_does_not_block_shutdown() {
    let (listener, endpoint) = listen().await;
    let config = config(endpoint, 1000).with_send_timeout(Duration::from_millis(200));
    let (manager, mut events) = ConnectionManager::spawn(config);
    manager.connect();

    // Accepted but never read, so the socket buffers fill up.
    let _server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);

    let prompt = "x".repeat(1 << 20);
    for _ in 0..64 {
        manager.send(&ClientMessage::chat(prompt.as_str(), None)).unwrap();
    }

    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::Lost { .. }
    ));
    assert!(timeout(WAIT, manager.shutdown()).await.is_ok());
}

#[tokio::test]
async fn reconnects_once_after_server_drop() {
    let (listener, endpoint) = listen().await;
    let (manager, mut events) = ConnectionManager::spawn(config(endpoint, 300));
    manager.connect();

    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);

    server.close(None).await.unwrap();
    drop(server);

    assert_eq!(
        next_event(&mut events).await,
        ConnectionEvent::Lost {
            retry_in: Duration::from_millis(300)
        }
    );
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    let _server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);
    assert_eq!(manager.state(), ConnectionState::Connected);

    no_connection_within(&listener, Duration::from_millis(700)).await;
    manager.shutdown().await;
}

#[tokio::test]
async fn shutdown_prevents_reconnect() {
    let (listener, endpoint) = listen().await;
    let (manager, mut events) = ConnectionManager::spawn(config(endpoint, 50));
    let handle = manager.handle();
    manager.connect();

    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);

    manager.shutdown().await;
    assert_eq!(handle.state(), ConnectionState::Disconnected);

    // The client's close reaches the server, then the socket goes away.
    while let Ok(Some(Ok(_))) = timeout(WAIT, server.next()).await {}
    no_connection_within(&listener, Duration::from_millis(300)).await;
    assert!(matches!(
        handle.send(&ClientMessage::save_state()),
        Err(ClientError::NotConnected)
    ));
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn shutdown_cancels_pending_reconnect() {
    let (listener, endpoint) = listen().await;
    let (manager, mut events) = ConnectionManager::spawn(config(endpoint, 200));
    manager.connect();

    let server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);
    drop(server);
    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::Lost { .. }
    ));

    manager.shutdown().await;
    no_connection_within(&listener, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn manual_connect_replaces_channel() {
    let (listener, endpoint) = listen().await;
    let (manager, mut events) = ConnectionManager::spawn(config(endpoint, 100));
    manager.connect();

    let mut first = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);

    manager.connect();
    let _second = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Established);

    // The old channel was closed on purpose: no Lost, no extra reconnect.
    let closing = timeout(WAIT, first.next()).await.unwrap();
    assert!(matches!(closing, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
    no_connection_within(&listener, Duration::from_millis(300)).await;
    assert!(events.try_recv().is_err());

    manager.shutdown().await;
}
