//! E2E tests: live build updates over `/ws`.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kernelforge_lib::models::BuildConfig;
use kernelforge_lib::services::ConnectionRegistry;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::test_helpers::*;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("WebSocket handshake");
    ws
}

async fn next_message(ws: &mut WsClient) -> Message {
    tokio::time::timeout(FRAME_TIMEOUT, ws.next())
        .await
        .expect("frame before timeout")
        .expect("connection open")
        .expect("valid frame")
}

/// Read frames until the next `buildUpdate` text frame.
async fn next_update(ws: &mut WsClient) -> Value {
    loop {
        if let Message::Text(text) = next_message(ws).await {
            return serde_json::from_str(text.as_str()).expect("update is JSON");
        }
    }
}

#[actix_rt::test]
async fn test_submit_streams_updates_to_client() {
    let service = instant_service();
    let connections = ConnectionRegistry::new();
    let (addr, handle) = start_ws_server(service.clone(), connections.clone()).unwrap();
    let mut ws = connect(addr).await;

    let job = service
        .submit_build(BuildConfig::for_device("OnePlus 7"))
        .unwrap();
    let id = job.id.to_string();

    let mut events = Vec::new();
    loop {
        let update = next_update(&mut ws).await;
        assert_eq!(update["type"], "buildUpdate");
        assert_eq!(update["buildJobId"], id.as_str());
        let event = update["event"].as_str().unwrap().to_string();
        events.push(event.clone());
        if event == "completed" {
            assert_eq!(update["status"], "completed");
            assert_eq!(update["progress"], 100);
            assert!(update["outputFiles"].is_array());
            break;
        }
    }
    assert_eq!(events.first().map(String::as_str), Some("created"));
    assert!(events.iter().any(|e| e == "updated"));

    handle.stop(true).await;
}

#[actix_rt::test]
async fn test_subscribe_hides_other_builds() {
    let service = stalled_service();
    let connections = ConnectionRegistry::new();
    let (addr, handle) = start_ws_server(service.clone(), connections.clone()).unwrap();
    let mut ws = connect(addr).await;

    let watched = service
        .submit_build(BuildConfig::for_device("OnePlus 7"))
        .unwrap();
    ws.send(Message::text(
        json!({ "action": "subscribe", "buildJobId": watched.id }).to_string(),
    ))
    .await
    .unwrap();

    // Frames are handled in order, so the pong confirms the subscribe was applied.
    ws.send(Message::Ping(Default::default())).await.unwrap();
    while !matches!(next_message(&mut ws).await, Message::Pong(_)) {}

    let other = service
        .submit_build(BuildConfig::for_device("Pixel 6"))
        .unwrap();
    assert!(service.cancel_build(other.id));
    assert!(service.cancel_build(watched.id));

    let watched_id = watched.id.to_string();
    loop {
        let update = next_update(&mut ws).await;
        assert_eq!(
            update["buildJobId"],
            watched_id.as_str(),
            "received an update for an unsubscribed build: {}",
            update
        );
        if update["event"] == "cancelled" {
            break;
        }
    }

    handle.stop(true).await;
}

#[actix_rt::test]
async fn test_connection_unregistered_after_close() {
    let connections = ConnectionRegistry::new();
    let (addr, handle) = start_ws_server(instant_service(), connections.clone()).unwrap();

    let mut ws = connect(addr).await;
    assert_eq!(connections.len(), 1);

    ws.close(None).await.unwrap();
    for _ in 0..200 {
        if connections.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(connections.len(), 0);

    handle.stop(true).await;
}
