//! Smoke tests for the HTTP introspection surface.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::SinkExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use gemrush_core::net::messages::{ClientMessage, JoinRoomMsg};
use gemrush_core::net::protocol::{PROTOCOL_VERSION, encode_client_message};
use gemrush_server::build_app;
use gemrush_server::config::{RoomsConfig, ServerConfig};

#[tokio::test]
async fn healthz_reports_healthy() {
    let (app, _state) = build_app(ServerConfig::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["rooms"]["active"], 0);
}

#[tokio::test]
async fn monitor_lists_an_active_room() {
    let config = ServerConfig {
        rooms: RoomsConfig {
            max_players: 2,
            tick_interval_ms: 10,
            ..RoomsConfig::default()
        },
        ..ServerConfig::default()
    };
    let (app, _state) = build_app(config);

    // Serve one clone; probe the other. Both share the AppState.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let served = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, served).await.unwrap();
    });

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    let join = ClientMessage::JoinRoom(JoinRoomMsg {
        player_name: "Alice".to_string(),
        protocol_version: PROTOCOL_VERSION,
    });
    ws.send(Message::Binary(
        encode_client_message(&join).unwrap().into(),
    ))
    .await
    .unwrap();

    // Give the join a moment to land.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let rooms = loop {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/monitor")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rooms: serde_json::Value = serde_json::from_slice(&body).unwrap();
        if !rooms.as_array().unwrap().is_empty() {
            break rooms;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "room never appeared in /monitor"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    let room = &rooms[0];
    assert_eq!(room["players"], 1);
    assert_eq!(room["capacity"], 2);
    assert_eq!(room["locked"], false);
    assert_eq!(room["phase"], "Waiting");
}
