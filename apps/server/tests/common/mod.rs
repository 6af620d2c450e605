//! Common test utilities for server integration tests
//!
//! Provides an in-process router for request-level tests and a real
//! listener plus WebSocket client for end-to-end session tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use watchwithfriends_server::websocket::messages::ServerMessage;
use watchwithfriends_server::{build_router, spawn_reconciler, Config, SessionCoordinator};

/// How long a client waits for any single frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Router over a fresh coordinator, without a listener
pub fn test_app() -> (Router, SessionCoordinator) {
    let coordinator = SessionCoordinator::new();
    let app = build_router(coordinator.clone(), &Config::default());
    (app, coordinator)
}

/// Issue one GET against the router
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Read a response body as text
pub async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// A server bound to an ephemeral loopback port
pub struct TestServer {
    pub addr: SocketAddr,
    pub coordinator: SessionCoordinator,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Start the server with the given reconciliation period
    pub async fn start(reconcile_interval: Duration) -> Self {
        let coordinator = SessionCoordinator::new();
        let shutdown = CancellationToken::new();
        let config = Config {
            reconcile_interval,
            ..Config::default()
        };

        spawn_reconciler(coordinator.clone(), reconcile_interval, shutdown.clone());

        let app = build_router(coordinator.clone(), &config);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .unwrap();
        });

        Self {
            addr,
            coordinator,
            shutdown,
        }
    }

    /// Open a WebSocket client against `path`
    pub async fn connect(&self, path: &str) -> TestClient {
        let url = format!("ws://{}{}", self.addr, path);
        let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        TestClient { stream }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// WebSocket client speaking the session protocol
pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Send a raw JSON value as a text frame
    pub async fn send_json(&mut self, value: serde_json::Value) {
        self.stream
            .send(Message::Text(value.to_string()))
            .await
            .unwrap();
    }

    /// Send a non-text frame (binary, ping...)
    pub async fn send_frame(&mut self, frame: Message) {
        self.stream.send(frame).await.unwrap();
    }

    /// Next server message, panicking on timeout or close
    pub async fn recv(&mut self) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .unwrap();

            match frame {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    /// Next message that is not a periodic time correction
    pub async fn recv_event(&mut self) -> ServerMessage {
        loop {
            match self.recv().await {
                ServerMessage::TimeCorrection(_) => continue,
                other => return other,
            }
        }
    }

    /// Skip messages until `pick` accepts one
    pub async fn recv_until<T>(&mut self, mut pick: impl FnMut(ServerMessage) -> Option<T>) -> T {
        loop {
            if let Some(found) = pick(self.recv().await) {
                return found;
            }
        }
    }

    /// Close the connection from the client side
    pub async fn close(mut self) {
        self.stream.close(None).await.unwrap();
    }
}
