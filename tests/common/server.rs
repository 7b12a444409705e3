//! Local HTTP server for exercising quests end to end

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{Form, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const USER: &str = "ada";
pub const PASSWORD: &str = "lovelace";
pub const TOKEN: &str = "tok-8c1f";

/// A running test server; aborted on drop
pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start the server on an ephemeral port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router())
                .await
                .expect("Test server failed");
        });
        Self { addr, handle }
    }

    /// `host:port` of the server, for use as a bundle item
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let port = listener.local_addr().expect("Failed to read local addr").port();
    drop(listener);
    port
}

fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/echo", post(echo))
        .route("/status/{code}", get(status))
}

/// Form login; answers with a token header and a session in the body
async fn login(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    let valid = form.get("user").map(String::as_str) == Some(USER)
        && form.get("pass").map(String::as_str) == Some(PASSWORD);
    if !valid {
        return (StatusCode::UNAUTHORIZED, "denied").into_response();
    }
    (
        [("X-Token", TOKEN)],
        Json(json!({ "session": { "id": "s-1", "user": USER } })),
    )
        .into_response()
}

/// Requires `Authorization: Bearer <token>`
async fn me(headers: HeaderMap) -> impl IntoResponse {
    let expected = format!("Bearer {TOKEN}");
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }
    let agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "name": USER, "agent": agent })).into_response()
}

async fn echo(Form(form): Form<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(form)
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, format!("status {code}"))
}
