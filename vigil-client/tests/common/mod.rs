//! In-process stand-in for the backend, bound to an ephemeral port.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use vigil_client::{ApiClient, ServerEndpoint, Session};

pub const USER_ID: &str = "42";
pub const CSRF: &str = "csrf-abc";
pub const EMAIL: &str = "owner@example.com";
pub const PASSWORD: &str = "hunter22";

#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct Stub {
    /// Every request that reached a route.
    pub hits: AtomicUsize,
    pub devices: Mutex<BTreeMap<String, String>>,
    pub trained: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<Vec<UploadedPart>>>,
    pub device_tokens: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    /// Unknown-identity messages pushed before the socket goes idle;
    /// `usize::MAX` keeps pushing until the client leaves.
    pub ws_burst: AtomicUsize,
    pub ws_closed: AtomicBool,
}

pub struct Backend {
    pub addr: SocketAddr,
    pub state: Arc<Stub>,
}

impl Backend {
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.addr.ip().to_string(), self.addr.port().to_string())
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.endpoint(), Some(Session::new(USER_ID, CSRF))).unwrap()
    }

    pub fn anonymous(&self) -> ApiClient {
        ApiClient::new(self.endpoint(), None).unwrap()
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

pub async fn start() -> Backend {
    start_with(Stub::default()).await
}

pub async fn start_with(stub: Stub) -> Backend {
    let _ = env_logger::builder().is_test(true).try_init();
    let state = Arc::new(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/api/test", get(health))
        .route("/api/login", post(login))
        .route("/api/register", post(register))
        .route("/api/logout", post(logout))
        .route("/api/sendToken", post(send_token))
        .route("/api/getDevicesurl", get(list_devices))
        .route("/api/updatedevices", put(update_devices))
        .route("/api/deleteDevice", post(delete_device))
        .route("/api/GetTrainedData", get(list_trained))
        .route("/api/deleteImage", post(delete_trained))
        .route("/api/uploadapi", post(upload))
        .route("/ws/notifications/", get(notifications))
        .with_state(Arc::clone(&state));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    Backend { addr, state }
}

/// An address nothing listens on.
pub async fn dead_endpoint() -> ServerEndpoint {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    ServerEndpoint::new(addr.ip().to_string(), addr.port().to_string())
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-csrftoken").and_then(|v| v.to_str().ok()) == Some(CSRF)
        && headers.get("id").and_then(|v| v.to_str().ok()) == Some(USER_ID)
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "detail": "CSRF Failed: CSRF token missing." })),
    )
        .into_response()
}

async fn health(State(s): State<Arc<Stub>>) -> Json<Value> {
    s.hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "status": "ok" }))
}

async fn login(State(s): State<Arc<Stub>>, Json(body): Json<Value>) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        Json(json!({ "id": 42, "csrf": CSRF, "message": "Login successful" })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid email or password" })),
        )
            .into_response()
    }
}

async fn register(State(s): State<Arc<Stub>>, Json(body): Json<Value>) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if body["email"] == EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "User already registered" })),
        )
            .into_response();
    }
    Json(json!({ "message": "Account created" })).into_response()
}

async fn logout(State(s): State<Arc<Stub>>, headers: HeaderMap) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    Json(json!({ "message": "Logged out successfully" })).into_response()
}

async fn send_token(
    State(s): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    let token = body["token"].as_str().unwrap_or_default().to_string();
    s.device_tokens.lock().unwrap().push(token);
    Json(json!({ "message": "Token saved" })).into_response()
}

async fn list_devices(State(s): State<Arc<Stub>>, headers: HeaderMap) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    let devices = s.devices.lock().unwrap().clone();
    Json(json!(devices)).into_response()
}

async fn update_devices(
    State(s): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    let Some(map) = body["device_url"].as_object() else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "device_url missing" })))
            .into_response();
    };
    let mut devices = s.devices.lock().unwrap();
    for (name, url) in map {
        devices.insert(name.clone(), url.as_str().unwrap_or_default().to_string());
    }
    Json(json!({ "message": "Devices updated" })).into_response()
}

async fn delete_device(
    State(s): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    let key = body["key"].as_str().unwrap_or_default();
    if s.devices.lock().unwrap().remove(key).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("Device {key} not found") })),
        )
            .into_response();
    }
    Json(json!({ "message": "Device deleted" })).into_response()
}

async fn list_trained(State(s): State<Arc<Stub>>, headers: HeaderMap) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    let names = s.trained.lock().unwrap().clone();
    Json(json!(names)).into_response()
}

async fn delete_trained(
    State(s): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    let name = body["name"].as_str().unwrap_or_default().to_string();
    s.trained.lock().unwrap().retain(|n| *n != name);
    Json(json!({ "message": "Deleted" })).into_response()
}

async fn upload(State(s): State<Arc<Stub>>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    s.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return forbidden();
    }
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let part = UploadedPart {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_owned),
            content_type: field.content_type().map(str::to_owned),
            len: 0,
        };
        let data = field.bytes().await.unwrap();
        parts.push(UploadedPart {
            len: data.len(),
            ..part
        });
    }
    if s.fail_uploads.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Training queue unavailable" })),
        )
            .into_response();
    }
    s.uploads.lock().unwrap().push(parts);
    Json(json!({ "message": "Files uploaded" })).into_response()
}

async fn notifications(ws: WebSocketUpgrade, State(s): State<Arc<Stub>>) -> Response {
    ws.on_upgrade(move |socket| push_notifications(socket, s))
}

async fn push_notifications(mut socket: WebSocket, s: Arc<Stub>) {
    let burst = s.ws_burst.load(Ordering::SeqCst);
    let mut sent = 0usize;
    while sent < burst {
        let msg = json!({ "camera_id": sent % 4, "identity": "Unknown", "confidence": 0.37 });
        if socket.send(Message::Text(msg.to_string().into())).await.is_err() {
            break;
        }
        sent += 1;
        if burst == usize::MAX {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
    if sent == burst {
        let known = json!({ "camera_id": "door", "identity": "alice", "confidence": 0.95 });
        let _ = socket.send(Message::Text(known.to_string().into())).await;
        let _ = socket.send(Message::Text("garbage".into())).await;
    }
    // Wait for the client to go away.
    loop {
        match socket.recv().await {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => {}
        }
    }
    s.ws_closed.store(true, Ordering::SeqCst);
}
