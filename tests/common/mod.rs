//! In-process mock of the HGSmart cloud API for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct VendorState {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub feed_calls: AtomicUsize,
    /// Reject the initial access token on device list until a refresh happens
    pub expire_first_token: AtomicBool,
    /// When cleared, refresh attempts fail with a vendor auth code
    pub refresh_ok: AtomicBool,
    /// When set, stats/attributes reads fail with the vendor 401 code
    pub reads_unauthorized: AtomicBool,
    /// JSON text of the last multipart `command` field received
    pub last_command: Mutex<Option<String>>,
}

impl VendorState {
    pub fn new() -> Arc<Self> {
        let state = Self::default();
        state.refresh_ok.store(true, Ordering::SeqCst);
        Arc::new(state)
    }
}

/// Serve the mock vendor API on an ephemeral port, returning its base URL
pub async fn spawn(state: Arc<VendorState>) -> String {
    let app = Router::new()
        .route("/oauth/login", post(login))
        .route("/oauth/refreshToken", post(refresh))
        .route("/app/device/list", get(list_devices))
        .route("/app/device/feeder/summary/:id", get(feeder_stats))
        .route(
            "/app/device/attribute/:id",
            get(device_attributes).put(feed_command),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn login(State(state): State<Arc<VendorState>>, Json(body): Json<Value>) -> Json<Value> {
    let n = state.login_calls.fetch_add(1, Ordering::SeqCst) + 1;

    if body["account_num"] == "user" && body["pwd"] == "password" {
        // Mint a fresh token pair per login; the second login yields the
        // "access-2" token that satisfies `expire_first_token`
        Json(json!({
            "code": 200,
            "msg": "ok",
            "data": {
                "accessToken": format!("access-{}", n),
                "refreshToken": format!("refresh-{}", n)
            }
        }))
    } else {
        Json(json!({
            "code": 500,
            "msg": "account or password incorrect",
            "data": null
        }))
    }
}

async fn refresh(State(state): State<Arc<VendorState>>, Json(body): Json<Value>) -> Json<Value> {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if !state.refresh_ok.load(Ordering::SeqCst) {
        return Json(json!({ "code": 401, "msg": "refresh token invalid", "data": null }));
    }

    assert!(body["refreshtoken"].is_string());
    Json(json!({
        "code": 200,
        "msg": "ok",
        "data": { "accessToken": "access-2", "refreshToken": "refresh-2" }
    }))
}

async fn list_devices(State(state): State<Arc<VendorState>>, headers: HeaderMap) -> Json<Value> {
    state.list_calls.fetch_add(1, Ordering::SeqCst);

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if state.expire_first_token.load(Ordering::SeqCst) && auth != "Bearer access-2" {
        return Json(json!({ "code": 401, "msg": "token expired", "data": null }));
    }

    Json(json!({
        "code": 200,
        "msg": "ok",
        "data": [{
            "device_id": "feeder-1",
            "name": "Kitchen Feeder",
            "type": "Pet Feeder F05",
            "fwVersion": "1.2.3",
            "online": true
        }]
    }))
}

async fn feeder_stats(
    State(state): State<Arc<VendorState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    if state.reads_unauthorized.load(Ordering::SeqCst) {
        return Json(json!({ "code": 401, "msg": "token expired", "data": null }));
    }
    if id == "missing" {
        return Json(json!({ "code": 200, "msg": "ok", "data": null }));
    }

    Json(json!({
        "code": 200,
        "msg": "ok",
        "data": { "surplusGrain": 62, "desiccantLeftDays": 12 }
    }))
}

async fn device_attributes(
    State(state): State<Arc<VendorState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    if state.reads_unauthorized.load(Ordering::SeqCst) {
        return Json(json!({ "code": 401, "msg": "token expired", "data": null }));
    }
    if id == "missing" {
        return Json(json!({ "code": 200, "msg": "ok", "data": null }));
    }

    Json(json!({
        "code": 200,
        "msg": "ok",
        "data": {
            "foodFrames": [
                { "slot": 0, "time": "07:30", "portions": 2, "enabled": true },
                { "slot": 1, "time": "19:00", "portions": 1, "enabled": false }
            ],
            "volume": 3
        }
    }))
}

async fn feed_command(
    State(state): State<Arc<VendorState>>,
    Path(_id): Path<String>,
    mut multipart: Multipart,
) -> Json<Value> {
    state.feed_calls.fetch_add(1, Ordering::SeqCst);

    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("command") {
            let text = field.text().await.unwrap();
            *state.last_command.lock().await = Some(text);
        }
    }

    Json(json!({ "code": 200, "msg": "ok", "data": null }))
}
