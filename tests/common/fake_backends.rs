/*!
 * Local stand-ins for the hosted model APIs.
 *
 * Each fake serves the same routes and event-stream framing as the real
 * service on an ephemeral port, so the real adapters can be pointed at it.
 */

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// What a fake received and what it answers with
#[derive(Default)]
struct Recorder {
    /// Raw event-stream body sent back
    body: String,
    /// Status of the first response; success when `None`
    status: Option<u16>,
    /// Keep the event stream open after `body` instead of closing it
    hold_open: bool,
    /// JSON bodies of requests received, in order
    requests: Vec<Value>,
    /// Authorization header of the last request
    authorization: Option<String>,
    /// Number of cancel calls received
    cancels: usize,
    /// Base URL of the fake itself
    base_url: String,
}

/// Handle to a running fake API
#[derive(Clone)]
pub struct FakeBackend {
    /// URL to configure as the adapter endpoint
    pub endpoint: String,
    recorder: Arc<Mutex<Recorder>>,
}

impl FakeBackend {
    /// JSON bodies received by the create endpoint
    pub fn requests(&self) -> Vec<Value> {
        self.recorder.lock().requests.clone()
    }

    /// Authorization header of the last request
    pub fn authorization(&self) -> Option<String> {
        self.recorder.lock().authorization.clone()
    }

    /// Number of prediction cancellations received
    pub fn cancels(&self) -> usize {
        self.recorder.lock().cancels
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind fake backend");
    let addr = listener.local_addr().expect("Fake backend has no address");
    (listener, format!("http://{}", addr))
}

fn event_stream(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn record(recorder: &Mutex<Recorder>, headers: &HeaderMap, body: Value) -> Option<u16> {
    let mut recorder = recorder.lock();
    recorder.requests.push(body);
    recorder.authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    recorder.status
}

fn failure(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": {"message": "fake failure"}}))).into_response()
}

/// Event-stream body of a chat completion producing `fragments`
pub fn chat_completion_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let chunk = json!({"choices": [{"index": 0, "delta": {"content": fragment}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Event-stream body of a prediction producing `fragments`
pub fn prediction_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        body.push_str(&format!("event: output\ndata: {}\n\n", fragment));
    }
    body.push_str("event: done\ndata: {}\n\n");
    body
}

async fn spawn(router: Router<Arc<Mutex<Recorder>>>, body: String, status: Option<u16>, base_suffix: &str) -> FakeBackend {
    spawn_with(router, Recorder { body, status, ..Default::default() }, base_suffix).await
}

async fn spawn_with(router: Router<Arc<Mutex<Recorder>>>, mut recorder: Recorder, base_suffix: &str) -> FakeBackend {
    let (listener, base_url) = bind().await;
    recorder.base_url = base_url.clone();
    let recorder = Arc::new(Mutex::new(recorder));

    let app = router.with_state(recorder.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    FakeBackend { endpoint: format!("{}{}", base_url, base_suffix), recorder }
}

/// Chat completion API answering every request with `body`
pub async fn spawn_chat_completion(body: String) -> FakeBackend {
    spawn(chat_router(), body, None, "/v1").await
}

/// Chat completion API rejecting every request with `status`
pub async fn spawn_chat_completion_failing(status: u16) -> FakeBackend {
    spawn(chat_router(), String::new(), Some(status), "/v1").await
}

fn chat_router() -> Router<Arc<Mutex<Recorder>>> {
    async fn completions(
        State(recorder): State<Arc<Mutex<Recorder>>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        if let Some(status) = record(&recorder, &headers, body) {
            return failure(status);
        }
        let body = recorder.lock().body.clone();
        event_stream(body)
    }

    Router::new().route("/v1/chat/completions", post(completions))
}

/// Prediction API whose predictions stream `body`
pub async fn spawn_prediction(body: String) -> FakeBackend {
    spawn(prediction_router(), body, None, "/v1").await
}

/// Prediction API whose streams send `body` and then stay open
pub async fn spawn_prediction_held_open(body: String) -> FakeBackend {
    let recorder = Recorder { body, hold_open: true, ..Default::default() };
    spawn_with(prediction_router(), recorder, "/v1").await
}

/// Prediction API rejecting prediction creation with `status`
pub async fn spawn_prediction_failing(status: u16) -> FakeBackend {
    spawn(prediction_router(), String::new(), Some(status), "/v1").await
}

fn prediction_router() -> Router<Arc<Mutex<Recorder>>> {
    async fn create(
        State(recorder): State<Arc<Mutex<Recorder>>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        if let Some(status) = record(&recorder, &headers, body) {
            return failure(status);
        }
        let base_url = recorder.lock().base_url.clone();
        let prediction = json!({
            "id": "fake-prediction",
            "status": "starting",
            "urls": {
                "get": format!("{}/v1/predictions/fake-prediction", base_url),
                "cancel": format!("{}/v1/predictions/fake-prediction/cancel", base_url),
                "stream": format!("{}/stream/fake-prediction", base_url),
            }
        });
        (StatusCode::CREATED, Json(prediction)).into_response()
    }

    async fn open_stream(State(recorder): State<Arc<Mutex<Recorder>>>) -> Response {
        let (body, hold_open) = {
            let recorder = recorder.lock();
            (recorder.body.clone(), recorder.hold_open)
        };
        if !hold_open {
            return event_stream(body);
        }
        let chunks = stream::once(async move { Ok::<_, Infallible>(body) }).chain(stream::pending());
        ([(header::CONTENT_TYPE, "text/event-stream")], Body::from_stream(chunks)).into_response()
    }

    async fn cancel(State(recorder): State<Arc<Mutex<Recorder>>>) -> StatusCode {
        recorder.lock().cancels += 1;
        StatusCode::OK
    }

    Router::new()
        .route("/v1/predictions", post(create))
        .route("/v1/predictions/:id/cancel", post(cancel))
        .route("/stream/:id", get(open_stream))
}
