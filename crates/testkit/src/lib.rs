use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::Form;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub fn single_metric_data() -> Value {
    json!([{
        "datapoints": [
            [1.0, 1417629030],
            [2.0, 1417629040],
            [3.0, 1417629050]
        ],
        "target": "foo"
    }])
}

pub fn multi_metric_data() -> Value {
    json!([
        {
            "datapoints": [
                [1.0, 1417629030],
                [2.0, 1417629040],
                [3.0, 1417629050]
            ],
            "target": "foo"
        },
        {
            "datapoints": [
                [1.0, 1417629030],
                [2.0, 1417629040],
                [3.0, 1417629050]
            ],
            "target": "bar"
        }
    ])
}

pub fn metric_with_null_data() -> Value {
    json!([{
        "datapoints": [
            [1.0, 1417629030],
            [null, 1417629040],
            [2.0, 1417629050]
        ],
        "target": "foo"
    }])
}

pub fn metric_with_only_nulls_data() -> Value {
    json!([{
        "datapoints": [
            [null, 1417629030],
            [null, 1417629040],
            [null, 1417629050]
        ],
        "target": "foo"
    }])
}

/// A render request as seen by [`StubBackend`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Arc<String>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// In-process `/render` endpoint answering every request with one canned
/// status and body.
pub struct StubBackend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl StubBackend {
    pub async fn json(data: &Value) -> Self {
        Self::serve(200, data.to_string()).await
    }

    pub async fn serve(status: u16, body: impl Into<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve_on(listener, status, body.into())
    }

    /// Bind `addr` after `delay`, for exercising client retries.
    pub async fn serve_later(addr: SocketAddr, delay: Duration, data: &Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status: StatusCode::OK,
            body: Arc::new(data.to_string()),
            requests: requests.clone(),
        };
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let listener = TcpListener::bind(addr).await.unwrap();
            let _ = axum::serve(listener, router(state)).await;
        });
        Self {
            addr,
            requests,
            task,
        }
    }

    fn serve_on(listener: TcpListener, status: u16, body: String) -> Self {
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status: StatusCode::from_u16(status).unwrap(),
            body: Arc::new(body),
            requests: requests.clone(),
        };
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });
        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An address nothing is listening on, at least for the moment.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn router(state: StubState) -> Router {
    Router::new()
        .route("/render", get(render).post(render_form))
        .with_state(state)
}

async fn render(
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    record(&state, "GET", params, &headers)
}

async fn render_form(
    State(state): State<StubState>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> (StatusCode, String) {
    record(&state, "POST", params, &headers)
}

fn record(
    state: &StubState,
    method: &str,
    params: HashMap<String, String>,
    headers: &HeaderMap,
) -> (StatusCode, String) {
    let headers = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        params,
        headers,
    });
    (state.status, state.body.as_ref().clone())
}

/// Raw HTTP/1.1 server answering every connection with `body` as a chunked
/// response, split into `chunks` pieces written `gap` apart.
pub struct TrickleBackend {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TrickleBackend {
    pub async fn serve(data: &Value, chunks: usize, gap: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = data.to_string().into_bytes();
        let chunk_len = body.len().div_ceil(chunks.max(1)).max(1);
        let task = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = stream.read(&mut buf).await;
                    let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                                transfer-encoding: chunked\r\nconnection: close\r\n\r\n";
                    if stream.write_all(head.as_bytes()).await.is_err() {
                        return;
                    }
                    for piece in body.chunks(chunk_len) {
                        tokio::time::sleep(gap).await;
                        let mut frame = format!("{:x}\r\n", piece.len()).into_bytes();
                        frame.extend_from_slice(piece);
                        frame.extend_from_slice(b"\r\n");
                        if stream.write_all(&frame).await.is_err() {
                            return;
                        }
                    }
                    let _ = stream.write_all(b"0\r\n\r\n").await;
                });
            }
        });
        Self { addr, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl Drop for TrickleBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Accepts connections, reads the request and hangs up without answering.
/// Counts every connection it sees.
pub struct HangupBackend {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl HangupBackend {
    pub async fn serve() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        let task = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                drop(stream);
            }
        });
        Self {
            addr,
            connections,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for HangupBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}
