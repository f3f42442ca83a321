//! Throwaway HTTP server standing in for a provider API in tests.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Json;
use axum::Router;
use serde_json::Value;

/// A request the mock server received.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    routes: Arc<Vec<(Method, String, Value)>>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

pub(crate) struct MockApi {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl MockApi {
    /// Serve canned JSON answers keyed by method and exact path.
    /// Unknown routes answer 404.
    pub async fn start(routes: Vec<(Method, &str, Value)>) -> MockApi {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(m, p, v)| (m, p.to_string(), v))
                    .collect(),
            ),
            recorded: recorded.clone(),
        };

        let app = Router::new().fallback(respond).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockApi {
            base_url: format!("http://{}", addr),
            recorded,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn find(&self, method: &str, path: &str) -> Option<Recorded> {
        self.requests()
            .into_iter()
            .find(|r| r.method == method && r.path == path)
    }
}

async fn respond(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    state.recorded.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        authorization: headers
            .get("authorization")
            .or_else(|| headers.get("private-token"))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    match state
        .routes
        .iter()
        .find(|(m, p, _)| *m == method && *p == path)
    {
        Some((_, _, answer)) => (StatusCode::OK, Json(answer.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "Not Found" })),
        ),
    }
}
