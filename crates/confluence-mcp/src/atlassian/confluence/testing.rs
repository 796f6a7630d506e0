//! In-process Confluence stand-in for gateway tests
//!
//! Serves canned responses from a local axum router and records every request it receives.
//! Stubs are matched on method and path (query strings are ignored). A stub marked with
//! [`Stub::once`] is consumed by its first match, which lets a test script a sequence of
//! responses for the same endpoint.

use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use serde_json::Value;

use super::ConfluenceClient;
use crate::atlassian::ConfluenceConfig;

#[derive(Debug, Clone)]
pub struct Stub {
    method: Method,
    path: String,
    status: u16,
    body: String,
    headers: Vec<(String, String)>,
    once: bool,
}

impl Stub {
    pub fn new(method: Method, path: &str, body: Value) -> Self {
        Self::raw(method, path, &body.to_string())
    }

    pub fn raw(method: Method, path: &str, body: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            status: 200,
            body: body.to_string(),
            headers: Vec::new(),
            once: false,
        }
    }

    pub fn get(path: &str, body: Value) -> Self {
        Self::new(Method::GET, path, body)
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self::new(Method::POST, path, body)
    }

    pub fn put(path: &str, body: Value) -> Self {
        Self::new(Method::PUT, path, body)
    }

    pub fn delete(path: &str) -> Self {
        Self::raw(Method::DELETE, path, "").status(204)
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
    pub authorization: Option<String>,
    pub accept: Option<String>,
}

impl RecordedRequest {
    /// Value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| {
                urlencoding::decode(&value.replace('+', " "))
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string())
            })
        })
    }
}

#[derive(Clone)]
struct MockState {
    stubs: Arc<Mutex<Vec<Stub>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start(stubs: Vec<Stub>) -> Self {
        let state = MockState {
            stubs: Arc::new(Mutex::new(stubs)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = state.requests.clone();

        let app = Router::new().fallback(handle).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn config(&self) -> ConfluenceConfig {
        ConfluenceConfig::new(&self.base_url, "ada@example.com", "secret")
    }

    pub fn client(&self) -> ConfluenceClient {
        ConfluenceClient::new(&self.config()).unwrap()
    }

    /// Client pointed at a port nothing listens on
    pub fn unreachable_client() -> ConfluenceClient {
        ConfluenceClient::new(&ConfluenceConfig::new(
            "http://127.0.0.1:1",
            "ada@example.com",
            "secret",
        ))
        .unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than GET
    pub fn mutations(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
        authorization: header("authorization"),
        accept: header("accept"),
    });

    let stub = {
        let mut stubs = state.stubs.lock().unwrap();
        let position = stubs
            .iter()
            .position(|s| s.method == method && s.path == uri.path());
        match position {
            Some(index) if stubs[index].once => Some(stubs.remove(index)),
            Some(index) => Some(stubs[index].clone()),
            None => None,
        }
    };

    let Some(stub) = stub else {
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from(r#"{"message":"No stub for request"}"#))
            .unwrap();
    };

    let mut response = Response::builder().status(stub.status);
    for (name, value) in &stub.headers {
        response = response.header(name.as_str(), value.as_str());
    }
    response.body(Body::from(stub.body)).unwrap()
}
