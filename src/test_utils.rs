// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: an in-memory Kubernetes API server and a stub Rancher HTTP endpoint.

use crate::constants::management::SERVER_URL_SETTING;
use axum::extract::State;
use axum::Router;
use http::header::{HeaderName, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::net::TcpListener;
use tower::Service;

pub const SETTINGS: &str = "/apis/management.cattle.io/v3/settings";
pub const USERS: &str = "/apis/management.cattle.io/v3/users";
pub const GLOBAL_ROLES: &str = "/apis/management.cattle.io/v3/globalroles";
pub const GLOBAL_ROLE_BINDINGS: &str = "/apis/management.cattle.io/v3/globalrolebindings";

#[derive(Default)]
struct ApiState {
    /// collection path -> name -> object
    objects: BTreeMap<String, BTreeMap<String, Value>>,
    /// item path -> reads left before a deleted object disappears
    deleting: HashMap<String, u32>,
    failures: HashMap<(String, String), (u16, String)>,
    /// (method, path) requests that never get an answer
    stalled: HashSet<(String, String)>,
    requests: Vec<(String, String)>,
    delete_linger: u32,
    revision: u64,
}

/// A stateful stand-in for the Kubernetes API server, for cluster-scoped custom resources.
///
/// Objects are kept per collection path (`/apis/{group}/{version}/{plural}`).
/// Supports create, get, replace (with resource version checks), merge patch and delete.
#[derive(Clone, Default)]
pub struct ApiServerMock {
    state: Arc<Mutex<ApiState>>,
}

impl ApiServerMock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep deleted objects readable for `reads` more GET requests
    pub fn with_delete_linger(self, reads: u32) -> Self {
        self.state.lock().unwrap().delete_linger = reads;
        self
    }

    /// Seed the `server-url` setting
    pub fn with_server_url(self, url: &str) -> Self {
        self.insert(
            SETTINGS,
            json!({
                "apiVersion": "management.cattle.io/v3",
                "kind": "Setting",
                "metadata": { "name": SERVER_URL_SETTING },
                "value": url,
            }),
        );
        self
    }

    /// Answer every `method` request on the exact `path` with an API error
    pub fn fail_with(self, method: &str, path: &str, code: u16, reason: &str) -> Self {
        self.state.lock().unwrap().failures.insert(
            (method.to_string(), path.to_string()),
            (code, reason.to_string()),
        );
        self
    }

    /// Never answer `method` requests on the exact `path`
    pub fn stall_on(self, method: &str, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .stalled
            .insert((method.to_string(), path.to_string()));
        self
    }

    fn is_stalled(&self, method: &str, path: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let key = (method.to_string(), path.to_string());
        if state.stalled.contains(&key) {
            state.requests.push(key);
            return true;
        }
        false
    }

    pub fn insert(&self, collection: &str, mut object: Value) {
        let mut state = self.state.lock().unwrap();
        state.revision += 1;
        let name = object["metadata"]["name"].as_str().unwrap().to_string();
        object["metadata"]["resourceVersion"] = json!(state.revision.to_string());
        object["metadata"]["uid"] = json!(format!("uid-{}", name));
        state
            .objects
            .entry(collection.to_string())
            .or_default()
            .insert(name, object);
    }

    pub fn get(&self, collection: &str, name: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.objects.get(collection).and_then(|c| c.get(name)).cloned()
    }

    /// Names of the objects stored in a collection, sorted
    pub fn names(&self, collection: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(collection)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of requests received with this method on this exact path
    pub fn count(&self, method: &str, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .requests
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }

    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    fn handle(&self, method: &str, path: &str, body: &[u8]) -> (u16, Value) {
        let mut state = self.state.lock().unwrap();
        state.requests.push((method.to_string(), path.to_string()));

        if let Some((code, reason)) = state
            .failures
            .get(&(method.to_string(), path.to_string()))
            .cloned()
        {
            return (code, status_json(code, &reason, "injected failure"));
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match (method, segments.len()) {
            ("POST", 4) => state.create(path, body),
            ("GET", 5) => state.read(path),
            ("PUT", 5) => state.replace(path, body),
            ("PATCH", 5) => state.merge_patch(path, body),
            ("DELETE", 5) => state.delete(path),
            _ => (405, status_json(405, "MethodNotAllowed", path)),
        }
    }
}

fn split_item(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or((path, ""))
}

impl ApiState {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }

    fn create(&mut self, collection: &str, body: &[u8]) -> (u16, Value) {
        let mut object: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => return (400, status_json(400, "BadRequest", &e.to_string())),
        };
        let Some(name) = object["metadata"]["name"].as_str().map(str::to_string) else {
            return (422, status_json(422, "Invalid", "metadata.name is required"));
        };
        if self
            .objects
            .get(collection)
            .is_some_and(|c| c.contains_key(&name))
        {
            return (
                409,
                status_json(409, "AlreadyExists", &format!("\"{}\" already exists", name)),
            );
        }

        object["metadata"]["resourceVersion"] = json!(self.next_revision());
        object["metadata"]["uid"] = json!(format!("uid-{}-{}", name, self.revision));
        object["metadata"]["creationTimestamp"] = json!("2026-01-01T00:00:00Z");
        self.objects
            .entry(collection.to_string())
            .or_default()
            .insert(name, object.clone());
        (201, object)
    }

    fn read(&mut self, path: &str) -> (u16, Value) {
        let (collection, name) = split_item(path);
        let Some(object) = self.objects.get(collection).and_then(|c| c.get(name)).cloned() else {
            return (404, not_found_json(name));
        };

        if let Some(reads_left) = self.deleting.get_mut(path) {
            if *reads_left == 0 {
                self.deleting.remove(path);
                if let Some(c) = self.objects.get_mut(collection) {
                    c.remove(name);
                }
                return (404, not_found_json(name));
            }
            *reads_left -= 1;
        }
        (200, object)
    }

    fn replace(&mut self, path: &str, body: &[u8]) -> (u16, Value) {
        let (collection, name) = split_item(path);
        let Some(current) = self.objects.get(collection).and_then(|c| c.get(name)).cloned() else {
            return (404, not_found_json(name));
        };
        let mut object: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => return (400, status_json(400, "BadRequest", &e.to_string())),
        };
        if object["metadata"]["resourceVersion"] != current["metadata"]["resourceVersion"] {
            return (
                409,
                status_json(409, "Conflict", "the object has been modified"),
            );
        }

        object["metadata"]["uid"] = current["metadata"]["uid"].clone();
        object["metadata"]["resourceVersion"] = json!(self.next_revision());
        self.store(collection, name, object.clone());
        (200, object)
    }

    fn merge_patch(&mut self, path: &str, body: &[u8]) -> (u16, Value) {
        let (collection, name) = split_item(path);
        let Some(mut object) = self.objects.get(collection).and_then(|c| c.get(name)).cloned()
        else {
            return (404, not_found_json(name));
        };
        let patch: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => return (400, status_json(400, "BadRequest", &e.to_string())),
        };

        merge(&mut object, &patch);
        object["metadata"]["resourceVersion"] = json!(self.next_revision());
        self.store(collection, name, object.clone());
        (200, object)
    }

    fn delete(&mut self, path: &str) -> (u16, Value) {
        let (collection, name) = split_item(path);
        let Some(object) = self.objects.get(collection).and_then(|c| c.get(name)).cloned() else {
            return (404, not_found_json(name));
        };

        if self.delete_linger > 0 {
            let linger = self.delete_linger;
            self.deleting.entry(path.to_string()).or_insert(linger);
        } else if let Some(c) = self.objects.get_mut(collection) {
            c.remove(name);
        }
        (200, object)
    }

    fn store(&mut self, collection: &str, name: &str, object: Value) {
        self.objects
            .entry(collection.to_string())
            .or_default()
            .insert(name.to_string(), object);
    }
}

/// JSON merge patch (RFC 7386)
fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

impl Service<Request<Body>> for ApiServerMock {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mock = self.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(|e| -> tower::BoxError { e.to_string().into() })?
                .to_bytes();

            if mock.is_stalled(parts.method.as_str(), parts.uri.path()) {
                std::future::pending::<()>().await;
            }
            let (status, json) = mock.handle(parts.method.as_str(), parts.uri.path(), &bytes);
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(json.to_string().into_bytes()))
                .unwrap())
        })
    }
}

/// Create a Kubernetes `Status` failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
}

/// Create a 404 not found body
pub fn not_found_json(name: &str) -> Value {
    status_json(404, "NotFound", &format!("\"{}\" not found", name))
}

/// A request received by [`HttpStub`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query
    pub target: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone, Default)]
struct StubState {
    /// path and query -> (status, body)
    routes: Arc<HashMap<String, (u16, String)>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A plain-HTTP server answering fixed responses per request target (path and query).
pub struct HttpStub {
    addr: SocketAddr,
    state: StubState,
    task: tokio::task::JoinHandle<()>,
}

impl HttpStub {
    pub async fn start(routes: &[(&str, u16, &str)]) -> Self {
        let state = StubState {
            routes: Arc::new(
                routes
                    .iter()
                    .map(|(target, status, body)| {
                        (target.to_string(), (*status, body.to_string()))
                    })
                    .collect(),
            ),
            requests: Arc::default(),
        };

        let app = Router::new()
            .fallback(answer)
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::serve(listener, app.into_make_service());
        let task = tokio::spawn(async move {
            let _ = server.await;
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for HttpStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, [(HeaderName, &'static str); 1], String) {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let (status, response_body) = state
        .routes
        .get(&target)
        .cloned()
        .unwrap_or((404, "not found".to_string()));

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        target,
        headers,
        body,
    });

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(CONTENT_TYPE, "application/json")],
        response_body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_http_stub_records_chunked_body() {
        let stub = HttpStub::start(&[("/login?action=login", 201, r#"{"token":"t"}"#)]).await;
        let mut stream = tokio::net::TcpStream::connect(stub.addr).await.unwrap();

        stream
            .write_all(
                b"POST /login?action=login HTTP/1.1\r\n\
                  Host: localhost\r\n\
                  Content-Type: application/json\r\n\
                  Transfer-Encoding: chunked\r\n\
                  Connection: close\r\n\r\n\
                  5\r\n{\"a\":\r\n2\r\n1}\r\n0\r\n\r\n",
            )
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 201"), "{response}");
        assert!(response.ends_with(r#"{"token":"t"}"#), "{response}");

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/login?action=login");
        assert_eq!(requests[0].body, r#"{"a":1}"#);
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_http_stub_unknown_target_is_not_found() {
        let stub = HttpStub::start(&[]).await;
        let response = reqwest::get(format!("{}/v3/nothing", stub.url())).await.unwrap();

        assert_eq!(response.status(), 404);
        assert_eq!(stub.requests()[0].target, "/v3/nothing");
    }
}
