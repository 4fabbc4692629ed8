//! Mock Todo backend for exercising the client without a real server.
//!
//! A `tiny_http` server on 127.0.0.1:0 answers each request with a canned
//! response chosen by method and path, and records every request so tests
//! can assert on the exact method, path, headers and body that were sent.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;
use tiny_http::{Header, Response, Server};

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including any query string.
    pub target: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        MockResponse {
            status,
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        MockResponse {
            status,
            body: body.to_string(),
        }
    }
}

type Routes = Arc<Mutex<HashMap<(String, String), MockResponse>>>;

pub struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    routes: Routes,
}

impl MockServer {
    pub fn start() -> Self {
        let server = Server::http("127.0.0.1:0").expect("Failed to bind mock server");
        let addr = server
            .server_addr()
            .to_ip()
            .expect("mock server is not on an IP socket");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

        let thread_requests = Arc::clone(&requests);
        let thread_routes = Arc::clone(&routes);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                handle_request(request, &thread_requests, &thread_routes);
            }
        });

        MockServer {
            base_url: format!("http://{}", addr),
            requests,
            routes,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Answer `method path` (query string ignored) with `response`.
    pub fn on(&self, method: &str, path: &str, response: MockResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The single request the test expects to have been made.
    pub fn only_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request: {:?}", requests);
        requests.into_iter().next().unwrap()
    }
}

fn handle_request(
    mut request: tiny_http::Request,
    requests: &Arc<Mutex<Vec<RecordedRequest>>>,
    routes: &Routes,
) {
    let method = request.method().to_string();
    let target = request.url().to_string();
    let headers = request
        .headers()
        .iter()
        .map(|h| (h.field.to_string().to_ascii_lowercase(), h.value.to_string()))
        .collect();
    let mut body = String::new();
    if request.as_reader().read_to_string(&mut body).is_err() {
        let _ = request.respond(Response::empty(400));
        return;
    }

    let path = target.split('?').next().unwrap_or_default().to_string();
    let response = routes
        .lock()
        .unwrap()
        .get(&(method.clone(), path))
        .cloned()
        .unwrap_or_else(|| MockResponse::json(404, serde_json::json!({"error": "not found"})));

    // Record before responding so the client never observes a reply that
    // is not yet in the log.
    requests.lock().unwrap().push(RecordedRequest {
        method,
        target,
        headers,
        body,
    });

    let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header is valid");
    let reply = Response::from_data(response.body.into_bytes())
        .with_status_code(response.status)
        .with_header(content_type);
    let _ = request.respond(reply);
}

/// A `todo` command pointed at `server`, with the session file in `home`.
pub fn todo_cmd(server: &MockServer, home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("todo").expect("todo binary");
    cmd.env("TODO_API_URL", server.base_url())
        .env("TODO_TOKEN_FILE", home.path().join("token"))
        .env_remove("RUST_LOG");
    cmd
}
