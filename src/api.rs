// API client module: a small blocking HTTP client that talks to the Todo
// backend. Every public call is a single request/response exchange; the
// caller decides how to present the outcome.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Used when neither `--base-url` nor `TODO_API_URL` is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking API client holding the reqwest client, the backend base URL and
/// an optional bearer token for authenticated calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Registration payload for `POST /users`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login payload for `POST /users/login`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token returned by both the register and login endpoints. The backend
/// also sends the user document; we only need the token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Task {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Body of `PATCH /tasks/:id`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TaskUpdate {
    pub completed: bool,
}

/// Account details from `GET /users/me`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
}

/// Query string filters for `GET /tasks`. Unset fields are left out of the
/// URL entirely.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(rename = "sortBy", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

/// Outcome of a request that reached the server. Transport failures are
/// reported through the surrounding `Result` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// 2xx status with a decoded body.
    Accepted(T),
    /// Any other status; `body` is the server text, verbatim.
    Rejected { status: StatusCode, body: String },
}

impl<T> Reply<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Reply::Accepted(_))
    }
}

impl ApiClient {
    /// Create a client for the given base URL. A trailing slash is dropped
    /// so paths can be appended directly.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store a bearer token for subsequent authenticated requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build the Authorization header. Authenticated endpoints are never
    /// called without a token.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let Some(token) = &self.token else {
            bail!("No token set; log in first");
        };
        let mut headers = HeaderMap::new();
        let val = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Token contains characters not allowed in a header")?;
        headers.insert(AUTHORIZATION, val);
        Ok(headers)
    }

    /// Send a request and decode a 2xx body as `T`.
    fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<Reply<T>> {
        let res = self.dispatch(req, what)?;
        match res {
            Ok(res) => {
                let value = res
                    .json::<T>()
                    .with_context(|| format!("Parsing {} response json", what))?;
                Ok(Reply::Accepted(value))
            }
            Err(rejected) => Ok(rejected),
        }
    }

    /// Send a request whose success body carries nothing we need.
    fn send_unit(&self, req: RequestBuilder, what: &str) -> Result<Reply<()>> {
        match self.dispatch(req, what)? {
            Ok(_) => Ok(Reply::Accepted(())),
            Err(rejected) => Ok(rejected),
        }
    }

    /// Shared send path: a success response is handed back for decoding, a
    /// non-2xx one is collapsed into `Reply::Rejected` with its body text.
    fn dispatch<T>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<std::result::Result<reqwest::blocking::Response, Reply<T>>> {
        let req = req.build().with_context(|| format!("Failed to build {} request", what))?;
        debug!(method = %req.method(), url = %req.url(), "sending {} request", what);
        let res = self
            .client
            .execute(req)
            .with_context(|| format!("Failed to send {} request", what))?;
        let status = res.status();
        debug!(status = status.as_u16(), "{} response", what);
        if status.is_success() {
            return Ok(Ok(res));
        }
        let body = match res.text() {
            Ok(body) => body,
            Err(err) => {
                warn!(status = status.as_u16(), error = %err, "could not read {} rejection body", what);
                String::new()
            }
        };
        debug!(status = status.as_u16(), "{} rejected by server", what);
        Ok(Err(Reply::Rejected { status, body }))
    }

    /// Create an account. The backend answers with a fresh token.
    pub fn register(&self, user: &User) -> Result<Reply<LoginResponse>> {
        let req = self.client.post(self.url("/users")).json(user);
        self.send(req, "register")
    }

    pub fn login(&self, creds: &LoginRequest) -> Result<Reply<LoginResponse>> {
        let req = self.client.post(self.url("/users/login")).json(creds);
        self.send(req, "login")
    }

    /// Invalidate the current token on the server.
    pub fn logout(&self) -> Result<Reply<()>> {
        let req = self
            .client
            .post(self.url("/users/logout"))
            .headers(self.auth_headers()?);
        self.send_unit(req, "logout")
    }

    pub fn profile(&self) -> Result<Reply<Profile>> {
        let req = self
            .client
            .get(self.url("/users/me"))
            .headers(self.auth_headers()?);
        self.send(req, "profile")
    }

    /// Create a new, not yet completed task.
    pub fn add_task(&self, description: &str) -> Result<Reply<Task>> {
        let task = Task {
            description: description.to_string(),
            ..Task::default()
        };
        let req = self
            .client
            .post(self.url("/tasks"))
            .headers(self.auth_headers()?)
            .json(&task);
        self.send(req, "add task")
    }

    pub fn list_tasks(&self, query: &TaskQuery) -> Result<Reply<Vec<Task>>> {
        let req = self
            .client
            .get(self.url("/tasks"))
            .headers(self.auth_headers()?)
            .query(query);
        self.send(req, "list tasks")
    }

    pub fn get_task(&self, id: &str) -> Result<Reply<Task>> {
        let req = self
            .client
            .get(self.url(&task_path(id)?))
            .headers(self.auth_headers()?);
        self.send(req, "get task")
    }

    /// Mark a task as completed. The updated task in the response is not
    /// decoded.
    pub fn complete_task(&self, id: &str) -> Result<Reply<()>> {
        let req = self
            .client
            .patch(self.url(&task_path(id)?))
            .headers(self.auth_headers()?)
            .json(&TaskUpdate { completed: true });
        self.send_unit(req, "complete task")
    }

    pub fn delete_task(&self, id: &str) -> Result<Reply<()>> {
        let req = self
            .client
            .delete(self.url(&task_path(id)?))
            .headers(self.auth_headers()?);
        self.send_unit(req, "delete task")
    }
}

/// Task ids are interpolated into the path, so anything that would change
/// the route is refused.
fn task_path(id: &str) -> Result<String> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        bail!("Invalid task id: {:?}", id);
    }
    Ok(format!("/tasks/{}", id))
}
