//! HTTP transport boundary.
//!
//! # Design
//! The consumed API is GET-only, so the transport surface is a single
//! `get`. Requests and responses are plain data (`HttpRequest` /
//! `HttpResponse`); the bundled [`UreqTransport`] executes them with a
//! blocking agent, and unit tests swap in an in-memory mock. Credentials
//! ride on each request so a transport stays stateless and can be shared
//! between sessions.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::ApiError;

/// A Basic-auth username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keeps passwords out of debug logs.
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A GET request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Absolute URL including the query string.
    pub url: String,
    /// Credentials to send as Basic auth, if any.
    pub auth: Option<Credentials>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes HTTP requests on behalf of a [`Session`](crate::Session).
///
/// `Send + Sync` so a transport handle can be shared across threads.
pub trait Transport: Send + Sync {
    /// Execute `request` and return the response, whatever its status.
    /// `Err` is reserved for requests that produced no HTTP response.
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent reports non-2xx statuses as data rather than errors; status
/// interpretation happens in [`Session`](crate::Session).
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Transport with an overall per-call timeout instead of the agent
    /// defaults.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        UreqTransport { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.agent.get(&request.url);
        if let Some(auth) = &request.auth {
            builder = builder.header("Authorization", auth.basic_header());
        }
        let mut response = builder
            .call()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
