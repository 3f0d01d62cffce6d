//! Authenticated request execution.
//!
//! # Design
//! A `Session` owns the base URL, the optional Basic credentials and a
//! shared transport handle. It is cheap to clone, and a clone snapshots
//! the credential state, which is how paginators stay pinned to the auth
//! state they were created under. `request` is the single choke point
//! where URLs are built, query strings encoded and status codes mapped
//! onto the error taxonomy.
//!
//! Authentication is a one-time probe against `account/verify_credentials`
//! rather than a per-request challenge dance: the API accepts Basic auth
//! preemptively, so after one successful probe every request just carries
//! the header.

use std::sync::Arc;

use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{Credentials, HttpRequest, Transport, UreqTransport};

/// One anonymous or authenticated connection to an API host.
#[derive(Clone)]
pub struct Session {
    base_url: String,
    transport: Arc<dyn Transport>,
    credentials: Option<Credentials>,
    authenticated: bool,
}

impl Session {
    /// Anonymous session against `base_url` using the bundled blocking
    /// transport.
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, Arc::new(UreqTransport::new()))
    }

    /// Anonymous session using a caller-supplied transport.
    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Session {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            credentials: None,
            authenticated: false,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the credential probe has succeeded on this session.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Probe `account/verify_credentials` with the given credentials.
    ///
    /// `Ok(true)` means the server accepted them; subsequent requests send
    /// them. `Ok(false)` means the server rejected them with 401; the
    /// session stays anonymous and public endpoints keep working. Any
    /// other failure is an error, not an auth verdict, and also leaves
    /// the session anonymous.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<bool, ApiError> {
        self.credentials = None;
        self.authenticated = false;

        let candidate = Credentials::new(username, password);
        let request = HttpRequest {
            url: self.endpoint_url("account/verify_credentials", &[]),
            auth: Some(candidate.clone()),
        };
        tracing::debug!(username, "verifying credentials");
        let response = self.transport.get(&request)?;
        if response.status == 401 {
            tracing::debug!(username, "credentials rejected");
            return Ok(false);
        }
        if !response.is_success() {
            return Err(ApiError::Http { status: response.status, body: response.body });
        }
        self.credentials = Some(candidate);
        self.authenticated = true;
        Ok(true)
    }

    /// GET `{base}/{path}.json` with `params` encoded into the query
    /// string, and parse the body as JSON.
    pub fn request(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let request = HttpRequest {
            url: self.endpoint_url(path, params),
            auth: self.credentials.clone(),
        };
        tracing::debug!(url = %request.url, authenticated = self.authenticated, "GET");
        let response = self.transport.get(&request)?;
        if response.status == 401 {
            if self.authenticated {
                // The probe accepted these credentials earlier; a 401 now
                // means they were revoked in the meantime.
                tracing::warn!(url = %request.url, "authenticated session received 401");
                return Err(ApiError::CredentialsRevoked);
            }
            return Err(ApiError::AuthRequired);
        }
        if !response.is_success() {
            return Err(ApiError::Http { status: response.status, body: response.body });
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Json(e.to_string()))
    }

    fn endpoint_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}.json", self.base_url, path);
        if !params.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            serializer.extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
            url.push('?');
            url.push_str(&serializer.finish());
        }
        url
    }
}
