//! Error types for the chirp API client.
//!
//! # Design
//! One flat enum for the whole crate. The two 401 situations get dedicated
//! variants because callers handle them differently: `AuthRequired` means
//! "log in and retry", `CredentialsRevoked` means the server stopped
//! accepting credentials it had previously accepted and the session is
//! dead. All other non-2xx responses land in `Http` with the raw status
//! code and body for debugging.

use thiserror::Error;

/// Errors returned by [`Session`](crate::Session), [`Client`](crate::Client)
/// and [`Paginator`](crate::Paginator) operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 401 on a session that never authenticated: the
    /// endpoint requires a logged-in user.
    #[error("endpoint requires authentication")]
    AuthRequired,

    /// The server returned 401 on a session whose credential probe had
    /// succeeded. The stored credentials are no longer valid and retrying
    /// will not help.
    #[error("server no longer accepts the session credentials")]
    CredentialsRevoked,

    /// The server returned a non-2xx status other than the 401 cases above.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced an HTTP response (DNS, connect, TLS or
    /// read failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not the JSON shape the operation expected.
    #[error("unexpected response JSON: {0}")]
    Json(String),

    /// A required field was absent while decoding an entity.
    #[error("missing field `{field}` in {entity} object")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// A required field was present but held the wrong JSON type.
    #[error("field `{field}` in {entity} object has an unexpected type")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
    },

    /// An entity payload was not a JSON object at all.
    #[error("{entity} payload is not a JSON object")]
    NotAnObject { entity: &'static str },
}
