//! Synchronous client for Twitter-compatible microblogging APIs.
//!
//! # Overview
//! Authenticates with HTTP Basic auth, issues GET requests against the
//! classic `*.json` endpoint surface and decodes the responses into typed
//! records. Timeline-shaped endpoints hand out [`Paginator`]s that track
//! a last-seen-id watermark and turn it into `since_id` / `max_id` query
//! parameters.
//!
//! # Design
//! - Fully blocking, one request at a time; parallel polling means
//!   handing [`Client`] clones to your own threads.
//! - [`Session`] is the single request path: URL building, Basic auth,
//!   status-code mapping, JSON parsing.
//! - Records keep the raw JSON they were decoded from, so fields the
//!   structs do not model stay reachable.
//! - HTTP I/O sits behind the [`Transport`] trait; [`UreqTransport`] is
//!   the bundled implementation and tests substitute in-memory ones.

pub mod client;
pub mod entities;
pub mod error;
pub mod http;
pub mod paginator;
pub mod session;

pub use client::Client;
pub use entities::{DirectMessage, FromJson, Status, User};
pub use error::ApiError;
pub use http::{Credentials, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use paginator::{Items, Paginator, DEFAULT_COUNT, MAX_COUNT};
pub use session::Session;
