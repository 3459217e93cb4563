//! Boundary payload types.
//!
//! Every value in this module crosses the guest boundary as a MessagePack
//! payload, so all types derive `Serialize`/`Deserialize` and round-trip
//! exactly. `RequestError` is the canonical domain-level failure: it travels
//! through the normal serialize/resolve path as the `Err` arm of
//! [`RequestOutcome`], never as a bridge fault.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

/// HTTP method carried by an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

/// An outbound request issued by the guest through the request capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub url: String,
    pub method: RequestMethod,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<Vec<u8>>,
}

/// The response delivered back to the guest for a successful request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Domain-level request failure.
///
/// These are values, not faults: a request that reaches its target but is
/// rejected flows back to the guest as `Err(RequestError)` inside a tagged
/// result payload, and both sides can pattern-match on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestError {
    #[error("host is offline")]
    Offline,

    #[error("no route to {url}")]
    NoRoute { url: String },

    #[error("connection refused")]
    ConnectionRefused,

    #[error("request timed out")]
    Timeout,

    #[error("server returned status {status_code}")]
    ServerError { status_code: u16, body: Vec<u8> },

    #[error("{message}")]
    Other { message: String },
}

/// Tagged success/failure outcome of the request capability.
pub type RequestOutcome = Result<HttpResponse, RequestError>;
