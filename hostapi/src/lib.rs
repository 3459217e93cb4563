//! `gangplank-hostapi` — capability trait and boundary payload types for the
//! gangplank WASM plugin bridge.
//!
//! This crate defines the host-side surface that the bridge calls through
//! when a guest plugin invokes a host function. It provides:
//!
//! - `HostCapabilities` trait — the capability set wired into a runtime
//! - Boundary payload types — `HttpRequest`, `HttpResponse`, `RequestError`,
//!   `Timestamp`
//! - `StubCapabilities` — deterministic in-memory capability set for testing
//!
//! Domain-level failures (`RequestError`) are ordinary serde values that
//! cross the guest boundary like any other payload. They are deliberately
//! separate from the bridge's own fatal error type, which lives in
//! `gangplank-runtime`.

pub mod stub;
pub mod traits;
pub mod types;

// Re-export commonly used types at the crate root.
pub use stub::StubCapabilities;
pub use traits::HostCapabilities;
pub use types::{HttpRequest, HttpResponse, RequestError, RequestMethod, RequestOutcome, Timestamp};
