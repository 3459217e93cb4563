//! Host capability trait — the import namespace seen by the guest.
//!
//! The bridge exposes each method under a fixed name in the guest's import
//! table. A `HostCapabilities` implementation is constructed explicitly and
//! passed to the runtime at initialization; there is no process-wide
//! registry. The bridge owns all pointer and serialization handling — this
//! trait works with decoded Rust values only.

use futures::future::BoxFuture;

use crate::types::{HttpRequest, RequestOutcome, Timestamp};

/// The set of host functions callable from a guest plugin.
///
/// `log`, `now`, and `random` are synchronous imports: the guest receives
/// the result before its own call returns. `make_request` is asynchronous:
/// the guest receives a placeholder immediately and the result is delivered
/// later through its resolution entry point.
pub trait HostCapabilities: Send + Sync {
    /// Deliver one decoded log line emitted by the guest.
    fn log(&self, message: &str);

    /// Issue an outbound request on behalf of the guest.
    ///
    /// The outer `Result` is an unexpected internal fault in the capability
    /// itself (reported to the diagnostic sink, never delivered to the
    /// guest). Domain-level failures travel inside [`RequestOutcome`].
    fn make_request(&self, request: HttpRequest) -> BoxFuture<'static, anyhow::Result<RequestOutcome>>;

    /// Current wall-clock time.
    fn now(&self) -> Timestamp;

    /// A sequence of `len` random bytes.
    fn random(&self, len: u32) -> Vec<u8>;
}
