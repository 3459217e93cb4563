//! Deterministic in-memory capability set for testing.
//!
//! `StubCapabilities` implements `HostCapabilities` with a fixed clock, a
//! counting byte sequence for randomness, and a scripted queue of request
//! outcomes. Logs and issued requests are recorded for later assertion.
//! Useful for unit tests and integration tests where real capability
//! backends are not needed.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::traits::HostCapabilities;
use crate::types::{HttpRequest, HttpResponse, RequestOutcome, Timestamp};

/// Scripted capability set backed by in-memory state.
///
/// `make_request` pops outcomes from a queue in FIFO order; when the queue
/// is empty it answers with an empty `200` response.
#[derive(Debug, Default)]
pub struct StubCapabilities {
    clock: Timestamp,
    logs: Mutex<Vec<String>>,
    requests: Mutex<Vec<HttpRequest>>,
    outcomes: Mutex<VecDeque<anyhow::Result<RequestOutcome>>>,
}

impl StubCapabilities {
    /// Create a stub with a fixed reference clock.
    pub fn new() -> Self {
        Self::with_clock(Timestamp(1_700_000_000_000))
    }

    /// Create a stub reporting `clock` from `now()`.
    pub fn with_clock(clock: Timestamp) -> Self {
        Self {
            clock,
            logs: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            outcomes: Mutex::new(VecDeque::new()),
        }
    }

    /// Script the outcome of the next unscripted `make_request` call.
    pub fn push_outcome(&self, outcome: anyhow::Result<RequestOutcome>) {
        self.outcomes.lock().expect("outcome queue poisoned").push_back(outcome);
    }

    /// Log lines delivered so far, in delivery order.
    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().expect("log buffer poisoned").clone()
    }

    /// Requests issued so far, in issue order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

impl HostCapabilities for StubCapabilities {
    fn log(&self, message: &str) {
        self.logs.lock().expect("log buffer poisoned").push(message.to_owned());
    }

    fn make_request(&self, request: HttpRequest) -> BoxFuture<'static, anyhow::Result<RequestOutcome>> {
        self.requests.lock().expect("request log poisoned").push(request);
        let outcome = self
            .outcomes
            .lock()
            .expect("outcome queue poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(Ok(HttpResponse {
                    status_code: 200,
                    headers: HashMap::new(),
                    body: Vec::new(),
                }))
            });
        futures::future::ready(outcome).boxed()
    }

    fn now(&self) -> Timestamp {
        self.clock
    }

    fn random(&self, len: u32) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }
}
