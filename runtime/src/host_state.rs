//! Per-instance mutable state held in the Wasmtime Store.
//!
//! `HostState` combines the capability set, the pending-call table, the
//! background task set, and the queued guest resolutions into a single
//! struct that lives inside `Store<HostState>` for the lifetime of one
//! runtime instance. It is created at instantiation and dropped with the
//! instance — never partially reset.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use wasmtime::{StoreLimits, StoreLimitsBuilder};

use gangplank_hostapi::HostCapabilities;

use crate::config::BridgeConfig;
use crate::fatptr::FatPtr;
use crate::pending::PendingTable;

/// One background capability operation: yields the guest-awaited
/// placeholder together with the serialized outcome, or the internal
/// fault that prevented producing one.
pub(crate) type BackgroundTask = BoxFuture<'static, (FatPtr, anyhow::Result<Vec<u8>>)>;

/// Mutable state behind `Store<HostState>`.
pub struct HostState {
    /// The capability set wired in at initialization.
    pub(crate) capabilities: Arc<dyn HostCapabilities>,
    /// Outstanding placeholders in both directions.
    pub(crate) pending: PendingTable,
    /// In-flight asynchronous import operations.
    pub(crate) tasks: FuturesUnordered<BackgroundTask>,
    /// Resolutions the guest queued while it had control. Drained by the
    /// runtime after control returns to the host, never applied
    /// re-entrantly.
    pub(crate) resolutions: Vec<(FatPtr, Option<FatPtr>)>,
    /// Memory growth limits enforced by the store.
    pub(crate) limits: StoreLimits,
}

impl HostState {
    pub(crate) fn new(capabilities: Arc<dyn HostCapabilities>, config: &BridgeConfig) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .build();
        Self {
            capabilities,
            pending: PendingTable::new(),
            tasks: FuturesUnordered::new(),
            resolutions: Vec::new(),
            limits,
        }
    }
}
