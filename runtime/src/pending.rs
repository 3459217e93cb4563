//! Pending-call table — completion tracking for in-flight placeholders.
//!
//! Every call that cannot finish synchronously leaves a placeholder handle
//! behind, in one of two directions:
//!
//! - **Host waiter:** the host invoked a guest function and awaits the
//!   placeholder the guest returned. Resolution arrives through the
//!   guest's `resolve_async` import and is delivered over a one-shot
//!   channel.
//! - **Guest waiter:** the guest issued an asynchronous import and awaits
//!   the placeholder the host returned. Resolution is delivered by calling
//!   the guest's resolution export when the background operation finishes.
//!
//! A placeholder moves Pending → Resolved exactly once; it can be neither
//! resolved twice nor canceled. Resolving a handle with no entry is a
//! fatal protocol violation, surfaced by the runtime.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::codec;
use crate::error::RuntimeError;
use crate::fatptr::FatPtr;

/// Who is waiting on a placeholder, and how to complete it.
pub(crate) enum Waiter {
    /// A host caller awaits the raw result payload.
    Host(oneshot::Sender<Vec<u8>>),
    /// The guest awaits delivery via its resolution export.
    Guest,
}

/// Registry mapping outstanding placeholders to their completion path.
#[derive(Default)]
pub struct PendingTable {
    entries: HashMap<FatPtr, Waiter>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a host-awaited placeholder, returning its awaitable.
    pub(crate) fn register_host(&mut self, handle: FatPtr) -> Result<PendingValue, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.insert(handle, Waiter::Host(tx))?;
        Ok(PendingValue { rx })
    }

    /// Register a guest-awaited placeholder for an in-flight import.
    pub(crate) fn register_guest(&mut self, handle: FatPtr) -> Result<(), RuntimeError> {
        self.insert(handle, Waiter::Guest)
    }

    fn insert(&mut self, handle: FatPtr, waiter: Waiter) -> Result<(), RuntimeError> {
        if self.entries.insert(handle, waiter).is_some() {
            return Err(RuntimeError::DuplicatePlaceholder(handle));
        }
        Ok(())
    }

    /// Remove and return the entry for `handle`, if any.
    pub(crate) fn complete(&mut self, handle: FatPtr) -> Option<Waiter> {
        self.entries.remove(&handle)
    }

    /// Number of outstanding placeholders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no call is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One-shot awaitable for the result of a guest function call.
///
/// The payload is the raw boundary encoding; a call resolved with a null
/// handle carries the nil payload, which decodes as `()` or `None`.
#[derive(Debug)]
pub struct PendingValue {
    rx: oneshot::Receiver<Vec<u8>>,
}

impl PendingValue {
    /// Non-blocking poll: `Ok(Some(payload))` once resolved, `Ok(None)`
    /// while still pending, `Err(TornDown)` if the runtime was dropped.
    pub fn try_take(&mut self) -> Result<Option<Vec<u8>>, RuntimeError> {
        match self.rx.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(RuntimeError::TornDown),
        }
    }

    /// Await the resolved payload and decode it.
    pub async fn value<T: DeserializeOwned>(self) -> Result<T, RuntimeError> {
        let payload = self.rx.await.map_err(|_| RuntimeError::TornDown)?;
        codec::decode(&payload)
    }

    /// Await resolution, discarding the payload.
    pub async fn done(self) -> Result<(), RuntimeError> {
        self.rx.await.map_err(|_| RuntimeError::TornDown)?;
        Ok(())
    }
}
