//! Bridge error types.
//!
//! Only protocol-level faults live here. Domain-level failures
//! (`gangplank_hostapi::RequestError`) are ordinary serde values that
//! travel through the normal serialize/resolve path and never appear as a
//! `RuntimeError`. A fatal fault poisons the runtime instance: the only
//! recovery is dropping it and instantiating a fresh guest module.

use crate::fatptr::FatPtr;

/// Top-level error type for the runtime crate.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Wasmtime engine, compilation, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing exports, bad imports, etc.).
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Guest memory operation failed (out-of-bounds handle, grow failure).
    #[error("memory error: {0}")]
    MemoryError(String),

    /// A boundary value could not be serialized.
    #[error("payload encoding failed: {0}")]
    EncodeFailed(#[from] rmp_serde::encode::Error),

    /// A boundary payload could not be deserialized.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] rmp_serde::decode::Error),

    /// A resolution arrived for a handle with no registered host-side
    /// waiter. There is no cancellation path, so this always indicates a
    /// bridge bug or guest misbehavior.
    #[error("resolved unknown placeholder {0}")]
    UnknownPlaceholder(FatPtr),

    /// The same handle was registered in the pending-call table twice.
    #[error("placeholder {0} registered twice")]
    DuplicatePlaceholder(FatPtr),

    /// A host caller is awaiting a placeholder but no background work
    /// remains that could resolve it.
    #[error("no background work can resolve the outstanding call")]
    Stalled,

    /// An earlier protocol fault made this instance unusable.
    #[error("runtime poisoned by an earlier protocol fault")]
    Poisoned,

    /// The runtime was dropped while the call was still pending.
    #[error("runtime torn down before the call resolved")]
    TornDown,

    /// Fuel exhausted during guest execution.
    #[error("fuel exhausted (instruction limit)")]
    FuelExhausted,

    /// WASM guest trapped.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),
}
