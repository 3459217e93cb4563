//! `gangplank-runtime` — Wasmtime-based host bridge for gangplank WASM plugins.
//!
//! This crate loads, validates, and runs a gangplank plugin inside a
//! Wasmtime instance and bridges structured data across the linear-memory
//! boundary. It provides:
//!
//! - **Fat pointers:** a packed (address, length) handle into guest memory
//! - **Boundary codec:** MessagePack serialization for every crossing value
//! - **Allocator proxy:** host-driven allocation in guest memory through
//!   the guest's exported allocate/free pair
//! - **Pending-call table:** one-shot completion tracking for calls that
//!   cannot finish synchronously, in either direction
//! - **Import bridge:** the `gangplank_host` namespace of host capabilities
//! - **Export bridge:** guest functions wrapped as host-callable
//!   asynchronous operations
//!
//! The primary entry point is [`Runtime::new`].

pub mod codec;
pub mod config;
pub mod error;
pub mod fatptr;
pub mod host_state;
pub mod imports;
pub mod memory;
pub mod pending;
pub mod runtime;
pub mod validation;

pub use config::BridgeConfig;
pub use error::RuntimeError;
pub use fatptr::FatPtr;
pub use pending::PendingValue;
pub use runtime::Runtime;
