//! Boundary object codec — MessagePack in self-describing (named) form.
//!
//! Every value crossing the guest boundary is encoded with this codec:
//! arguments, results, and nested tagged success/failure values. Malformed
//! bytes are a fatal protocol error (`RuntimeError::MalformedPayload`) —
//! a corrupt payload indicates a version or memory-corruption bug, not a
//! recoverable user error, so no partial recovery is attempted.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RuntimeError;

/// Serialize a value to its boundary representation.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RuntimeError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Deserialize a boundary payload into an expected shape.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RuntimeError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
