//! Shared test fixtures for integration tests.
//!
//! Provides a WAT plugin implementing the gangplank ABI with a bump
//! allocator and a set of guest functions exercising every bridge path,
//! plus factory helpers around `StubCapabilities`.

#![allow(dead_code)]

use std::sync::Arc;

use gangplank_hostapi::StubCapabilities;
use gangplank_runtime::{BridgeConfig, Runtime};

/// Test plugin.
///
/// Payloads are baked as MessagePack data segments below the bump
/// allocator's base:
///
/// - offset  0: `"ahoy"` — log line
/// - offset 16: `"done"` — completion payload
/// - offset 32: `"one"`, offset 48: `"two"` — concurrency payloads
/// - offset 64: an `HttpRequest` map (`GET http://plugin.test/data`)
///
/// Guest functions:
///
/// - `greet(msg)` — frees its argument, resolves with `"done"`
/// - `shout()` — logs `"ahoy"`, resolves with null
/// - `stamp()` / `roll()` — forward the `now` / `random` import result
/// - `fetch()` — issues `make_request`, resolves with `"done"` once the
///   outcome arrives (two-level pending nesting)
/// - `defer()` — returns a placeholder it never resolves on its own
/// - `flip()` — resolves the two deferred placeholders in reverse order
/// - `rogue()` — resolves a handle that was never registered
/// - `idle()` — returns a placeholder nothing will ever resolve
pub const PLUGIN_WAT: &str = r#"
(module
  (import "gangplank_host" "log" (func $log (param i64)))
  (import "gangplank_host" "make_request" (func $make_request (param i64) (result i64)))
  (import "gangplank_host" "now" (func $now (result i64)))
  (import "gangplank_host" "random" (func $random (param i32) (result i64)))
  (import "gangplank_host" "resolve_async" (func $host_resolve (param i64 i64)))

  (memory (export "memory") 2)

  (global $bump (mut i32) (i32.const 4096))
  (global $self (mut i64) (i64.const 0))
  (global $awaiting (mut i64) (i64.const 0))
  (global $p1 (mut i64) (i64.const 0))
  (global $p2 (mut i64) (i64.const 0))
  (global $deferred (mut i32) (i32.const 0))

  (data (i32.const 0) "\a4ahoy")
  (data (i32.const 16) "\a4done")
  (data (i32.const 32) "\a3one")
  (data (i32.const 48) "\a3two")
  (data (i32.const 64)
    "\84\a3url\b7http://plugin.test/data\a6method\a3GET\a7headers\c0\a4body\c0")

  (func $pack (param $ptr i32) (param $len i32) (result i64)
    (i64.or
      (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
      (i64.extend_i32_u (local.get $len))))

  (func $malloc (param $len i32) (result i64)
    (local $ptr i32)
    (local.set $ptr (global.get $bump))
    (global.set $bump
      (i32.add (global.get $bump)
        (i32.and (i32.add (local.get $len) (i32.const 7)) (i32.const -8))))
    (call $pack (local.get $ptr) (local.get $len)))
  (export "__gp_malloc" (func $malloc))

  (func $free (param i64))
  (export "__gp_free" (func $free))

  (func $new_self (result i64)
    (global.set $self (call $malloc (i32.const 12)))
    (global.get $self))

  (func (export "__gp_resolve_async") (param $ph i64) (param $res i64)
    (if (i64.ne (local.get $res) (i64.const 0))
      (then (call $free (local.get $res))))
    (if (i64.eq (local.get $ph) (global.get $awaiting))
      (then (call $host_resolve (global.get $self)
              (call $pack (i32.const 16) (i32.const 5))))))

  (func (export "__gp_fn_greet") (param $msg i64) (result i64)
    (call $free (local.get $msg))
    (drop (call $new_self))
    (call $host_resolve (global.get $self) (call $pack (i32.const 16) (i32.const 5)))
    (global.get $self))

  (func (export "__gp_fn_shout") (result i64)
    (call $log (call $pack (i32.const 0) (i32.const 5)))
    (drop (call $new_self))
    (call $host_resolve (global.get $self) (i64.const 0))
    (global.get $self))

  (func (export "__gp_fn_stamp") (result i64)
    (local $r i64)
    (local.set $r (call $now))
    (drop (call $new_self))
    (call $host_resolve (global.get $self) (local.get $r))
    (global.get $self))

  (func (export "__gp_fn_roll") (result i64)
    (local $r i64)
    (local.set $r (call $random (i32.const 8)))
    (drop (call $new_self))
    (call $host_resolve (global.get $self) (local.get $r))
    (global.get $self))

  (func (export "__gp_fn_fetch") (result i64)
    (global.set $awaiting
      (call $make_request (call $pack (i32.const 64) (i32.const 55))))
    (drop (call $new_self))
    (global.get $self))

  (func (export "__gp_fn_defer") (result i64)
    (local $p i64)
    (local.set $p (call $malloc (i32.const 12)))
    (if (i32.eqz (global.get $deferred))
      (then (global.set $p1 (local.get $p)))
      (else (global.set $p2 (local.get $p))))
    (global.set $deferred (i32.add (global.get $deferred) (i32.const 1)))
    (local.get $p))

  (func (export "__gp_fn_flip") (result i64)
    (call $host_resolve (global.get $p2) (call $pack (i32.const 48) (i32.const 4)))
    (call $host_resolve (global.get $p1) (call $pack (i32.const 32) (i32.const 4)))
    (drop (call $new_self))
    (call $host_resolve (global.get $self) (i64.const 0))
    (global.get $self))

  (func (export "__gp_fn_rogue") (result i64)
    (call $host_resolve (i64.const 0xdead) (i64.const 0))
    (drop (call $new_self))
    (call $host_resolve (global.get $self) (i64.const 0))
    (global.get $self))

  (func (export "__gp_fn_idle") (result i64)
    (call $malloc (i32.const 12)))
)
"#;

/// Instantiate the test plugin against a fresh stub capability set.
pub fn load_runtime() -> (Runtime, Arc<StubCapabilities>) {
    let stub = Arc::new(StubCapabilities::new());
    let runtime = Runtime::new(PLUGIN_WAT.as_bytes(), stub.clone(), BridgeConfig::default())
        .expect("test plugin must instantiate");
    (runtime, stub)
}

/// Encode a value with the boundary codec.
pub fn encode<T: serde::Serialize>(value: &T) -> Vec<u8> {
    gangplank_runtime::codec::encode(value).expect("test payload must encode")
}
