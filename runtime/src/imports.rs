//! Host function registration via Wasmtime linker.
//!
//! Registers the fixed `gangplank_host` import namespace. Each entry point:
//! 1. Extracts the allocator proxy and HostState from the Caller
//! 2. Reads and releases its serialized argument, if any
//! 3. Performs (or schedules) the capability operation
//! 4. Returns a handle to the serialized result, or a placeholder
//!
//! Synchronous imports (`log`, `now`, `random`) answer before the guest's
//! call returns. The asynchronous import (`make_request`) registers a
//! guest-awaited placeholder and pushes a background task; the runtime
//! delivers the result later through the guest's resolution export.
//!
//! Protocol faults inside a handler (bad handle, malformed payload) trap
//! the guest; the originating `RuntimeError` is recovered from the trap by
//! the runtime.

use wasmtime::{Caller, Linker};

use gangplank_hostapi::HttpRequest;

use crate::codec;
use crate::error::RuntimeError;
use crate::fatptr::FatPtr;
use crate::host_state::HostState;
use crate::memory::GuestAllocator;
use crate::validation::IMPORT_MODULE;

/// Register all `gangplank_host` functions with the linker.
pub fn register_host_functions(linker: &mut Linker<HostState>) -> Result<(), RuntimeError> {
    register_log(linker)?;
    register_make_request(linker)?;
    register_now(linker)?;
    register_random(linker)?;
    register_resolve_async(linker)?;
    Ok(())
}

// ── Synchronous imports ──

fn register_log(linker: &mut Linker<HostState>) -> Result<(), RuntimeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "log",
        |mut caller: Caller<'_, HostState>, message_ptr: u64| -> anyhow::Result<()> {
            let alloc = GuestAllocator::from_caller(&mut caller)?;
            let payload = alloc.read_and_release(&mut caller, FatPtr::from_raw(message_ptr))?;
            let message: String = codec::decode(&payload)?;
            caller.data().capabilities.log(&message);
            Ok(())
        },
    )?;
    Ok(())
}

fn register_now(linker: &mut Linker<HostState>) -> Result<(), RuntimeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "now",
        |mut caller: Caller<'_, HostState>| -> anyhow::Result<u64> {
            let timestamp = caller.data().capabilities.now();
            let payload = codec::encode(&timestamp)?;
            let alloc = GuestAllocator::from_caller(&mut caller)?;
            Ok(alloc.place(&mut caller, &payload)?.raw())
        },
    )?;
    Ok(())
}

fn register_random(linker: &mut Linker<HostState>) -> Result<(), RuntimeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "random",
        |mut caller: Caller<'_, HostState>, len: u32| -> anyhow::Result<u64> {
            let bytes = caller.data().capabilities.random(len);
            let payload = codec::encode(&bytes)?;
            let alloc = GuestAllocator::from_caller(&mut caller)?;
            Ok(alloc.place(&mut caller, &payload)?.raw())
        },
    )?;
    Ok(())
}

// ── Asynchronous import ──

fn register_make_request(linker: &mut Linker<HostState>) -> Result<(), RuntimeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "make_request",
        |mut caller: Caller<'_, HostState>, request_ptr: u64| -> anyhow::Result<u64> {
            let alloc = GuestAllocator::from_caller(&mut caller)?;
            let payload = alloc.read_and_release(&mut caller, FatPtr::from_raw(request_ptr))?;
            let request: HttpRequest = codec::decode(&payload)?;

            let placeholder = alloc.allocate_placeholder(&mut caller)?;
            let state = caller.data_mut();
            state.pending.register_guest(placeholder)?;

            let operation = state.capabilities.make_request(request);
            state.tasks.push(Box::pin(async move {
                let outcome = match operation.await {
                    Ok(outcome) => codec::encode(&outcome).map_err(anyhow::Error::from),
                    Err(fault) => Err(fault),
                };
                (placeholder, outcome)
            }));

            Ok(placeholder.raw())
        },
    )?;
    Ok(())
}

// ── Resolution entry point (guest → host) ──

fn register_resolve_async(linker: &mut Linker<HostState>) -> Result<(), RuntimeError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "resolve_async",
        |mut caller: Caller<'_, HostState>, placeholder: u64, result_ptr: u64| {
            let result = match result_ptr {
                0 => None,
                raw => Some(FatPtr::from_raw(raw)),
            };
            caller
                .data_mut()
                .resolutions
                .push((FatPtr::from_raw(placeholder), result));
        },
    )?;
    Ok(())
}
