//! Bridge runtime — Wasmtime engine, module loading, and the export
//! bridge.
//!
//! The `Runtime` struct is the main entry point. It loads a plugin,
//! validates its ABI, wires the import bridge, and exposes the guest's
//! `__gp_fn_*` exports as host-callable asynchronous operations.
//!
//! Execution is single-threaded and cooperative: the guest runs only
//! while the host is inside a wasmtime call, and suspension happens only
//! in [`Runtime::drive_one`] while awaiting background capability
//! operations. A fatal protocol fault poisons the instance; the only
//! recovery is dropping it and creating a new runtime with a freshly
//! instantiated guest module.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use wasmtime::{Config, Engine, Func, Linker, Module, Store, TypedFunc, Val};

use gangplank_hostapi::HostCapabilities;

use crate::codec;
use crate::config::BridgeConfig;
use crate::error::RuntimeError;
use crate::fatptr::FatPtr;
use crate::host_state::HostState;
use crate::imports::register_host_functions;
use crate::memory::GuestAllocator;
use crate::pending::{PendingValue, Waiter};
use crate::validation::{validate_module, FN_PREFIX, RESOLVE_EXPORT};

/// Boundary encoding of an absent value (msgpack nil), delivered when a
/// call resolves with a null result handle.
const NIL_PAYLOAD: &[u8] = &[0xc0];

/// A live guest plugin instance plus the bridge machinery around it.
pub struct Runtime {
    store: Store<HostState>,
    allocator: GuestAllocator,
    resolve: TypedFunc<(u64, u64), ()>,
    functions: HashMap<String, Func>,
    poisoned: bool,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Instantiate a plugin and wire the import bridge.
    ///
    /// Validates the module ABI first; a missing or ill-typed required
    /// export fails here and no runtime is produced. The capability set
    /// is passed explicitly — there is no process-wide registry.
    pub fn new(
        wasm_bytes: &[u8],
        capabilities: Arc<dyn HostCapabilities>,
        config: BridgeConfig,
    ) -> Result<Self, RuntimeError> {
        let engine = create_engine(&config)?;
        let module = Module::new(&engine, wasm_bytes)?;
        validate_module(&module)?;

        let mut linker = Linker::new(&engine);
        register_host_functions(&mut linker)?;

        let mut store = Store::new(&engine, HostState::new(capabilities, &config));
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = config.fuel_limit {
            store.set_fuel(fuel)?;
        }

        let instance = linker.instantiate(&mut store, &module)?;
        let allocator = GuestAllocator::from_instance(&instance, &mut store)?;
        let resolve = instance.get_typed_func::<(u64, u64), ()>(&mut store, RESOLVE_EXPORT)?;

        let mut functions = HashMap::new();
        for export in module.exports() {
            if let Some(name) = export.name().strip_prefix(FN_PREFIX) {
                if let Some(func) = instance.get_func(&mut store, export.name()) {
                    functions.insert(name.to_owned(), func);
                }
            }
        }

        Ok(Self {
            store,
            allocator,
            resolve,
            functions,
            poisoned: false,
        })
    }

    /// Whether the guest offers a function under `name`.
    ///
    /// Absence of an optional export is "capability not offered", never an
    /// error, and does not affect other operations.
    pub fn offered(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Names of all offered guest functions.
    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Number of outstanding placeholders, in both directions.
    pub fn pending_calls(&self) -> usize {
        self.store.data().pending.len()
    }

    /// Invoke a guest function with pre-encoded argument payloads.
    ///
    /// Returns `Ok(None)` when the guest does not offer `name`. Otherwise
    /// places each argument in guest memory, calls the export, registers
    /// the returned placeholder, and hands back the awaitable. Resolutions
    /// the guest queued during the call — including resolving its own
    /// placeholder before returning — are applied before this returns.
    pub fn invoke_raw(
        &mut self,
        name: &str,
        args: &[Vec<u8>],
    ) -> Result<Option<PendingValue>, RuntimeError> {
        self.check_poisoned()?;
        let Some(func) = self.functions.get(name).cloned() else {
            return Ok(None);
        };

        let arity = func.ty(&self.store).params().len();
        if arity != args.len() {
            return Err(RuntimeError::ValidationError(format!(
                "guest function '{}' takes {} arguments, {} supplied",
                name,
                arity,
                args.len()
            )));
        }

        let result = self.dispatch(&func, args);
        self.poison_on_err(result).map(Some)
    }

    /// Invoke a guest function and await its decoded result, driving
    /// background work as needed.
    pub async fn invoke<T: DeserializeOwned>(
        &mut self,
        name: &str,
        args: &[Vec<u8>],
    ) -> Result<Option<T>, RuntimeError> {
        let Some(mut pending) = self.invoke_raw(name, args)? else {
            return Ok(None);
        };
        loop {
            if let Some(payload) = pending.try_take()? {
                return codec::decode(&payload).map(Some);
            }
            if !self.drive_one().await? {
                self.poisoned = true;
                return Err(RuntimeError::Stalled);
            }
        }
    }

    /// One scheduler step: deliver the next completed background
    /// operation to the guest and apply any resolutions it queues.
    ///
    /// Returns `Ok(false)` when no background work remains. There is no
    /// timeout: a stalled capability operation keeps this pending
    /// indefinitely.
    pub async fn drive_one(&mut self) -> Result<bool, RuntimeError> {
        self.check_poisoned()?;
        let result = self.step().await;
        self.poison_on_err(result)
    }

    /// Drive until every background operation has completed.
    pub async fn drive(&mut self) -> Result<(), RuntimeError> {
        while self.drive_one().await? {}
        Ok(())
    }

    fn dispatch(&mut self, func: &Func, args: &[Vec<u8>]) -> Result<PendingValue, RuntimeError> {
        let mut params = Vec::with_capacity(args.len());
        for payload in args {
            let handle = self.allocator.place(&mut self.store, payload)?;
            params.push(Val::I64(handle.raw() as i64));
        }

        let mut results = [Val::I64(0)];
        handle_trap(func.call(&mut self.store, &params, &mut results))?;

        // By protocol convention the returned handle is always a
        // placeholder, even when the guest resolved it before returning.
        let placeholder = match results[0] {
            Val::I64(raw) => FatPtr::from_raw(raw as u64),
            _ => {
                return Err(RuntimeError::ValidationError(
                    "guest function returned a non-i64 value".into(),
                ));
            }
        };
        let pending = self.store.data_mut().pending.register_host(placeholder)?;
        self.drain_resolutions()?;
        Ok(pending)
    }

    async fn step(&mut self) -> Result<bool, RuntimeError> {
        self.drain_resolutions()?;

        let completion = {
            let state = self.store.data_mut();
            if state.tasks.is_empty() {
                return Ok(false);
            }
            state.tasks.next().await
        };
        let Some((placeholder, outcome)) = completion else {
            return Ok(false);
        };

        match outcome {
            Ok(payload) => self.deliver(placeholder, &payload)?,
            Err(fault) => {
                // Known limitation: an internal capability fault leaves
                // the placeholder permanently unresolved and its table
                // entry leaked until teardown.
                tracing::error!(%placeholder, error = %fault, "background capability operation faulted");
            }
        }

        self.drain_resolutions()?;
        Ok(true)
    }

    /// Deliver a background result to the guest's resolution export.
    fn deliver(&mut self, placeholder: FatPtr, payload: &[u8]) -> Result<(), RuntimeError> {
        match self.store.data_mut().pending.complete(placeholder) {
            Some(Waiter::Guest) => {}
            Some(Waiter::Host(_)) | None => {
                return Err(RuntimeError::UnknownPlaceholder(placeholder));
            }
        }
        let result = self.allocator.place(&mut self.store, payload)?;
        handle_trap(self.resolve.call(&mut self.store, (placeholder.raw(), result.raw())))
    }

    /// Apply resolutions the guest queued while it had control.
    ///
    /// Loops because releasing a result buffer re-enters guest code,
    /// which may queue further resolutions.
    fn drain_resolutions(&mut self) -> Result<(), RuntimeError> {
        loop {
            let queued = std::mem::take(&mut self.store.data_mut().resolutions);
            if queued.is_empty() {
                return Ok(());
            }
            for (placeholder, result) in queued {
                match self.store.data_mut().pending.complete(placeholder) {
                    Some(Waiter::Host(sender)) => {
                        let payload = match result {
                            Some(handle) => {
                                self.allocator.read_and_release(&mut self.store, handle)?
                            }
                            None => NIL_PAYLOAD.to_vec(),
                        };
                        // The caller may have dropped its awaitable.
                        let _ = sender.send(payload);
                    }
                    Some(Waiter::Guest) | None => {
                        return Err(RuntimeError::UnknownPlaceholder(placeholder));
                    }
                }
            }
        }
    }

    fn check_poisoned(&self) -> Result<(), RuntimeError> {
        if self.poisoned {
            return Err(RuntimeError::Poisoned);
        }
        Ok(())
    }

    fn poison_on_err<T>(&mut self, result: Result<T, RuntimeError>) -> Result<T, RuntimeError> {
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }
}

/// Create a Wasmtime engine for the bridge.
fn create_engine(config: &BridgeConfig) -> Result<Engine, RuntimeError> {
    let mut wasm_config = Config::new();
    wasm_config.consume_fuel(config.fuel_limit.is_some());
    Ok(Engine::new(&wasm_config)?)
}

/// Convert a guest call failure back into a `RuntimeError`.
///
/// Faults raised inside import handlers travel out of wasmtime as the
/// original `RuntimeError`; genuine guest traps are mapped to
/// `FuelExhausted` or `GuestTrapped`.
fn handle_trap<R>(result: Result<R, anyhow::Error>) -> Result<R, RuntimeError> {
    match result {
        Ok(val) => Ok(val),
        Err(e) => match e.downcast::<RuntimeError>() {
            Ok(inner) => Err(inner),
            Err(e) => {
                if matches!(e.downcast_ref::<wasmtime::Trap>(), Some(wasmtime::Trap::OutOfFuel)) {
                    return Err(RuntimeError::FuelExhausted);
                }
                Err(RuntimeError::GuestTrapped(format!("{}", e)))
            }
        },
    }
}
