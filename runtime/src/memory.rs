//! Guest memory access — bounds-checked reads/writes and the allocator
//! proxy.
//!
//! The host never touches guest linear memory except through a region it
//! just allocated via the guest's exported allocator, or a region whose
//! handle it currently holds and has not yet released. All raw accesses
//! validate the handle against the current memory size; an out-of-range
//! handle is a fatal `MemoryError`.

use wasmtime::{AsContextMut, Caller, Extern, Instance, Memory, TypedFunc};

use crate::error::RuntimeError;
use crate::fatptr::FatPtr;
use crate::host_state::HostState;
use crate::validation::{FREE_EXPORT, MALLOC_EXPORT, MEMORY_EXPORT};

/// Size in bytes of an async placeholder slot: a status tag plus room for
/// a nested handle.
pub const ASYNC_SLOT_LEN: u32 = 12;

/// Read `len` bytes from guest memory at `addr`.
pub fn read_bytes(mem: &[u8], addr: u32, len: u32) -> Result<Vec<u8>, RuntimeError> {
    let start = addr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or_else(|| out_of_bounds(addr, len))?;
    if end > mem.len() {
        return Err(out_of_bounds(addr, len));
    }
    Ok(mem[start..end].to_vec())
}

/// Write `data` to guest memory at `addr`.
pub fn write_bytes(mem: &mut [u8], addr: u32, data: &[u8]) -> Result<(), RuntimeError> {
    let start = addr as usize;
    let end = start
        .checked_add(data.len())
        .ok_or_else(|| out_of_bounds(addr, data.len() as u32))?;
    if end > mem.len() {
        return Err(out_of_bounds(addr, data.len() as u32));
    }
    mem[start..end].copy_from_slice(data);
    Ok(())
}

fn out_of_bounds(addr: u32, len: u32) -> RuntimeError {
    RuntimeError::MemoryError(format!("range {} out of bounds", FatPtr::pack(addr, len)))
}

/// Proxy over the guest's exported memory and allocate/free pair.
///
/// Whichever side allocates a serialized payload owns it until the
/// consuming side deserializes it; the consumer then releases it
/// immediately via [`GuestAllocator::read_and_release`]. No payload buffer
/// outlives a single decode.
#[derive(Clone)]
pub struct GuestAllocator {
    memory: Memory,
    malloc: TypedFunc<u32, u64>,
    free: TypedFunc<u64, ()>,
}

impl GuestAllocator {
    /// Resolve the allocator exports from a freshly instantiated module.
    pub fn from_instance(
        instance: &Instance,
        mut store: impl AsContextMut,
    ) -> Result<Self, RuntimeError> {
        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| missing(MEMORY_EXPORT))?;
        let malloc = instance.get_typed_func::<u32, u64>(&mut store, MALLOC_EXPORT)?;
        let free = instance.get_typed_func::<u64, ()>(&mut store, FREE_EXPORT)?;
        Ok(Self { memory, malloc, free })
    }

    /// Resolve the allocator exports from inside an import handler.
    pub fn from_caller(caller: &mut Caller<'_, HostState>) -> Result<Self, RuntimeError> {
        let memory = caller
            .get_export(MEMORY_EXPORT)
            .and_then(Extern::into_memory)
            .ok_or_else(|| missing(MEMORY_EXPORT))?;
        let malloc = caller
            .get_export(MALLOC_EXPORT)
            .and_then(Extern::into_func)
            .ok_or_else(|| missing(MALLOC_EXPORT))?
            .typed::<u32, u64>(&mut *caller)?;
        let free = caller
            .get_export(FREE_EXPORT)
            .and_then(Extern::into_func)
            .ok_or_else(|| missing(FREE_EXPORT))?
            .typed::<u64, ()>(&mut *caller)?;
        Ok(Self { memory, malloc, free })
    }

    /// Ask the guest allocator for `len` writable bytes.
    pub fn allocate(&self, mut store: impl AsContextMut, len: u32) -> Result<FatPtr, RuntimeError> {
        let fat = FatPtr::from_raw(self.malloc.call(&mut store, len)?);
        if fat.is_null() && len > 0 {
            return Err(RuntimeError::MemoryError(format!(
                "guest allocator returned null for {} bytes",
                len
            )));
        }
        let (addr, got) = fat.unpack();
        if got < len {
            return Err(RuntimeError::MemoryError(format!(
                "guest allocator returned {} bytes, {} requested",
                got, len
            )));
        }
        let size = self.memory.data(&mut store).len();
        validate_handle(size, addr, got)?;
        Ok(fat)
    }

    /// Ask the guest deallocator to free the region behind `fat`.
    pub fn release(&self, mut store: impl AsContextMut, fat: FatPtr) -> Result<(), RuntimeError> {
        self.free.call(&mut store, fat.raw())?;
        Ok(())
    }

    /// Allocate guest memory and copy `bytes` into it.
    pub fn place(&self, mut store: impl AsContextMut, bytes: &[u8]) -> Result<FatPtr, RuntimeError> {
        let fat = self.allocate(&mut store, bytes.len() as u32)?;
        write_bytes(self.memory.data_mut(&mut store), fat.addr(), bytes)?;
        Ok(fat)
    }

    /// Copy out the bytes behind `fat`, then release the region.
    pub fn read_and_release(
        &self,
        mut store: impl AsContextMut,
        fat: FatPtr,
    ) -> Result<Vec<u8>, RuntimeError> {
        let (addr, len) = fat.unpack();
        let bytes = read_bytes(self.memory.data(&mut store), addr, len)?;
        self.free.call(&mut store, fat.raw())?;
        Ok(bytes)
    }

    /// Allocate and zero a fresh async placeholder slot.
    pub fn allocate_placeholder(&self, mut store: impl AsContextMut) -> Result<FatPtr, RuntimeError> {
        let fat = self.allocate(&mut store, ASYNC_SLOT_LEN)?;
        write_bytes(
            self.memory.data_mut(&mut store),
            fat.addr(),
            &[0u8; ASYNC_SLOT_LEN as usize],
        )?;
        Ok(fat)
    }
}

fn missing(name: &str) -> RuntimeError {
    RuntimeError::MemoryError(format!("guest did not export '{}'", name))
}

fn validate_handle(mem_size: usize, addr: u32, len: u32) -> Result<(), RuntimeError> {
    let end = (addr as usize)
        .checked_add(len as usize)
        .ok_or_else(|| out_of_bounds(addr, len))?;
    if end > mem_size {
        return Err(out_of_bounds(addr, len));
    }
    Ok(())
}
