//! Bridge configuration.

/// Configuration for a plugin runtime instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum linear memory pages the guest may grow to
    /// (1 page = 64 KiB). Default: 256 pages = 16 MiB.
    pub max_memory_pages: u32,

    /// Optional Wasmtime fuel limit (instruction metering).
    /// `None` disables metering; the guest may run unbounded compute.
    pub fuel_limit: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            fuel_limit: None,
        }
    }
}

impl BridgeConfig {
    /// Maximum guest memory size in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_pages as usize) * 65536
    }
}
