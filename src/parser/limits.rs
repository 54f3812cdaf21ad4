//! Implementation limits applied during validation.
//!
//! These limits are aligned with V8's limits from src/wasm/wasm-limits.h.
//! They prevent OOM attacks from malformed input claiming unrealistic counts,
//! and ensure compatibility with mainstream WebAssembly runtimes.

/// Maximum number of function parameters
pub const MAX_FUNCTION_PARAMS: u32 = 1_000;

/// Maximum number of function return values
pub const MAX_FUNCTION_RETURNS: u32 = 1_000;

/// Maximum memory size in 64 KiB pages for 32-bit addressing (4 GB)
pub const MAX_MEMORY_PAGES_32: u32 = 65_536;

/// Maximum table size, capped to the same page-index space as memory
pub const MAX_TABLE_ENTRIES: u32 = 65_536;
