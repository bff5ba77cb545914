//! Persistence Adapters - Latch Storage
//!
//! Implements the `LatchStore` port with an atomically rewritten JSON
//! file, plus an in-memory store for tests and ephemeral runs.
//! No database dependency — lightweight and crash-safe.

pub mod file_store;
pub mod memory;

pub use file_store::FileLatchStore;
pub use memory::MemoryLatchStore;
