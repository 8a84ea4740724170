mod memory;
pub mod notify;

pub use memory::{MemoryStore, StoreError};
