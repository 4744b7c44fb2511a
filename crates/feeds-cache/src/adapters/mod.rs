//! Cache backend adapters.

pub mod failing;
pub mod memory;

pub use failing::FailingCacheBackend;
pub use memory::InMemoryCacheBackend;
