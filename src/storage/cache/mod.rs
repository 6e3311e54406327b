pub mod error;
pub mod eviction_cache;
mod replacer;

pub use error::CacheError;
pub use eviction_cache::{CacheSnapshot, EvictionCache};
pub use replacer::RecordHandle;
