pub mod backing_store;
pub mod error;
pub mod file_store;
pub mod memory_pool;

pub use backing_store::BackingStore;
pub use error::SwapError;
pub use file_store::FileSwapStore;
pub use memory_pool::MemorySwapPool;
