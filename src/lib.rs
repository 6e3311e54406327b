// mruswap: MRU page replacement with swap-backed eviction

pub mod common;
pub mod pager;
pub mod storage;
pub mod workload;

// Re-export key items for convenient access
pub use common::types::{FrameRef, OwnerId, PageBuf, PageIdentity, ResidentPage, Vpn, PAGE_SIZE};
pub use pager::{PageStats, Pager, PagerConfig, PagerError, SwapConfig};
pub use storage::cache::{CacheError, CacheSnapshot, EvictionCache};
pub use storage::frame::{FrameAllocator, FramePool};
pub use storage::swap::{BackingStore, FileSwapStore, MemorySwapPool, SwapError};
