use std::path::PathBuf;

use crate::storage::swap::file_store::DEFAULT_SLOTS_PER_OWNER;
use crate::storage::swap::memory_pool::DEFAULT_POOL_SLOTS;

/// Which backing store the pager swaps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapConfig {
    /// One in-memory pool shared by all owners
    Memory { slots: usize },
    /// One swap file per owner under `dir`
    File { dir: PathBuf, slots_per_owner: usize },
}

impl SwapConfig {
    pub fn memory() -> Self {
        SwapConfig::Memory { slots: DEFAULT_POOL_SLOTS }
    }

    pub fn file(dir: impl Into<PathBuf>) -> Self {
        SwapConfig::File {
            dir: dir.into(),
            slots_per_owner: DEFAULT_SLOTS_PER_OWNER,
        }
    }
}

/// Configuration for the pager
#[derive(Debug, Clone)]
pub struct PagerConfig {
    /// Number of physical frames
    pub frame_count: usize,

    /// Frames in use at which memory pressure is reported
    pub user_page_limit: usize,

    /// Backing store selection
    pub swap: SwapConfig,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            frame_count: 64,
            user_page_limit: 40,
            swap: SwapConfig::memory(),
        }
    }
}
