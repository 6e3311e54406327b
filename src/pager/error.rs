use thiserror::Error;
use crate::common::types::OwnerId;
use crate::storage::cache::CacheError;
use crate::storage::frame::FrameError;
use crate::storage::swap::SwapError;

#[derive(Error, Debug)]
pub enum PagerError {
    #[error("Eviction cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Swap error: {0}")]
    Swap(#[from] SwapError),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Out of physical memory")]
    OutOfMemory,
    #[error("Owner {0} has exited")]
    OwnerExited(OwnerId),
}

pub type Result<T> = std::result::Result<T, PagerError>;
