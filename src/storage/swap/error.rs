use thiserror::Error;
use crate::common::types::PageIdentity;

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Swap store is full")]
    StoreFull,
    #[error("No swap slot holds page {0}")]
    NotFound(PageIdentity),
    #[error("Page {0} already occupies a swap slot")]
    AlreadySwapped(PageIdentity),
    #[error("Swap I/O error: {0}")]
    Io(#[from] std::io::Error),
}
