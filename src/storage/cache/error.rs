use thiserror::Error;
use crate::common::types::PageIdentity;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Page {0} is already resident")]
    AlreadyResident(PageIdentity),
    #[error("Eviction cache is empty")]
    CacheEmpty,
}
