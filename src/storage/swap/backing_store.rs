use crate::common::types::{OwnerId, PageBuf, PageIdentity, SlotId};
use crate::storage::swap::error::SwapError;

/// Holding area for the bytes of evicted pages.
///
/// Implementations guard their slot table with their own lock; all
/// operations are atomic with respect to each other. A slot is released
/// before (or together with) handing its bytes back, never after.
pub trait BackingStore: Send + Sync {
    /// Claim a free slot for `identity` and write one full page into it.
    /// A failed write leaves no slot occupied.
    fn reserve_and_write(&self, identity: PageIdentity, page: &PageBuf) -> Result<SlotId, SwapError>;

    /// Copy the page held for `identity` into `page` and free its slot.
    /// Returns the slot that was freed.
    fn read_and_release(&self, identity: PageIdentity, page: &mut PageBuf) -> Result<SlotId, SwapError>;

    /// Free every slot held by `owner` without reading it back.
    /// Returns the number of slots freed.
    fn release_all(&self, owner: OwnerId) -> Result<usize, SwapError>;

    fn contains(&self, identity: PageIdentity) -> bool;

    /// Number of occupied slots belonging to `owner`
    fn occupied(&self, owner: OwnerId) -> usize;

    /// Slot capacity (per owner for partitioned stores)
    fn capacity(&self) -> usize;
}
