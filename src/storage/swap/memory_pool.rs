use std::collections::{BTreeSet, HashMap};
use log::{debug, info};
use parking_lot::Mutex;

use crate::common::types::{OwnerId, PageBuf, PageIdentity, SlotId};
use crate::storage::swap::backing_store::BackingStore;
use crate::storage::swap::error::SwapError;

/// Default number of slots in the shared pool
pub const DEFAULT_POOL_SLOTS: usize = 1024;

struct SwapSlot {
    identity: PageIdentity,
    data: Box<PageBuf>,
}

struct PoolState {
    slots: Vec<Option<SwapSlot>>,
    free: BTreeSet<SlotId>,
    index: HashMap<PageIdentity, SlotId>,
}

/// Shared in-memory swap pool.
///
/// One bounded slot table for all owners; each occupied slot carries the
/// identity of the page it holds. Slots are handed out lowest-free first.
pub struct MemorySwapPool {
    capacity: usize,
    state: Mutex<PoolState>,
}

impl MemorySwapPool {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        info!("swap pool: initialized {} slots", capacity);

        Self {
            capacity,
            state: Mutex::new(PoolState {
                slots,
                free: (0..capacity).collect(),
                index: HashMap::new(),
            }),
        }
    }

    /// Total occupied slots across all owners
    pub fn occupied_total(&self) -> usize {
        self.state.lock().index.len()
    }
}

impl Default for MemorySwapPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SLOTS)
    }
}

impl BackingStore for MemorySwapPool {
    fn reserve_and_write(&self, identity: PageIdentity, page: &PageBuf) -> Result<SlotId, SwapError> {
        let mut state = self.state.lock();

        if state.index.contains_key(&identity) {
            return Err(SwapError::AlreadySwapped(identity));
        }

        let slot = state.free.pop_first().ok_or(SwapError::StoreFull)?;
        state.slots[slot] = Some(SwapSlot {
            identity,
            data: Box::new(*page),
        });
        state.index.insert(identity, slot);

        debug!("swap out: {} -> slot {}", identity, slot);
        Ok(slot)
    }

    fn read_and_release(&self, identity: PageIdentity, page: &mut PageBuf) -> Result<SlotId, SwapError> {
        let mut state = self.state.lock();

        let slot = state.index.remove(&identity).ok_or(SwapError::NotFound(identity))?;
        let held = state.slots[slot].take().ok_or(SwapError::NotFound(identity))?;
        state.free.insert(slot);
        page.copy_from_slice(&held.data[..]);

        debug!("swap in: {} <- slot {}", identity, slot);
        Ok(slot)
    }

    fn release_all(&self, owner: OwnerId) -> Result<usize, SwapError> {
        let mut state = self.state.lock();

        let owned: Vec<(PageIdentity, SlotId)> = state
            .index
            .iter()
            .filter(|(identity, _)| identity.owner == owner)
            .map(|(&identity, &slot)| (identity, slot))
            .collect();

        for (identity, slot) in &owned {
            state.index.remove(identity);
            state.slots[*slot] = None;
            state.free.insert(*slot);
        }

        if !owned.is_empty() {
            info!("swap free: freed {} slots for PID={}", owned.len(), owner);
        }
        Ok(owned.len())
    }

    fn contains(&self, identity: PageIdentity) -> bool {
        self.state.lock().index.contains_key(&identity)
    }

    fn occupied(&self, owner: OwnerId) -> usize {
        self.state
            .lock()
            .index
            .keys()
            .filter(|identity| identity.owner == owner)
            .count()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
