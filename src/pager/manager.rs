mod frame_management;
mod owner_lifecycle;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use log::{debug, error};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::common::types::{zeroed_page, FrameRef, OwnerId, PageBuf, PageIdentity, Vpn};
use crate::pager::config::{PagerConfig, SwapConfig};
use crate::pager::error::{PagerError, Result};
use crate::pager::stats::{PageStats, StatsCounters};
use crate::storage::cache::{CacheSnapshot, EvictionCache};
use crate::storage::frame::{FrameAllocator, FramePool};
use crate::storage::swap::{BackingStore, FileSwapStore, MemorySwapPool};

use frame_management::obtain_frame;

/// Per-owner bookkeeping.
///
/// The gate serializes the owner's faults, swap transfers of the owner's
/// pages and teardown. The pager never holds two gates at once.
pub(crate) struct OwnerEntry {
    pub(crate) gate: Mutex<OwnerGate>,
    pub(crate) stats: StatsCounters,
}

pub(crate) struct OwnerGate {
    pub(crate) exited: bool,
}

impl OwnerEntry {
    fn new() -> Self {
        Self {
            gate: Mutex::new(OwnerGate { exited: false }),
            stats: StatsCounters::default(),
        }
    }
}

/// Page lifecycle coordinator.
///
/// Moves pages between `Absent`, `Resident` and `Evicted` in response to
/// references and owner exits. The frame allocator and backing store are
/// only seen through their traits.
pub struct Pager {
    pub(crate) frames: Arc<dyn FrameAllocator>,
    pub(crate) cache: EvictionCache,
    pub(crate) store: Arc<dyn BackingStore>,
    pub(crate) owners: RwLock<HashMap<OwnerId, Arc<OwnerEntry>>>,
    /// Pages evicted from the cache whose bytes are not yet in the store
    pub(crate) in_transit: Mutex<HashSet<PageIdentity>>,
    pub(crate) transit_done: Condvar,
}

impl Pager {
    /// Build a pager with a `FramePool` and the configured backing store
    pub fn new(config: PagerConfig) -> Result<Self> {
        let frames: Arc<dyn FrameAllocator> =
            Arc::new(FramePool::new(config.frame_count, config.user_page_limit));

        let store: Arc<dyn BackingStore> = match config.swap {
            SwapConfig::Memory { slots } => Arc::new(MemorySwapPool::new(slots)),
            SwapConfig::File { dir, slots_per_owner } => {
                Arc::new(FileSwapStore::new(dir, slots_per_owner)?)
            }
        };

        Ok(Self::with_parts(frames, store))
    }

    /// Build a pager around any frame allocator and backing store
    pub fn with_parts(frames: Arc<dyn FrameAllocator>, store: Arc<dyn BackingStore>) -> Self {
        let cache = EvictionCache::new(frames.frame_count());
        Self {
            frames,
            cache,
            store,
            owners: RwLock::new(HashMap::new()),
            in_transit: Mutex::new(HashSet::new()),
            transit_done: Condvar::new(),
        }
    }

    /// Handle a reference to `(owner, vpn)` and return the frame holding it.
    ///
    /// Resident pages are touched. Otherwise the reference is a fault: a
    /// frame is obtained (evicting if memory is scarce) and the page is either
    /// swapped back in or zero-filled.
    pub fn on_reference(&self, owner: OwnerId, vpn: Vpn) -> Result<FrameRef> {
        let identity = PageIdentity::new(owner, vpn);
        let entry = self.owner_entry(owner);

        if let Some(frame) = self.touch_resident(identity) {
            return Ok(frame);
        }

        let frame = obtain_frame(self)?;

        let result = self.fault_in(identity, frame, &entry);
        match result {
            Ok(resident) => {
                if resident != frame {
                    // Another reference brought the page in first
                    self.frames.free(frame);
                }
                Ok(resident)
            }
            Err(e) => {
                self.frames.free(frame);
                Err(e)
            }
        }
    }

    /// Copy the contents of a page into `page`, faulting it in if needed
    pub fn read_page(&self, owner: OwnerId, vpn: Vpn, page: &mut PageBuf) -> Result<()> {
        self.with_resident_frame(owner, vpn, |frames, frame| Ok(frames.read_frame(frame, page)?))
    }

    /// Overwrite the contents of a page, faulting it in if needed
    pub fn write_page(&self, owner: OwnerId, vpn: Vpn, page: &PageBuf) -> Result<()> {
        self.with_resident_frame(owner, vpn, |frames, frame| Ok(frames.write_frame(frame, page)?))
    }

    /// Paging counters for `owner`, or `None` if the owner is unknown or exited
    pub fn stats(&self, owner: OwnerId) -> Option<PageStats> {
        self.owners.read().get(&owner).map(|entry| entry.stats.snapshot())
    }

    /// Residency order, most recent first
    pub fn dump(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    pub fn resident_count(&self) -> usize {
        self.cache.len()
    }

    pub fn is_resident(&self, owner: OwnerId, vpn: Vpn) -> bool {
        self.cache.contains(PageIdentity::new(owner, vpn))
    }

    pub fn is_swapped(&self, owner: OwnerId, vpn: Vpn) -> bool {
        self.store.contains(PageIdentity::new(owner, vpn))
    }

    /// Occupied swap slots held by `owner`
    pub fn swapped_count(&self, owner: OwnerId) -> usize {
        self.store.occupied(owner)
    }

    pub fn frames(&self) -> &dyn FrameAllocator {
        self.frames.as_ref()
    }

    pub fn store(&self) -> &dyn BackingStore {
        self.store.as_ref()
    }

    fn touch_resident(&self, identity: PageIdentity) -> Option<FrameRef> {
        if self.cache.touch(identity) {
            self.cache.frame_of(identity)
        } else {
            None
        }
    }

    /// Bring `identity` into `frame` under the owner's gate.
    /// Returns the frame the page ends up in.
    fn fault_in(&self, identity: PageIdentity, frame: FrameRef, entry: &OwnerEntry) -> Result<FrameRef> {
        let mut counted = false;
        loop {
            let gate = entry.gate.lock();
            if gate.exited {
                return Err(PagerError::OwnerExited(identity.owner));
            }
            if !counted {
                entry.stats.record_fault();
                counted = true;
            }

            if let Some(existing) = self.touch_resident(identity) {
                return Ok(existing);
            }

            if !self.in_transit.lock().contains(&identity) {
                self.install(identity, frame, entry)?;
                return Ok(frame);
            }

            // The page is on its way to the store; wait without holding the gate
            drop(gate);
            let mut transit = self.in_transit.lock();
            while transit.contains(&identity) {
                self.transit_done.wait(&mut transit);
            }
        }
    }

    /// Fill `frame` with the page's bytes and admit it. Caller holds the gate.
    fn install(&self, identity: PageIdentity, frame: FrameRef, entry: &OwnerEntry) -> Result<()> {
        let mut page = zeroed_page();

        if self.store.contains(identity) {
            let slot = self.store.read_and_release(identity, &mut page)?;
            entry.stats.record_swap_in();
            debug!("pager: swapped in {} from slot {} into frame {}", identity, slot, frame);
        }

        if let Err(e) = self.frames.write_frame(frame, &page) {
            self.restore_to_store(identity, &page);
            return Err(e.into());
        }

        if let Err(e) = self.cache.admit(identity, frame) {
            self.restore_to_store(identity, &page);
            return Err(e.into());
        }
        Ok(())
    }

    /// Put swapped-in bytes back if installing them failed
    fn restore_to_store(&self, identity: PageIdentity, page: &PageBuf) {
        if let Err(e) = self.store.reserve_and_write(identity, page) {
            error!("pager: lost contents of {}: {}", identity, e);
        }
    }

    /// Run `op` against the frame of a resident page while its owner's gate
    /// is held, so the frame cannot be swapped out underneath it
    fn with_resident_frame<F>(&self, owner: OwnerId, vpn: Vpn, op: F) -> Result<()>
    where
        F: FnOnce(&dyn FrameAllocator, FrameRef) -> Result<()>,
    {
        let identity = PageIdentity::new(owner, vpn);
        loop {
            let frame = self.on_reference(owner, vpn)?;
            let entry = self.owner_entry(owner);
            let gate = entry.gate.lock();
            if gate.exited {
                return Err(PagerError::OwnerExited(owner));
            }
            if self.cache.frame_of(identity) == Some(frame) {
                return op(self.frames.as_ref(), frame);
            }
        }
    }

    pub(crate) fn owner_entry(&self, owner: OwnerId) -> Arc<OwnerEntry> {
        if let Some(entry) = self.owners.read().get(&owner) {
            return Arc::clone(entry);
        }
        Arc::clone(
            self.owners
                .write()
                .entry(owner)
                .or_insert_with(|| Arc::new(OwnerEntry::new())),
        )
    }
}
