use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use log::{debug, error, info};
use parking_lot::Mutex;

use crate::common::types::{OwnerId, PageBuf, PageIdentity, SlotId, Vpn, PAGE_SIZE};
use crate::storage::swap::backing_store::BackingStore;
use crate::storage::swap::error::SwapError;

/// Default number of slots in each owner's swap file
pub const DEFAULT_SLOTS_PER_OWNER: usize = 256;

/// Per-owner swap table backed by its own file
struct OwnerSwapTable {
    file: File,
    path: PathBuf,
    /// vpn held by each slot, `None` when free
    slots: Vec<Option<Vpn>>,
    index: HashMap<Vpn, SlotId>,
    next_slot: SlotId,
}

impl OwnerSwapTable {
    fn create(path: PathBuf, capacity: usize) -> Result<Self, SwapError> {
        // Truncate: occupancy is not persisted, so leftover bytes are unreachable
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            file,
            path,
            slots: vec![None; capacity],
            index: HashMap::new(),
            next_slot: 0,
        })
    }

    /// Round-robin search for a free slot starting at the cursor
    fn find_free_slot(&self) -> Option<SlotId> {
        let capacity = self.slots.len();
        (0..capacity)
            .map(|i| (self.next_slot + i) % capacity)
            .find(|&slot| self.slots[slot].is_none())
    }

    fn write_slot(&mut self, slot: SlotId, page: &PageBuf) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(slot_offset(slot)))?;
        self.file.write_all(page)?;
        self.file.flush()
    }

    fn read_slot(&mut self, slot: SlotId, page: &mut PageBuf) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(slot_offset(slot)))?;
        self.file.read_exact(page)
    }
}

fn slot_offset(slot: SlotId) -> u64 {
    (slot * PAGE_SIZE) as u64
}

/// Swap store partitioned by owner.
///
/// Each owner gets `swapfile-<owner>` inside `dir`, created on its first
/// swap-out and deleted by `release_all`. Slot `i` lives at byte offset
/// `i * PAGE_SIZE`; slot numbers only mean something within one owner.
pub struct FileSwapStore {
    dir: PathBuf,
    slots_per_owner: usize,
    tables: Mutex<HashMap<OwnerId, OwnerSwapTable>>,
}

impl FileSwapStore {
    pub fn new(dir: impl AsRef<Path>, slots_per_owner: usize) -> Result<Self, SwapError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        info!("swap store: per-owner swap files in {}", dir.display());

        Ok(Self {
            dir,
            slots_per_owner,
            tables: Mutex::new(HashMap::new()),
        })
    }

    /// Path of the swap file for `owner`
    pub fn swap_file_path(&self, owner: OwnerId) -> PathBuf {
        self.dir.join(format!("swapfile-{}", owner))
    }
}

impl BackingStore for FileSwapStore {
    fn reserve_and_write(&self, identity: PageIdentity, page: &PageBuf) -> Result<SlotId, SwapError> {
        let mut tables = self.tables.lock();

        let table = match tables.entry(identity.owner) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.swap_file_path(identity.owner);
                debug!("swap store: creating {}", path.display());
                entry.insert(OwnerSwapTable::create(path, self.slots_per_owner)?)
            }
        };

        if table.index.contains_key(&identity.vpn) {
            return Err(SwapError::AlreadySwapped(identity));
        }

        let slot = table.find_free_slot().ok_or(SwapError::StoreFull)?;

        // Mark occupied only once the full page is on disk
        if let Err(e) = table.write_slot(slot, page) {
            error!("swap out: write failed for {} slot {}: {}", identity, slot, e);
            return Err(SwapError::Io(e));
        }

        table.slots[slot] = Some(identity.vpn);
        table.index.insert(identity.vpn, slot);
        table.next_slot = (slot + 1) % self.slots_per_owner;

        debug!("swap out: {} -> slot {}", identity, slot);
        Ok(slot)
    }

    fn read_and_release(&self, identity: PageIdentity, page: &mut PageBuf) -> Result<SlotId, SwapError> {
        let mut tables = self.tables.lock();

        let table = tables
            .get_mut(&identity.owner)
            .ok_or(SwapError::NotFound(identity))?;
        let slot = *table.index.get(&identity.vpn).ok_or(SwapError::NotFound(identity))?;

        // On a failed read the slot keeps the only copy of the page
        if let Err(e) = table.read_slot(slot, page) {
            error!("swap in: read failed for {} slot {}: {}", identity, slot, e);
            return Err(SwapError::Io(e));
        }

        table.index.remove(&identity.vpn);
        table.slots[slot] = None;

        debug!("swap in: {} <- slot {}", identity, slot);
        Ok(slot)
    }

    fn release_all(&self, owner: OwnerId) -> Result<usize, SwapError> {
        let table = match self.tables.lock().remove(&owner) {
            Some(table) => table,
            None => return Ok(0),
        };

        let freed = table.index.len();
        let OwnerSwapTable { file, path, .. } = table;
        drop(file);
        std::fs::remove_file(&path)?;

        info!("swap free: freed {} slots for PID={} and deleted {}", freed, owner, path.display());
        Ok(freed)
    }

    fn contains(&self, identity: PageIdentity) -> bool {
        self.tables
            .lock()
            .get(&identity.owner)
            .is_some_and(|table| table.index.contains_key(&identity.vpn))
    }

    fn occupied(&self, owner: OwnerId) -> usize {
        self.tables
            .lock()
            .get(&owner)
            .map_or(0, |table| table.index.len())
    }

    fn capacity(&self) -> usize {
        self.slots_per_owner
    }
}
