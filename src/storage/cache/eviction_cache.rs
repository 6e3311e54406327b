use std::collections::HashSet;
use std::fmt;
use log::{debug, error};
use parking_lot::Mutex;

use crate::common::types::{FrameRef, OwnerId, PageIdentity, ResidentPage};
use crate::storage::cache::error::CacheError;
use crate::storage::cache::replacer::{MruReplacer, RecordHandle};

/// Thread-safe recency cache of resident pages.
///
/// Every operation holds the internal lock only for the list update itself,
/// so callers can interleave cache calls with slow swap I/O without ever
/// holding this lock across it.
pub struct EvictionCache {
    replacer: Mutex<MruReplacer>,
}

impl EvictionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            replacer: Mutex::new(MruReplacer::new(capacity)),
        }
    }

    /// Move a resident page to the most-recent end; no-op if not tracked
    pub fn touch(&self, identity: PageIdentity) -> bool {
        self.replacer.lock().touch(&identity)
    }

    /// Start tracking a page that was just bound to `frame`
    pub fn admit(&self, identity: PageIdentity, frame: FrameRef) -> Result<RecordHandle, CacheError> {
        let result = self.replacer.lock().admit(identity, frame);
        if let Err(ref e) = result {
            error!("eviction cache: {}", e);
        }
        result
    }

    pub fn remove(&self, identity: PageIdentity) -> Option<ResidentPage> {
        self.replacer.lock().remove(&identity)
    }

    pub fn remove_handle(&self, handle: RecordHandle) -> Option<ResidentPage> {
        self.replacer.lock().remove_handle(handle)
    }

    /// Remove and return the eviction victim (the most recently used page)
    pub fn evict(&self) -> Result<ResidentPage, CacheError> {
        let victim = self.replacer.lock().victim()?;
        debug!("eviction cache: victim {} in frame {}", victim.identity, victim.frame);
        Ok(victim)
    }

    /// Like `evict`, but passes over pages of the owners in `skip`
    pub fn evict_excluding(&self, skip: &HashSet<OwnerId>) -> Result<ResidentPage, CacheError> {
        let victim = self.replacer.lock().victim_excluding(skip)?;
        debug!("eviction cache: victim {} in frame {}", victim.identity, victim.frame);
        Ok(victim)
    }

    pub fn remove_owner(&self, owner: OwnerId) -> Vec<ResidentPage> {
        self.replacer.lock().remove_owner(owner)
    }

    pub fn contains(&self, identity: PageIdentity) -> bool {
        self.replacer.lock().contains(&identity)
    }

    pub fn frame_of(&self, identity: PageIdentity) -> Option<FrameRef> {
        self.replacer.lock().frame_of(&identity)
    }

    pub fn most_recent(&self) -> Option<ResidentPage> {
        self.replacer.lock().most_recent()
    }

    pub fn least_recent(&self) -> Option<ResidentPage> {
        self.replacer.lock().least_recent()
    }

    pub fn len(&self) -> usize {
        self.replacer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.replacer.lock().capacity()
    }

    /// Copy the recency order out under the lock
    pub fn snapshot(&self) -> CacheSnapshot {
        let pages = self.replacer.lock().iter().collect();
        CacheSnapshot { pages }
    }
}

/// Point-in-time copy of the recency order, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    pages: Vec<ResidentPage>,
}

impl CacheSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &ResidentPage> + '_ {
        self.pages.iter()
    }

    pub fn identities(&self) -> Vec<PageIdentity> {
        self.pages.iter().map(|p| p.identity).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl IntoIterator for CacheSnapshot {
    type Item = ResidentPage;
    type IntoIter = std::vec::IntoIter<ResidentPage>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.into_iter()
    }
}

impl fmt::Display for CacheSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MRU List (Most -> Least Recently Used):")?;
        if self.pages.is_empty() {
            return writeln!(f, "  (empty)");
        }
        for (i, page) in self.pages.iter().enumerate() {
            writeln!(f, "  [{}] {} FRAME={}", i, page.identity, page.frame)?;
        }
        Ok(())
    }
}
