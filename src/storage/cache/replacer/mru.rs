use std::collections::{HashMap, HashSet};

use crate::common::types::{FrameRef, OwnerId, PageIdentity, ResidentPage};
use crate::storage::cache::error::CacheError;

/// Handle returned by `admit`, valid until the record leaves the list.
///
/// The generation guards against a stale handle unlinking a newer record
/// that happens to occupy the same arena node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHandle {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node {
    page: ResidentPage,
    prev: Option<usize>,
    next: Option<usize>,
    generation: u64,
    live: bool,
}

/// MRU (Most Recently Used) page replacement policy.
///
/// Resident pages sit in an arena-backed doubly linked list ordered by
/// recency, head = most recent. Victims are taken from the head, so the
/// page touched last is the first to go.
#[derive(Debug, Default)]
pub struct MruReplacer {
    nodes: Vec<Node>,
    free_nodes: Vec<usize>,
    index: HashMap<PageIdentity, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl MruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free_nodes: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Records the arena can hold without growing
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub fn contains(&self, identity: &PageIdentity) -> bool {
        self.index.contains_key(identity)
    }

    /// Frame currently bound to `identity`, if resident
    pub fn frame_of(&self, identity: &PageIdentity) -> Option<FrameRef> {
        self.index.get(identity).map(|&idx| self.nodes[idx].page.frame)
    }

    pub fn most_recent(&self) -> Option<ResidentPage> {
        self.head.map(|idx| self.nodes[idx].page)
    }

    pub fn least_recent(&self) -> Option<ResidentPage> {
        self.tail.map(|idx| self.nodes[idx].page)
    }

    /// Insert a new record at the most-recent end
    pub fn admit(&mut self, identity: PageIdentity, frame: FrameRef) -> Result<RecordHandle, CacheError> {
        if self.index.contains_key(&identity) {
            return Err(CacheError::AlreadyResident(identity));
        }

        let page = ResidentPage { identity, frame };
        let idx = match self.free_nodes.pop() {
            Some(idx) => {
                let node = &mut self.nodes[idx];
                node.page = page;
                node.prev = None;
                node.next = None;
                node.generation += 1;
                node.live = true;
                idx
            }
            None => {
                self.nodes.push(Node {
                    page,
                    prev: None,
                    next: None,
                    generation: 0,
                    live: true,
                });
                self.nodes.len() - 1
            }
        };

        self.push_front(idx);
        self.index.insert(identity, idx);

        Ok(RecordHandle {
            index: idx,
            generation: self.nodes[idx].generation,
        })
    }

    /// Record an access; moves the page to the most-recent end.
    /// Returns false if the identity is not tracked.
    pub fn touch(&mut self, identity: &PageIdentity) -> bool {
        let idx = match self.index.get(identity) {
            Some(&idx) => idx,
            None => return false,
        };

        if self.head != Some(idx) {
            self.unlink(idx);
            self.push_front(idx);
        }
        true
    }

    /// Remove a page by identity; no-op if absent
    pub fn remove(&mut self, identity: &PageIdentity) -> Option<ResidentPage> {
        let idx = self.index.remove(identity)?;
        Some(self.release_node(idx))
    }

    /// Remove the record a handle refers to, if it is still the same record
    pub fn remove_handle(&mut self, handle: RecordHandle) -> Option<ResidentPage> {
        let node = self.nodes.get(handle.index)?;
        if !node.live || node.generation != handle.generation {
            return None;
        }
        let identity = node.page.identity;
        self.remove(&identity)
    }

    /// Victim selection: take the most recently used page
    pub fn victim(&mut self) -> Result<ResidentPage, CacheError> {
        self.victim_excluding(&HashSet::new())
    }

    /// Take the most recently used page whose owner is not in `skip`
    pub fn victim_excluding(&mut self, skip: &HashSet<OwnerId>) -> Result<ResidentPage, CacheError> {
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let identity = self.nodes[idx].page.identity;
            if !skip.contains(&identity.owner) {
                self.index.remove(&identity);
                return Ok(self.release_node(idx));
            }
            cursor = self.nodes[idx].next;
        }
        Err(CacheError::CacheEmpty)
    }

    /// Drop every record belonging to `owner`
    pub fn remove_owner(&mut self, owner: OwnerId) -> Vec<ResidentPage> {
        let owned: Vec<PageIdentity> = self
            .index
            .keys()
            .filter(|identity| identity.owner == owner)
            .copied()
            .collect();

        owned.iter().filter_map(|identity| self.remove(identity)).collect()
    }

    /// Walk from most to least recent
    pub fn iter(&self) -> impl Iterator<Item = ResidentPage> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let idx = cursor?;
            cursor = self.nodes[idx].next;
            Some(self.nodes[idx].page)
        })
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;
        match self.head {
            Some(old) => self.nodes[old].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }

    fn release_node(&mut self, idx: usize) -> ResidentPage {
        self.unlink(idx);
        self.nodes[idx].live = false;
        self.free_nodes.push(idx);
        self.nodes[idx].page
    }
}
