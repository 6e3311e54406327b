use std::collections::HashSet;
use log::{debug, error, warn};

use crate::common::types::{zeroed_page, FrameRef, OwnerId, ResidentPage};
use crate::pager::error::{PagerError, Result};
use crate::storage::cache::CacheError;
use crate::storage::swap::SwapError;
use super::Pager;

/// Get a frame for a faulting page, evicting while memory is scarce
pub(super) fn obtain_frame(pager: &Pager) -> Result<FrameRef> {
    loop {
        if !pager.frames.memory_pressure() {
            if let Some(frame) = pager.frames.alloc() {
                return Ok(frame);
            }
        }

        match evict_one(pager) {
            Ok(()) => {}
            Err(PagerError::Swap(SwapError::StoreFull)) => {
                // No resident page can be persisted; a frame past the limit still serves
                if let Some(frame) = pager.frames.alloc() {
                    return Ok(frame);
                }
                return Err(SwapError::StoreFull.into());
            }
            Err(PagerError::Cache(CacheError::CacheEmpty)) => {
                // Nothing resident to give up; take a frame past the limit if one exists
                if let Some(frame) = pager.frames.alloc() {
                    return Ok(frame);
                }
                if pager.frames.in_use() > 0 {
                    // Every frame is bound to a fault still in progress
                    return Err(PagerError::OutOfMemory);
                }
                error!("pager: memory pressure with no resident pages and no frames");
                return Err(CacheError::CacheEmpty.into());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Evict the MRU victim: persist its bytes, then release its frame.
///
/// A victim whose store has no room is put back and its owner is passed
/// over, so one owner's full swap partition never stalls the others.
/// `StoreFull` comes back only when no resident page could be persisted.
pub(super) fn evict_one(pager: &Pager) -> Result<()> {
    let mut full_owners: HashSet<OwnerId> = HashSet::new();

    loop {
        let victim = {
            let mut transit = pager.in_transit.lock();
            let victim = match pager.cache.evict_excluding(&full_owners) {
                Ok(victim) => victim,
                Err(CacheError::CacheEmpty) if !full_owners.is_empty() => {
                    return Err(SwapError::StoreFull.into());
                }
                Err(e) => return Err(e.into()),
            };
            transit.insert(victim.identity);
            victim
        };

        let result = swap_out(pager, victim);

        pager.in_transit.lock().remove(&victim.identity);
        pager.transit_done.notify_all();

        match result {
            Err(PagerError::Swap(SwapError::StoreFull)) => {
                debug!("pager: no swap room for PID={}, trying another victim", victim.identity.owner);
                full_owners.insert(victim.identity.owner);
            }
            other => return other,
        }
    }
}

fn swap_out(pager: &Pager, victim: ResidentPage) -> Result<()> {
    let identity = victim.identity;

    let entry = match pager.owners.read().get(&identity.owner) {
        Some(entry) => entry.clone(),
        None => {
            warn!("pager: discarding {} of unknown owner", identity);
            pager.frames.free(victim.frame);
            return Ok(());
        }
    };

    let gate = entry.gate.lock();
    if gate.exited {
        warn!("pager: discarding {} of exited owner", identity);
        drop(gate);
        pager.frames.free(victim.frame);
        return Ok(());
    }

    let mut page = zeroed_page();
    let written = pager
        .frames
        .read_frame(victim.frame, &mut page)
        .map_err(PagerError::from)
        .and_then(|()| Ok(pager.store.reserve_and_write(identity, &page)?));

    match written {
        Ok(slot) => {
            entry.stats.record_swap_out();
            debug!("pager: swapped out {} from frame {} to slot {}", identity, victim.frame, slot);
        }
        Err(e) => {
            // Keep the page resident rather than drop its only copy
            match &e {
                PagerError::Swap(SwapError::StoreFull) => warn!("pager: no swap slot for {}", identity),
                _ => error!("pager: failed to swap out {}: {}", identity, e),
            }
            if let Err(ce) = pager.cache.admit(identity, victim.frame) {
                error!("pager: could not restore {}: {}", identity, ce);
            }
            return Err(e);
        }
    }

    drop(gate);
    pager.frames.free(victim.frame);
    Ok(())
}
