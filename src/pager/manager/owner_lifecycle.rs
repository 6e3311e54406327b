use std::sync::Arc;
use log::info;

use crate::common::types::OwnerId;
use crate::pager::error::Result;
use super::Pager;

impl Pager {
    /// Release everything tracked for `owner`: resident frames, swap slots
    /// and counters. Waits for any swap transfer of the owner's pages that is
    /// already in progress.
    pub fn on_owner_exit(&self, owner: OwnerId) -> Result<()> {
        let entry = match self.owners.read().get(&owner) {
            Some(entry) => Arc::clone(entry),
            None => return Ok(()),
        };

        let mut gate = entry.gate.lock();
        if gate.exited {
            return Ok(());
        }
        gate.exited = true;

        let resident = self.cache.remove_owner(owner);
        for page in &resident {
            self.frames.free(page.frame);
        }

        // Forget the owner even if the store fails to clean up
        let released = self.store.release_all(owner);
        drop(gate);

        // An eviction that picked one of our pages may still be looking up
        // this entry; it must see it marked exited, not a later incarnation
        {
            let mut transit = self.in_transit.lock();
            while transit.iter().any(|identity| identity.owner == owner) {
                self.transit_done.wait(&mut transit);
            }
        }

        {
            let mut owners = self.owners.write();
            if owners.get(&owner).is_some_and(|current| Arc::ptr_eq(current, &entry)) {
                owners.remove(&owner);
            }
        }

        let released = released?;
        info!(
            "pager: PID={} exited, freed {} frames and {} swap slots",
            owner,
            resident.len(),
            released
        );
        Ok(())
    }
}
