use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[path = "../common/mod.rs"]
mod common;
use common::{create_file_backed_pager, create_test_pager};

use mruswap::common::types::{OwnerId, Vpn, PAGE_SIZE};
use mruswap::pager::Pager;
use mruswap::storage::frame::FrameAllocator;

fn stamp(owner: OwnerId, vpn: Vpn) -> u8 {
    (owner as u64 * 17 + vpn) as u8
}

// Each thread owns one PID, writes its pages, then rereads them
fn run_owners(pager: &Arc<Pager>, owners: u32, pages: u64) -> Result<()> {
    let mut handles = Vec::new();
    for owner in 1..=owners {
        let pager = Arc::clone(pager);
        handles.push(thread::spawn(move || -> Result<()> {
            for vpn in 0..pages {
                pager.write_page(owner, vpn, &[stamp(owner, vpn); PAGE_SIZE])?;
            }
            let mut page = [0u8; PAGE_SIZE];
            for round in 0..3 {
                for vpn in 0..pages {
                    let vpn = (vpn * 7 + round) % pages;
                    pager.read_page(owner, vpn, &mut page)?;
                    assert!(
                        page.iter().all(|&b| b == stamp(owner, vpn)),
                        "PID={} VPN={} corrupted",
                        owner,
                        vpn
                    );
                }
            }
            Ok(())
        }));
    }

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }
    Ok(())
}

#[test]
fn test_concurrent_owners_memory_pool() -> Result<()> {
    let pager = create_test_pager(16, 12, 256)?;
    run_owners(&pager, 4, 20)?;

    // No page is resident twice and residency stays within the frame pool
    let snapshot = pager.dump();
    let unique: HashSet<_> = snapshot.identities().into_iter().collect();
    assert_eq!(unique.len(), snapshot.len());
    let frames: HashSet<_> = snapshot.iter().map(|page| page.frame).collect();
    assert_eq!(frames.len(), snapshot.len());
    assert!(snapshot.len() <= 16);
    assert_eq!(pager.frames().in_use(), snapshot.len());

    for owner in 1..=4 {
        let stats = pager.stats(owner).unwrap();
        assert!(stats.page_faults >= 20);
        assert_eq!(pager.swapped_count(owner) + snapshot.iter().filter(|p| p.identity.owner == owner).count(), 20);
    }
    Ok(())
}

#[test]
fn test_concurrent_owners_file_store() -> Result<()> {
    let (pager, _dir) = create_file_backed_pager(12, 8, 32)?;
    run_owners(&pager, 3, 16)?;

    for owner in 1..=3 {
        pager.on_owner_exit(owner)?;
    }
    assert_eq!(pager.resident_count(), 0);
    assert_eq!(pager.frames().in_use(), 0);
    Ok(())
}

#[test]
fn test_exit_while_others_fault() -> Result<()> {
    let pager = create_test_pager(8, 6, 256)?;

    let worker = {
        let pager = Arc::clone(&pager);
        thread::spawn(move || -> Result<()> {
            let mut page = [0u8; PAGE_SIZE];
            for round in 0..200u64 {
                let vpn = round % 24;
                pager.write_page(1, vpn, &[stamp(1, vpn); PAGE_SIZE])?;
                pager.read_page(1, vpn, &mut page)?;
                assert!(page.iter().all(|&b| b == stamp(1, vpn)));
            }
            Ok(())
        })
    };

    // Owner 2 keeps appearing and exiting while owner 1 churns
    for cycle in 0..20u64 {
        for vpn in 0..4 {
            pager.on_reference(2, vpn + cycle)?;
        }
        pager.on_owner_exit(2)?;
    }

    worker.join().expect("worker panicked")?;
    assert_eq!(pager.stats(2), None);
    assert!(pager.dump().iter().all(|page| page.identity.owner == 1));
    assert_eq!(pager.swapped_count(2), 0);
    Ok(())
}
