use anyhow::Result;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod common;
use common::{create_file_backed_pager, create_test_pager, filled_page, patterned_page};

use mruswap::common::types::{OwnerId, PageBuf, PageIdentity, SlotId, PAGE_SIZE};
use mruswap::pager::{PageStats, Pager, PagerError};
use mruswap::storage::cache::CacheError;
use mruswap::storage::frame::{FrameAllocator, FramePool};
use mruswap::storage::swap::{BackingStore, MemorySwapPool, SwapError};
use mruswap::workload::{self, WorkloadConfig};

#[test]
fn test_first_reference_zero_fills() -> Result<()> {
    let pager = create_test_pager(8, 8, 16)?;

    let mut buf = filled_page(0xFF);
    pager.read_page(1, 0x10, &mut buf)?;
    assert!(buf.iter().all(|&b| b == 0));

    assert_eq!(
        pager.stats(1),
        Some(PageStats { page_faults: 1, swap_ins: 0, swap_outs: 0 })
    );
    assert!(pager.is_resident(1, 0x10));
    Ok(())
}

#[test]
fn test_repeat_reference_touches() -> Result<()> {
    let pager = create_test_pager(8, 8, 16)?;

    let a = pager.on_reference(1, 1)?;
    let b = pager.on_reference(1, 2)?;
    assert_ne!(a, b);

    assert_eq!(pager.on_reference(1, 1)?, a);
    assert_eq!(pager.dump().identities(), vec![PageIdentity::new(1, 1), PageIdentity::new(1, 2)]);
    assert_eq!(pager.stats(1).unwrap().page_faults, 2);
    Ok(())
}

#[test]
fn test_pressure_evicts_most_recent() -> Result<()> {
    let pager = create_test_pager(4, 2, 16)?;

    pager.on_reference(1, 0xA)?;
    pager.on_reference(1, 0xB)?;
    pager.on_reference(1, 0xC)?;

    // B was the most recently used page when C faulted
    assert!(pager.is_swapped(1, 0xB));
    assert!(!pager.is_resident(1, 0xB));
    assert_eq!(pager.dump().identities(), vec![PageIdentity::new(1, 0xC), PageIdentity::new(1, 0xA)]);
    assert_eq!(pager.frames().in_use(), 2);

    let stats = pager.stats(1).unwrap();
    assert_eq!(stats.page_faults, 3);
    assert_eq!(stats.swap_outs, 1);
    Ok(())
}

#[test]
fn test_sequential_scan_keeps_oldest_pages() -> Result<()> {
    let pager = create_test_pager(8, 3, 32)?;

    for vpn in 0..10 {
        pager.on_reference(1, vpn)?;
    }

    let mut resident: Vec<u64> = pager.dump().identities().iter().map(|id| id.vpn).collect();
    resident.sort();
    assert_eq!(resident, vec![0, 1, 9]);
    assert_eq!(pager.swapped_count(1), 7);
    Ok(())
}

#[test]
fn test_swap_in_restores_contents() -> Result<()> {
    let pager = create_test_pager(4, 2, 16)?;

    pager.write_page(1, 0, &patterned_page(1))?;
    pager.write_page(1, 1, &patterned_page(2))?;
    // Faulting page 2 pushes page 1 out
    pager.write_page(1, 2, &patterned_page(3))?;
    assert!(pager.is_swapped(1, 1));

    let mut buf = filled_page(0);
    pager.read_page(1, 1, &mut buf)?;
    assert_eq!(buf[..], patterned_page(2)[..]);
    assert!(!pager.is_swapped(1, 1));

    let stats = pager.stats(1).unwrap();
    assert_eq!(stats.swap_ins, 1);
    assert_eq!(stats.swap_outs, 2);

    // Every page still reads back as written
    for (vpn, seed) in [(0u64, 1u8), (1, 2), (2, 3)] {
        pager.read_page(1, vpn, &mut buf)?;
        assert_eq!(buf[..], patterned_page(seed)[..]);
    }
    Ok(())
}

#[test]
fn test_file_backed_round_trip() -> Result<()> {
    let (pager, dir) = create_file_backed_pager(4, 2, 8)?;

    for vpn in 0..6u64 {
        pager.write_page(3, vpn, &filled_page(vpn as u8 + 1))?;
    }
    assert!(dir.path().join("swapfile-3").exists());

    let mut buf = filled_page(0);
    for vpn in (0..6u64).rev() {
        pager.read_page(3, vpn, &mut buf)?;
        assert!(buf.iter().all(|&b| b == vpn as u8 + 1), "page {} corrupted", vpn);
    }
    Ok(())
}

#[test]
fn test_swap_outs_charged_to_victim_owner() -> Result<()> {
    let pager = create_test_pager(4, 2, 16)?;

    pager.on_reference(1, 0)?;
    pager.on_reference(2, 0)?;
    // Owner 3 faults; owner 2's page is the MRU victim
    pager.on_reference(3, 0)?;

    assert_eq!(pager.stats(2).unwrap().swap_outs, 1);
    assert_eq!(pager.stats(3).unwrap().swap_outs, 0);
    assert_eq!(pager.stats(3).unwrap().page_faults, 1);
    assert!(pager.is_swapped(2, 0));
    Ok(())
}

#[test]
fn test_store_full_keeps_victim_resident() -> Result<()> {
    // No spare frames behind the limit
    let pager = create_test_pager(2, 2, 1)?;

    pager.write_page(1, 0, &filled_page(0x11))?;
    pager.write_page(1, 1, &filled_page(0x22))?;
    // Page 1 takes the only swap slot
    pager.write_page(1, 2, &filled_page(0x33))?;

    let result = pager.on_reference(1, 3);
    assert!(matches!(result, Err(PagerError::Swap(SwapError::StoreFull))));

    // The would-be victim is still resident and intact
    assert!(pager.is_resident(1, 2));
    assert!(!pager.is_resident(1, 3));
    let mut buf = filled_page(0);
    pager.read_page(1, 2, &mut buf)?;
    assert!(buf.iter().all(|&b| b == 0x33));
    pager.read_page(1, 0, &mut buf)?;
    assert!(buf.iter().all(|&b| b == 0x11));
    Ok(())
}

#[test]
fn test_no_frames_reports_cache_empty() -> Result<()> {
    let pager = create_test_pager(0, 0, 4)?;

    let result = pager.on_reference(1, 0);
    assert!(matches!(result, Err(PagerError::Cache(CacheError::CacheEmpty))));
    assert_eq!(pager.resident_count(), 0);
    Ok(())
}

#[test]
fn test_owner_exit_releases_everything() -> Result<()> {
    let (pager, dir) = create_file_backed_pager(4, 3, 8)?;

    for vpn in 0..6u64 {
        pager.write_page(7, vpn, &filled_page(7))?;
    }
    pager.write_page(8, 0, &filled_page(8))?;
    assert!(pager.swapped_count(7) > 0);

    pager.on_owner_exit(7)?;

    assert!(pager.dump().iter().all(|page| page.identity.owner != 7));
    assert_eq!(pager.swapped_count(7), 0);
    assert_eq!(pager.stats(7), None);
    assert!(!dir.path().join("swapfile-7").exists());

    // The other owner is untouched
    let mut buf = filled_page(0);
    pager.read_page(8, 0, &mut buf)?;
    assert!(buf.iter().all(|&b| b == 8));

    // Exiting twice is harmless
    pager.on_owner_exit(7)?;
    Ok(())
}

#[test]
fn test_owner_id_reuse_starts_fresh() -> Result<()> {
    let pager = create_test_pager(4, 4, 8)?;

    pager.write_page(5, 0, &filled_page(0x55))?;
    pager.on_owner_exit(5)?;
    assert_eq!(pager.frames().in_use(), 0);

    let mut buf = filled_page(0xFF);
    pager.read_page(5, 0, &mut buf)?;
    assert_eq!(buf[..], [0u8; PAGE_SIZE][..]);
    assert_eq!(pager.stats(5).unwrap().page_faults, 1);
    Ok(())
}

#[test]
fn test_workload_survives_pressure() -> Result<()> {
    let pager = create_test_pager(64, 40, 1024)?;

    let config = WorkloadConfig {
        iterations: 40,
        ..WorkloadConfig::default()
    };
    let mut out = Vec::new();
    let report = workload::run(&pager, &config, &mut out)?;

    assert_eq!(report.corrupted, 0);
    // 50 pages against a limit of 40 must have pushed pages out
    assert!(report.stats.swap_outs >= 10);
    assert!(report.stats.page_faults >= 50);

    let text = String::from_utf8(out)?;
    assert!(text.contains("=== Final Statistics ==="));
    assert!(text.contains("MRU List (Most -> Least Recently Used):"));
    assert!(!text.contains("ERROR"));
    Ok(())
}

#[test]
fn test_full_partition_does_not_block_other_owners() -> Result<()> {
    let (pager, _dir) = create_file_backed_pager(4, 2, 1)?;

    // Owner 2 fills its only slot and keeps two pages resident
    for vpn in 0..3 {
        pager.write_page(2, vpn, &filled_page(0x20 + vpn as u8))?;
    }
    assert_eq!(pager.swapped_count(2), 1);

    for _ in 0..3 {
        pager.on_reference(1, 0)?;
    }
    assert!(pager.is_resident(1, 0));
    assert_eq!(pager.swapped_count(1), 0);

    // Owner 2's pages were passed over, not lost
    let mut buf = filled_page(0);
    for vpn in 0..3u64 {
        pager.read_page(2, vpn, &mut buf)?;
        assert!(buf.iter().all(|&b| b == 0x20 + vpn as u8));
    }
    Ok(())
}

#[test]
fn test_eviction_skips_owner_without_swap_room() -> Result<()> {
    let (pager, _dir) = create_file_backed_pager(3, 3, 1)?;

    pager.write_page(1, 0, &filled_page(0x10))?;
    pager.write_page(2, 0, &filled_page(0x20))?;
    pager.write_page(2, 1, &filled_page(0x21))?;
    // Owner 2's page 1 takes its only slot
    pager.write_page(2, 2, &filled_page(0x22))?;
    assert!(pager.is_swapped(2, 1));

    // Head is owner 2's page 2, which has nowhere to go; owner 1's page goes instead
    pager.on_reference(1, 1)?;
    assert!(pager.is_swapped(1, 0));
    assert!(pager.is_resident(2, 2));
    assert!(pager.is_resident(2, 0));

    // Now every resident page belongs to a full partition
    let result = pager.on_reference(2, 3);
    assert!(matches!(result, Err(PagerError::Swap(SwapError::StoreFull))));
    assert_eq!(pager.resident_count(), 3);

    let mut buf = filled_page(0);
    pager.read_page(2, 2, &mut buf)?;
    assert!(buf.iter().all(|&b| b == 0x22));
    assert!(pager.is_swapped(1, 0));
    Ok(())
}

/// Memory pool whose writes can be made to fail
struct FlakyStore {
    inner: MemorySwapPool,
    fail_writes: AtomicBool,
}

impl BackingStore for FlakyStore {
    fn reserve_and_write(&self, identity: PageIdentity, page: &PageBuf) -> std::result::Result<SlotId, SwapError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SwapError::Io(io::Error::new(io::ErrorKind::Other, "device gone")));
        }
        self.inner.reserve_and_write(identity, page)
    }

    fn read_and_release(&self, identity: PageIdentity, page: &mut PageBuf) -> std::result::Result<SlotId, SwapError> {
        self.inner.read_and_release(identity, page)
    }

    fn release_all(&self, owner: OwnerId) -> std::result::Result<usize, SwapError> {
        self.inner.release_all(owner)
    }

    fn contains(&self, identity: PageIdentity) -> bool {
        self.inner.contains(identity)
    }

    fn occupied(&self, owner: OwnerId) -> usize {
        self.inner.occupied(owner)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[test]
fn test_swap_io_failure_keeps_victim() -> Result<()> {
    let store = Arc::new(FlakyStore {
        inner: MemorySwapPool::new(8),
        fail_writes: AtomicBool::new(false),
    });
    let pager = Pager::with_parts(Arc::new(FramePool::new(2, 2)), store.clone());

    pager.write_page(1, 0, &filled_page(0x11))?;
    pager.write_page(1, 1, &filled_page(0x22))?;
    // Page 1 goes to swap while the store still works
    pager.write_page(1, 2, &filled_page(0x33))?;
    assert_eq!(store.occupied(1), 1);

    store.fail_writes.store(true, Ordering::SeqCst);
    let result = pager.on_reference(1, 3);
    assert!(matches!(result, Err(PagerError::Swap(SwapError::Io(_)))));

    // The victim is still resident and no slot was consumed
    assert!(pager.is_resident(1, 2));
    assert_eq!(store.occupied(1), 1);
    let mut buf = filled_page(0);
    pager.read_page(1, 2, &mut buf)?;
    assert!(buf.iter().all(|&b| b == 0x33));

    // Once the store recovers the same fault goes through
    store.fail_writes.store(false, Ordering::SeqCst);
    pager.on_reference(1, 3)?;
    assert!(pager.is_resident(1, 3));
    pager.read_page(1, 1, &mut buf)?;
    assert!(buf.iter().all(|&b| b == 0x22));
    Ok(())
}
