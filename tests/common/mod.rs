#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use mruswap::common::types::{PageBuf, PAGE_SIZE};
use mruswap::pager::{Pager, PagerConfig, SwapConfig};
use anyhow::Result;

// Create a pager with a shared in-memory swap pool
pub fn create_test_pager(frames: usize, user_limit: usize, swap_slots: usize) -> Result<Arc<Pager>> {
    let config = PagerConfig {
        frame_count: frames,
        user_page_limit: user_limit,
        swap: SwapConfig::Memory { slots: swap_slots },
    };
    Ok(Arc::new(Pager::new(config)?))
}

// Create a pager with per-owner swap files in a temporary directory
pub fn create_file_backed_pager(frames: usize, user_limit: usize, slots_per_owner: usize) -> Result<(Arc<Pager>, TempDir)> {
    let dir = TempDir::new()?;
    let config = PagerConfig {
        frame_count: frames,
        user_page_limit: user_limit,
        swap: SwapConfig::File {
            dir: dir.path().to_path_buf(),
            slots_per_owner,
        },
    };
    Ok((Arc::new(Pager::new(config)?), dir))
}

// A page filled with one byte value
pub fn filled_page(byte: u8) -> Box<PageBuf> {
    Box::new([byte; PAGE_SIZE])
}

// Generate a page whose contents depend on a seed
pub fn patterned_page(seed: u8) -> Box<PageBuf> {
    let mut page = Box::new([0u8; PAGE_SIZE]);
    for (i, byte) in page.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(7).wrapping_add(seed);
    }
    page
}
