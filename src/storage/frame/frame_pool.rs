use std::collections::VecDeque;
use log::warn;
use parking_lot::{Mutex, RwLock};

use crate::common::types::{FrameId, FrameRef, PageBuf, PAGE_SIZE};
use crate::storage::frame::error::FrameError;

/// Byte pattern written into freed frames to expose dangling references
pub const FREED_FRAME_FILL: u8 = 0x01;

/// Physical frame supplier consumed by the pager
pub trait FrameAllocator: Send + Sync {
    /// Hand out a free frame, or `None` when physical memory is exhausted
    fn alloc(&self) -> Option<FrameRef>;

    fn free(&self, frame: FrameRef);

    /// True when the pager should evict before allocating
    fn memory_pressure(&self) -> bool;

    fn read_frame(&self, frame: FrameRef, page: &mut PageBuf) -> Result<(), FrameError>;

    fn write_frame(&self, frame: FrameRef, page: &PageBuf) -> Result<(), FrameError>;

    /// Number of frames currently handed out
    fn in_use(&self) -> usize;

    /// Total frames the allocator manages
    fn frame_count(&self) -> usize;
}

struct FreeList {
    free: VecDeque<FrameId>,
    allocated: Vec<bool>,
}

/// Fixed set of page frames with a user-page limit.
///
/// Memory pressure is reported once `user_page_limit` frames are out, even
/// if the pool still has free frames behind the limit.
pub struct FramePool {
    frames: Vec<RwLock<Box<PageBuf>>>,
    free_list: Mutex<FreeList>,
    user_page_limit: usize,
}

impl FramePool {
    pub fn new(frame_count: usize, user_page_limit: usize) -> Self {
        let mut frames = Vec::with_capacity(frame_count);
        let mut free = VecDeque::with_capacity(frame_count);

        for i in 0..frame_count {
            frames.push(RwLock::new(Box::new([FREED_FRAME_FILL; PAGE_SIZE])));
            free.push_back(i as FrameId);
        }

        Self {
            frames,
            free_list: Mutex::new(FreeList {
                free,
                allocated: vec![false; frame_count],
            }),
            user_page_limit: user_page_limit.min(frame_count),
        }
    }

    pub fn user_page_limit(&self) -> usize {
        self.user_page_limit
    }

    /// Return a frame to the free list, rejecting double frees
    pub fn try_free(&self, frame: FrameRef) -> Result<(), FrameError> {
        let idx = frame.id() as usize;
        let mut list = self.free_list.lock();
        match list.allocated.get_mut(idx) {
            Some(allocated) if *allocated => *allocated = false,
            _ => return Err(FrameError::InvalidFrame(frame)),
        }

        // Junk-fill before the frame becomes allocatable again
        self.frames[idx].write().fill(FREED_FRAME_FILL);
        list.free.push_back(frame.id());
        Ok(())
    }

    fn checked(&self, frame: FrameRef) -> Result<&RwLock<Box<PageBuf>>, FrameError> {
        let idx = frame.id() as usize;
        let allocated = self.free_list.lock().allocated.get(idx).copied().unwrap_or(false);
        if !allocated {
            return Err(FrameError::InvalidFrame(frame));
        }
        Ok(&self.frames[idx])
    }
}

impl FrameAllocator for FramePool {
    fn alloc(&self) -> Option<FrameRef> {
        let mut list = self.free_list.lock();
        let id = list.free.pop_front()?;
        list.allocated[id as usize] = true;
        Some(FrameRef(id))
    }

    fn free(&self, frame: FrameRef) {
        if let Err(e) = self.try_free(frame) {
            warn!("frame pool: ignoring free: {}", e);
        }
    }

    fn memory_pressure(&self) -> bool {
        self.in_use() >= self.user_page_limit
    }

    fn read_frame(&self, frame: FrameRef, page: &mut PageBuf) -> Result<(), FrameError> {
        page.copy_from_slice(self.checked(frame)?.read().as_slice());
        Ok(())
    }

    fn write_frame(&self, frame: FrameRef, page: &PageBuf) -> Result<(), FrameError> {
        self.checked(frame)?.write().copy_from_slice(page);
        Ok(())
    }

    fn in_use(&self) -> usize {
        let list = self.free_list.lock();
        list.allocated.len() - list.free.len()
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
