use std::fmt;

/// Page size in bytes (4KB), identical for frames and swap slots
pub const PAGE_SIZE: usize = 4096;

/// Owner (process) ID type
pub type OwnerId = u32;

/// Virtual page number type
pub type Vpn = u64;

/// Physical frame ID type
pub type FrameId = u32;

/// Swap slot number type
pub type SlotId = usize;

/// One page worth of bytes
pub type PageBuf = [u8; PAGE_SIZE];

/// Names a logical page independent of where its bytes currently live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageIdentity {
    pub owner: OwnerId,
    pub vpn: Vpn,
}

impl PageIdentity {
    pub fn new(owner: OwnerId, vpn: Vpn) -> Self {
        Self { owner, vpn }
    }
}

impl fmt::Display for PageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID={} VPN=0x{:x}", self.owner, self.vpn)
    }
}

/// Opaque handle to a physical frame owned by the frame allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRef(pub FrameId);

impl FrameRef {
    pub fn id(&self) -> FrameId {
        self.0
    }
}

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A page currently held in RAM, as reported by snapshots and dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidentPage {
    pub identity: PageIdentity,
    pub frame: FrameRef,
}

/// Allocate a zeroed page buffer on the heap
pub fn zeroed_page() -> Box<PageBuf> {
    Box::new([0; PAGE_SIZE])
}
