use std::sync::atomic::{AtomicU64, Ordering};

/// Paging counters for one owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub page_faults: u64,
    pub swap_ins: u64,
    pub swap_outs: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    page_faults: AtomicU64,
    swap_ins: AtomicU64,
    swap_outs: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_fault(&self) {
        self.page_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swap_in(&self) {
        self.swap_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swap_out(&self) {
        self.swap_outs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PageStats {
        PageStats {
            page_faults: self.page_faults.load(Ordering::Relaxed),
            swap_ins: self.swap_ins.load(Ordering::Relaxed),
            swap_outs: self.swap_outs.load(Ordering::Relaxed),
        }
    }
}
