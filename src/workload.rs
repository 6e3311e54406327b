// Memory-pressure workload
//
// Touches more pages than the pager may keep resident, stamps each page with
// an identifiable byte pattern, then revisits pages in a pseudo-random order
// and checks that every page comes back intact.

use std::io::Write;
use anyhow::{bail, Result};

use crate::common::types::{zeroed_page, OwnerId, Vpn, PAGE_SIZE};
use crate::pager::{PageStats, Pager};

/// Distance between stamped bytes within a page
const STAMP_STRIDE: usize = 256;

/// Parameters for one workload run
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub owner: OwnerId,
    pub pages: usize,
    pub iterations: usize,
    pub seed: u32,
    /// Print stats every `report_every` random accesses
    pub report_every: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            owner: 1,
            pages: 50,
            iterations: 10,
            seed: 42,
            report_every: 5,
        }
    }
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadReport {
    pub stats: PageStats,
    /// Random accesses whose page did not hold the expected stamp
    pub corrupted: usize,
}

/// Linear congruential generator used to pick pages
pub fn next_seed(seed: u32) -> u32 {
    seed.wrapping_mul(1103515245).wrapping_add(12345)
}

fn stamp(page_no: usize) -> u8 {
    (page_no & 0xff) as u8
}

fn print_stats(out: &mut impl Write, stats: &PageStats) -> Result<()> {
    writeln!(out, "  Page Faults: {}", stats.page_faults)?;
    writeln!(out, "  Swap Ins:    {}", stats.swap_ins)?;
    writeln!(out, "  Swap Outs:   {}", stats.swap_outs)?;
    Ok(())
}

/// Run the workload against `pager`, writing progress to `out`
pub fn run(pager: &Pager, config: &WorkloadConfig, out: &mut impl Write) -> Result<WorkloadReport> {
    if config.pages == 0 {
        bail!("workload needs at least one page");
    }

    let owner = config.owner;
    let stats = |pager: &Pager| pager.stats(owner).unwrap_or_default();

    writeln!(out, "MRU Memory Test Program")?;
    writeln!(out, "=======================")?;
    writeln!(out, "Touching {} pages ({} KB) as PID={}", config.pages, config.pages * PAGE_SIZE / 1024, owner)?;
    writeln!(out)?;

    writeln!(out, "Initializing pages with unique data...")?;
    let mut page = zeroed_page();
    for i in 0..config.pages {
        let vpn = i as Vpn;
        pager.read_page(owner, vpn, &mut page)?;
        for offset in (0..PAGE_SIZE).step_by(STAMP_STRIDE) {
            page[offset] = stamp(i);
        }
        pager.write_page(owner, vpn, &page)?;

        if (i + 1) % 10 == 0 {
            let st = stats(pager);
            writeln!(out, "  Initialized {} pages - Faults: {}, Swap-outs: {}", i + 1, st.page_faults, st.swap_outs)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "Starting random access pattern ({} iterations)...", config.iterations)?;
    let mut seed = config.seed;
    let mut corrupted = 0;
    for iter in 0..config.iterations {
        seed = next_seed(seed);
        let page_no = (seed / 65536) as usize % config.pages;
        let vpn = page_no as Vpn;

        pager.read_page(owner, vpn, &mut page)?;
        let intact = (0..PAGE_SIZE)
            .step_by(STAMP_STRIDE)
            .all(|offset| page[offset] == stamp(page_no));
        if !intact {
            corrupted += 1;
            writeln!(out, "ERROR: data corruption at page {}", page_no)?;
        }

        page[0] = stamp(page_no);
        pager.write_page(owner, vpn, &page)?;

        if config.report_every > 0 && (iter + 1) % config.report_every == 0 {
            writeln!(out, "Iteration {}:", iter + 1)?;
            print_stats(out, &stats(pager))?;
        }
    }

    let final_stats = stats(pager);
    writeln!(out)?;
    writeln!(out, "=== Final Statistics ===")?;
    print_stats(out, &final_stats)?;
    writeln!(out)?;
    write!(out, "{}", pager.dump())?;

    Ok(WorkloadReport {
        stats: final_stats,
        corrupted,
    })
}
