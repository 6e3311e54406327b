use std::io;
use anyhow::Result;

use mruswap::pager::{Pager, PagerConfig};
use mruswap::workload::{self, WorkloadConfig};

fn main() -> Result<()> {
    env_logger::init();

    // 64 frames, pressure at 40 user pages, shared in-memory swap pool
    let pager = Pager::new(PagerConfig::default())?;

    let config = WorkloadConfig::default();
    let report = workload::run(&pager, &config, &mut io::stdout())?;

    if report.corrupted > 0 {
        anyhow::bail!("{} pages came back corrupted", report.corrupted);
    }

    pager.on_owner_exit(config.owner)?;
    println!();
    println!("Test completed: MRU eviction and swapping verified");

    Ok(())
}
