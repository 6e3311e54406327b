use std::io;
use std::path::PathBuf;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use mruswap::common::types::{OwnerId, Vpn, PAGE_SIZE};
use mruswap::pager::{Pager, PagerConfig, SwapConfig};
use mruswap::workload::{self, next_seed, WorkloadConfig};

const HISTORY_FILE: &str = ".pagectl_history";

/// Bytes shown by the `read` shell command
const PEEK_BYTES: usize = 16;

#[derive(Parser)]
#[command(author, version, about = "pagectl - drive the MRU pager by hand")]
struct Cli {
    /// Number of physical frames
    #[arg(short, long, default_value_t = 64)]
    frames: usize,

    /// Frames in use at which eviction starts
    #[arg(short, long, default_value_t = 40)]
    user_limit: usize,

    /// Swap slots (shared pool size, or per owner with --swap-dir)
    #[arg(short = 's', long, default_value_t = 1024)]
    swap_slots: usize,

    /// Keep swapped pages in per-owner files under this directory
    #[arg(short = 'd', long)]
    swap_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive shell
    Shell,

    /// Run the memory-pressure workload for one owner
    Demo {
        /// Pages to touch
        #[arg(short, long, default_value_t = 50)]
        pages: usize,

        /// Random accesses after initialization
        #[arg(short, long, default_value_t = 10)]
        iterations: usize,

        /// LCG seed for the random accesses
        #[arg(long, default_value_t = 42)]
        seed: u32,
    },

    /// Run concurrent workers, one owner each
    Stress {
        /// Worker threads
        #[arg(short, long, default_value_t = 4)]
        workers: usize,

        /// Pages per worker
        #[arg(short, long, default_value_t = 16)]
        pages: usize,

        /// References per worker
        #[arg(short, long, default_value_t = 200)]
        rounds: usize,
    },

    /// Show pager configuration
    Info,
}

impl Cli {
    fn pager_config(&self) -> PagerConfig {
        let swap = match &self.swap_dir {
            Some(dir) => SwapConfig::File {
                dir: dir.clone(),
                slots_per_owner: self.swap_slots,
            },
            None => SwapConfig::Memory { slots: self.swap_slots },
        };

        PagerConfig {
            frame_count: self.frames,
            user_page_limit: self.user_limit,
            swap,
        }
    }
}

/// One parsed shell line
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Reference(OwnerId, Vpn),
    Write(OwnerId, Vpn, u8),
    Read(OwnerId, Vpn),
    Exit(OwnerId),
    Stats(OwnerId),
    Dump,
    Help,
    Quit,
}

fn parse_number(text: &str) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("invalid number '{}'", text))
}

fn parse_owner(text: &str) -> Result<OwnerId> {
    OwnerId::try_from(parse_number(text)?).map_err(|_| anyhow!("owner '{}' out of range", text))
}

fn parse_byte(text: &str) -> Result<u8> {
    u8::try_from(parse_number(text)?).map_err(|_| anyhow!("byte '{}' out of range", text))
}

fn parse_command(line: &str) -> Result<ShellCommand> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        ["ref", owner, vpn] => ShellCommand::Reference(parse_owner(owner)?, parse_number(vpn)?),
        ["write", owner, vpn, byte] => {
            ShellCommand::Write(parse_owner(owner)?, parse_number(vpn)?, parse_byte(byte)?)
        }
        ["read", owner, vpn] => ShellCommand::Read(parse_owner(owner)?, parse_number(vpn)?),
        ["exit", owner] => ShellCommand::Exit(parse_owner(owner)?),
        ["stats", owner] => ShellCommand::Stats(parse_owner(owner)?),
        ["dump"] => ShellCommand::Dump,
        ["help"] => ShellCommand::Help,
        ["quit"] | ["exit"] => ShellCommand::Quit,
        _ => bail!("unrecognized command '{}' (try 'help')", line),
    };
    Ok(command)
}

/// Execute one shell command; returns false when the shell should stop
fn execute(pager: &Pager, command: ShellCommand) -> Result<bool> {
    match command {
        ShellCommand::Reference(owner, vpn) => {
            let frame = pager.on_reference(owner, vpn)?;
            println!("PID={} VPN=0x{:x} -> frame {}", owner, vpn, frame);
        }
        ShellCommand::Write(owner, vpn, byte) => {
            pager.write_page(owner, vpn, &[byte; PAGE_SIZE])?;
            println!("PID={} VPN=0x{:x} filled with 0x{:02x}", owner, vpn, byte);
        }
        ShellCommand::Read(owner, vpn) => {
            let mut page = [0u8; PAGE_SIZE];
            pager.read_page(owner, vpn, &mut page)?;
            println!("PID={} VPN=0x{:x}: {}...", owner, vpn, hex::encode(&page[..PEEK_BYTES]));
        }
        ShellCommand::Exit(owner) => {
            pager.on_owner_exit(owner)?;
            println!("PID={} released", owner);
        }
        ShellCommand::Stats(owner) => match pager.stats(owner) {
            Some(st) => {
                println!("PID={}:", owner);
                println!("  Page Faults: {}", st.page_faults);
                println!("  Swap Ins:    {}", st.swap_ins);
                println!("  Swap Outs:   {}", st.swap_outs);
                println!("  Resident in swap: {} slots", pager.swapped_count(owner));
            }
            None => println!("PID={}: no paging state", owner),
        },
        ShellCommand::Dump => print!("{}", pager.dump()),
        ShellCommand::Help => print_help(),
        ShellCommand::Quit => return Ok(false),
    }
    Ok(true)
}

fn run_shell(pager: &Pager) -> Result<()> {
    println!("pagectl shell. Type 'help' for assistance or 'quit' to leave.");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        if !err.to_string().contains("No such file or directory") {
            println!("Error loading history: {}", err);
        }
    }

    loop {
        match rl.readline("pagectl> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let outcome = parse_command(line).and_then(|command| execute(pager, command));
                match outcome {
                    Ok(true) => {}
                    Ok(false) => {
                        println!("Goodbye!");
                        break;
                    }
                    Err(err) => println!("Error: {}", err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        println!("Error saving history: {}", err);
    }
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  ref <pid> <vpn>              - Reference a page (faults it in if needed)");
    println!("  write <pid> <vpn> <byte>     - Fill a page with one byte value");
    println!("  read <pid> <vpn>             - Show the first bytes of a page");
    println!("  exit <pid>                   - Release all pages of an owner");
    println!("  stats <pid>                  - Show fault and swap counters");
    println!("  dump                         - Show the MRU list");
    println!("  help                         - Display this help message");
    println!("  quit                         - Leave the shell");
    println!();
    println!("Numbers may be decimal or 0x-prefixed hex.");
}

/// Each worker stamps its own pages, then rereads them in LCG order and
/// checks the stamps. Returns the number of corrupted reads.
fn run_stress(pager: &Pager, workers: usize, pages: usize, rounds: usize) -> Result<usize> {
    if pages == 0 {
        bail!("stress needs at least one page per worker");
    }

    let results = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|w| {
                scope.spawn(move |_| -> Result<usize> {
                    let owner = (w + 1) as OwnerId;
                    let stamp = |vpn: usize| (owner as usize * 31 + vpn) as u8;

                    for vpn in 0..pages {
                        pager.write_page(owner, vpn as Vpn, &[stamp(vpn); PAGE_SIZE])?;
                    }

                    let mut seed = owner;
                    let mut corrupted = 0;
                    let mut page = [0u8; PAGE_SIZE];
                    for _ in 0..rounds {
                        seed = next_seed(seed);
                        let vpn = (seed / 65536) as usize % pages;
                        pager.read_page(owner, vpn as Vpn, &mut page)?;
                        if page.iter().any(|&b| b != stamp(vpn)) {
                            corrupted += 1;
                        }
                    }
                    Ok(corrupted)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("stress worker panicked"))?)
            .collect::<Result<Vec<usize>>>()
    })
    .map_err(|_| anyhow!("stress scope panicked"))??;

    for w in 0..workers {
        let owner = (w + 1) as OwnerId;
        if let Some(st) = pager.stats(owner) {
            println!(
                "PID={}: faults {}, swap-ins {}, swap-outs {}",
                owner, st.page_faults, st.swap_ins, st.swap_outs
            );
        }
    }

    Ok(results.iter().sum())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let pager = Pager::new(cli.pager_config()).context("Failed to initialize pager")?;

    match &cli.command {
        Some(Commands::Shell) | None => {
            run_shell(&pager)?;
        }
        Some(Commands::Demo { pages, iterations, seed }) => {
            let config = WorkloadConfig {
                pages: *pages,
                iterations: *iterations,
                seed: *seed,
                ..WorkloadConfig::default()
            };
            let report = workload::run(&pager, &config, &mut io::stdout())?;
            if report.corrupted > 0 {
                bail!("{} pages came back corrupted", report.corrupted);
            }
        }
        Some(Commands::Stress { workers, pages, rounds }) => {
            let corrupted = run_stress(&pager, *workers, *pages, *rounds)?;
            println!("Resident pages: {}", pager.resident_count());
            if corrupted > 0 {
                bail!("{} reads returned corrupted pages", corrupted);
            }
            println!("Stress completed: no corruption");
        }
        Some(Commands::Info) => {
            println!("pagectl Information:");
            println!("  Frames: {}", cli.frames);
            println!("  User page limit: {}", cli.user_limit);
            match &cli.swap_dir {
                Some(dir) => println!("  Swap: {} slots per owner in {}", cli.swap_slots, dir.display()),
                None => println!("  Swap: shared pool of {} slots", cli.swap_slots),
            }
            println!("  Page size: {} bytes", PAGE_SIZE);
        }
    }

    Ok(())
}
