pub mod config;
pub mod error;
pub mod manager;
pub mod stats;

pub use config::{PagerConfig, SwapConfig};
pub use error::PagerError;
pub use manager::Pager;
pub use stats::PageStats;
