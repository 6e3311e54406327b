pub mod error;
pub mod frame_pool;

pub use error::FrameError;
pub use frame_pool::{FrameAllocator, FramePool};
