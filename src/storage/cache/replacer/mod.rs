mod mru;

pub use mru::{MruReplacer, RecordHandle};
