use thiserror::Error;
use crate::common::types::FrameRef;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame {0} is not allocated")]
    InvalidFrame(FrameRef),
}
