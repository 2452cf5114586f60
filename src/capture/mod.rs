//! Frame capture: the frame handle and the source abstraction feeding the
//! pipeline.

pub mod frame;
pub mod source;

pub use frame::FrameHandle;
pub use source::{FrameSource, SyntheticFrameSource};
