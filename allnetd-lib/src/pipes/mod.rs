pub mod frame;
pub mod registry;

pub use frame::{read_frame, write_frame, FrameError, MAGIC, MAX_FRAME_LEN};
pub use registry::PipeRegistry;
