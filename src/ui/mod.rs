//! egui overlays drawn above the render layers

pub mod status;

pub use status::{FrameStats, StatusOverlay, StatusSnapshot, StreamStatus};
