//! Video frame sources
//!
//! A frame source runs on its own thread (or inside the media library's
//! streaming thread) and publishes decoded RGB frames into a
//! [`FrameMailbox`]. The stream widget takes the latest frame once per
//! render frame.

pub mod frame;
pub mod mailbox;
pub mod test_pattern;

#[cfg(feature = "camera")]
pub mod camera;
#[cfg(feature = "gstreamer")]
pub mod gst;

pub use frame::VideoFrame;
pub use mailbox::FrameMailbox;
pub use test_pattern::TestPatternSource;

use thiserror::Error;

use crate::config::{SourceKind, StreamConfig};

/// Errors raised while building or running a frame source
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to parse pipeline description: {0}")]
    Parse(String),
    #[error("Pipeline has no element named \"{0}\"")]
    MissingSink(String),
    #[error("Element \"{0}\" is not an appsink")]
    NotAppSink(String),
    #[error("Failed to change pipeline state: {0}")]
    StateChange(String),
    #[error("Sample arrived without usable caps")]
    MissingCaps,
    #[error("Could not map buffer data")]
    BufferMap,
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Capture failed: {0}")]
    Capture(String),
    #[error("Source \"{0}\" is not available in this build")]
    Unsupported(String),
    #[error("Failed to spawn source thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// A producer of decoded video frames
pub trait FrameSource: Send {
    /// Human-readable description for logs and the status overlay
    fn describe(&self) -> String;

    /// Start producing frames into the mailbox
    fn start(&mut self, mailbox: FrameMailbox) -> Result<(), PipelineError>;

    /// Stop producing frames; idempotent
    fn stop(&mut self);
}

/// Build the frame source selected by the stream config
pub fn build_source(config: &StreamConfig) -> Result<Box<dyn FrameSource>, PipelineError> {
    match config.source {
        SourceKind::TestPattern => Ok(Box::new(TestPatternSource::new(
            config.capture_width,
            config.capture_height,
            config.frame_rate,
        ))),
        #[cfg(feature = "gstreamer")]
        SourceKind::Gstreamer => Ok(Box::new(gst::GstSource::new(&config.launch))),
        #[cfg(not(feature = "gstreamer"))]
        SourceKind::Gstreamer => Err(PipelineError::Unsupported("gstreamer".to_string())),
        #[cfg(feature = "camera")]
        SourceKind::Camera => Ok(Box::new(camera::CameraSource::new(
            config.camera_index,
            config.capture_width,
            config.capture_height,
        ))),
        #[cfg(not(feature = "camera"))]
        SourceKind::Camera => Err(PipelineError::Unsupported("camera".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_is_test_pattern() {
        let source = build_source(&StreamConfig::default()).unwrap();
        assert!(source.describe().contains("640x360"));
    }

    #[cfg(not(feature = "gstreamer"))]
    #[test]
    fn test_gstreamer_unavailable_without_feature() {
        let config = StreamConfig {
            source: SourceKind::Gstreamer,
            ..Default::default()
        };
        assert!(matches!(
            build_source(&config),
            Err(PipelineError::Unsupported(_))
        ));
    }
}
