//! Live video stream widget
//!
//! Shows the most recent frame from a [`FrameSource`] as a sprite on the 2D
//! background layer. The sprite is created on the first frame and its image
//! is swapped in place afterwards.

use std::sync::Arc;

use glam::Vec2;

use super::{Position, Size};
use crate::error::HudError;
use crate::graphics::{DrawableId, LayerSet, RenderLayerKind, ResourceLoader, Sprite};
use crate::pipeline::{FrameMailbox, FrameSource};

/// Where the widget is in its frame lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing received yet
    NoFrame,
    /// A frame is waiting but the sprite does not exist yet
    FrameAvailableNoSprite,
    /// The sprite exists and follows the stream
    SpriteLive,
}

/// Per-axis sprite scale that stretches a stream to the widget size
pub fn scale_for(size: Size, stream: (u32, u32)) -> Vec2 {
    let axis = |target: f32, native: u32| {
        if native == 0 {
            return 1.0;
        }
        let native = native as f32;
        1.0 + (target - native) / native
    };
    Vec2::new(axis(size.width, stream.0), axis(size.height, stream.1))
}

/// Video stream shown on the 2D background
pub struct StreamWidget {
    position: Position,
    size: Size,
    layer: Option<RenderLayerKind>,
    mailbox: FrameMailbox,
    source: Option<Box<dyn FrameSource>>,
    sprite: Option<DrawableId>,
    stream_size: Option<(u32, u32)>,
    frames_shown: u64,
    resolution_warned: bool,
}

impl StreamWidget {
    pub fn new(size: Size, position: Position) -> Self {
        Self {
            position,
            size,
            layer: None,
            mailbox: FrameMailbox::new(),
            source: None,
            sprite: None,
            stream_size: None,
            frames_shown: 0,
            resolution_warned: false,
        }
    }

    /// Attach the source started on registration
    pub fn with_source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Handle producers publish into
    pub fn mailbox(&self) -> &FrameMailbox {
        &self.mailbox
    }

    pub fn register(
        &mut self,
        _layers: &mut LayerSet,
        _resources: &ResourceLoader,
    ) -> Result<(), HudError> {
        self.layer = Some(RenderLayerKind::Background2D);

        if let Some(source) = self.source.as_mut() {
            log::info!("Starting stream source: {}", source.describe());
            source.start(self.mailbox.clone())?;
        } else {
            log::debug!("Stream widget registered without a source");
        }

        Ok(())
    }

    /// Show the latest frame, if one arrived since the last update
    pub fn update(&mut self, layers: &mut LayerSet) -> Result<(), HudError> {
        let layer = self.layer.ok_or(HudError::NotRegistered)?;

        if let Some(error) = self.mailbox.take_failure() {
            return Err(error.into());
        }

        let Some(frame) = self.mailbox.take() else {
            return Ok(());
        };

        let native = (frame.width, frame.height);
        let image = Arc::new(frame);
        let batch = layers.get_mut(layer).batch_mut();

        match self.sprite {
            None => {
                let scale = scale_for(self.size, native);
                let mut sprite = Sprite::new(self.position.x, self.position.y, image);
                sprite.set_scale(scale.x, scale.y);
                self.sprite = Some(batch.add_sprite(sprite));
                self.stream_size = Some(native);

                log::info!(
                    "Stream is {}x{}, scaling by {:.3}x{:.3}",
                    native.0,
                    native.1,
                    scale.x,
                    scale.y
                );
            }
            Some(id) => {
                if self.stream_size != Some(native) && !self.resolution_warned {
                    log::warn!(
                        "Stream resolution changed from {:?} to {}x{}; keeping initial scale",
                        self.stream_size,
                        native.0,
                        native.1
                    );
                    self.resolution_warned = true;
                }

                if let Some(sprite) = batch.sprite_mut(id) {
                    sprite.set_image(image);
                }
            }
        }

        self.frames_shown += 1;
        Ok(())
    }

    pub fn state(&self) -> StreamState {
        if self.sprite.is_some() {
            StreamState::SpriteLive
        } else if self.mailbox.has_frame() {
            StreamState::FrameAvailableNoSprite
        } else {
            StreamState::NoFrame
        }
    }

    pub fn layer(&self) -> Option<RenderLayerKind> {
        self.layer
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn sprite(&self) -> Option<DrawableId> {
        self.sprite
    }

    /// Native size of the first frame shown
    pub fn stream_size(&self) -> Option<(u32, u32)> {
        self.stream_size
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn source_description(&self) -> Option<String> {
        self.source.as_ref().map(|source| source.describe())
    }
}

impl Drop for StreamWidget {
    fn drop(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineError, VideoFrame};

    fn frame(width: u32, height: u32, fill: u8) -> VideoFrame {
        VideoFrame::new(vec![fill; VideoFrame::expected_size(width, height)], width, height).unwrap()
    }

    fn registered(width: f32, height: f32) -> (StreamWidget, LayerSet) {
        let mut layers = LayerSet::new(1280, 720, 60.0);
        let mut widget = StreamWidget::new(Size::new(width, height), Position::default());
        widget
            .register(&mut layers, &ResourceLoader::default())
            .unwrap();
        (widget, layers)
    }

    #[test]
    fn test_scale_stretches_to_widget() {
        assert_eq!(scale_for(Size::new(1280.0, 720.0), (640, 360)), Vec2::new(2.0, 2.0));
        assert_eq!(scale_for(Size::new(640.0, 360.0), (640, 360)), Vec2::ONE);
        assert_eq!(scale_for(Size::new(320.0, 720.0), (640, 360)), Vec2::new(0.5, 2.0));
    }

    #[test]
    fn test_update_before_register_fails() {
        let mut layers = LayerSet::new(1280, 720, 60.0);
        let mut widget = StreamWidget::new(Size::new(1280.0, 720.0), Position::default());
        assert!(matches!(
            widget.update(&mut layers),
            Err(HudError::NotRegistered)
        ));
    }

    #[test]
    fn test_state_transitions() {
        let (mut widget, mut layers) = registered(1280.0, 720.0);
        assert_eq!(widget.layer(), Some(RenderLayerKind::Background2D));

        widget.update(&mut layers).unwrap();
        assert_eq!(widget.state(), StreamState::NoFrame);

        widget.mailbox().publish(frame(640, 360, 1));
        assert_eq!(widget.state(), StreamState::FrameAvailableNoSprite);

        widget.update(&mut layers).unwrap();
        assert_eq!(widget.state(), StreamState::SpriteLive);
        assert_eq!(widget.stream_size(), Some((640, 360)));

        let batch = layers.get(RenderLayerKind::Background2D).batch();
        let sprite = batch.sprite(widget.sprite().unwrap()).unwrap();
        assert_eq!(sprite.scale(), Vec2::new(2.0, 2.0));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_only_latest_frame_is_shown() {
        let (mut widget, mut layers) = registered(1280.0, 720.0);

        widget.mailbox().publish(frame(4, 4, 10));
        widget.update(&mut layers).unwrap();

        for fill in [20, 30, 40] {
            widget.mailbox().publish(frame(4, 4, fill));
        }
        widget.update(&mut layers).unwrap();

        let batch = layers.get(RenderLayerKind::Background2D).batch();
        let sprite = batch.sprite(widget.sprite().unwrap()).unwrap();
        assert!(sprite.image().data.iter().all(|&b| b == 40));
        assert_eq!(sprite.revision(), 1);
        assert_eq!(widget.frames_shown(), 2);
        assert_eq!(widget.mailbox().dropped(), 2);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_scale_kept_on_resolution_change() {
        let (mut widget, mut layers) = registered(1280.0, 720.0);

        widget.mailbox().publish(frame(640, 360, 0));
        widget.update(&mut layers).unwrap();
        widget.mailbox().publish(frame(320, 180, 0));
        widget.update(&mut layers).unwrap();

        let batch = layers.get(RenderLayerKind::Background2D).batch();
        let sprite = batch.sprite(widget.sprite().unwrap()).unwrap();
        assert_eq!(sprite.scale(), Vec2::new(2.0, 2.0));
        assert_eq!(sprite.image().width, 320);
        assert_eq!(widget.stream_size(), Some((640, 360)));
    }

    #[test]
    fn test_source_failure_is_returned() {
        let (mut widget, mut layers) = registered(1280.0, 720.0);
        widget.mailbox().fail(PipelineError::BufferMap);

        match widget.update(&mut layers) {
            Err(HudError::Pipeline(PipelineError::BufferMap)) => {}
            other => panic!("expected buffer map failure, got {:?}", other.err()),
        }
    }
}
