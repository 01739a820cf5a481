//! 2D textured sprite
//!
//! A sprite is placed in layer pixel coordinates (origin bottom-left) and
//! shows a video frame. Replacing the image keeps the same sprite; the
//! renderer notices the new revision and re-uploads the pixels.

use std::sync::Arc;

use glam::Vec2;

use crate::pipeline::VideoFrame;

/// A textured quad whose image can be swapped in place
#[derive(Debug, Clone)]
pub struct Sprite {
    position: Vec2,
    scale: Vec2,
    image: Arc<VideoFrame>,
    revision: u64,
}

impl Sprite {
    pub fn new(x: f32, y: f32, image: Arc<VideoFrame>) -> Self {
        Self {
            position: Vec2::new(x, y),
            scale: Vec2::ONE,
            image,
            revision: 0,
        }
    }

    /// Replace the pixel content
    pub fn set_image(&mut self, image: Arc<VideoFrame>) {
        self.image = image;
        self.revision += 1;
    }

    pub fn image(&self) -> &Arc<VideoFrame> {
        &self.image
    }

    /// Incremented on every image replacement
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn scale_x(&self) -> f32 {
        self.scale.x
    }

    pub fn scale_y(&self) -> f32 {
        self.scale.y
    }

    pub fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        self.scale = Vec2::new(scale_x, scale_y);
    }

    /// On-screen width after scaling
    pub fn width(&self) -> f32 {
        self.image.width as f32 * self.scale.x
    }

    /// On-screen height after scaling
    pub fn height(&self) -> f32 {
        self.image.height as f32 * self.scale.y
    }

    /// Screen rectangle as (x, y, width, height)
    pub fn rect(&self) -> [f32; 4] {
        [self.position.x, self.position.y, self.width(), self.height()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> Arc<VideoFrame> {
        Arc::new(VideoFrame::new(vec![0; VideoFrame::expected_size(width, height)], width, height).unwrap())
    }

    #[test]
    fn test_scaled_rect() {
        let mut sprite = Sprite::new(10.0, 20.0, image(640, 360));
        sprite.set_scale(2.0, 2.0);
        assert_eq!(sprite.rect(), [10.0, 20.0, 1280.0, 720.0]);
    }

    #[test]
    fn test_set_image_bumps_revision() {
        let mut sprite = Sprite::new(0.0, 0.0, image(4, 4));
        assert_eq!(sprite.revision(), 0);
        sprite.set_image(image(4, 4));
        sprite.set_image(image(4, 4));
        assert_eq!(sprite.revision(), 2);
        assert_eq!(sprite.scale(), Vec2::ONE);
    }
}
