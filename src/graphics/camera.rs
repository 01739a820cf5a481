//! Layer cameras
//!
//! Projection and view builders shared by the render layers. All layers look
//! from (0, 0, 5) at the origin with +Y up; 2D layers use an orthographic
//! projection in canvas pixels, the 3D layer a perspective one.

use glam::{Mat4, Vec3};

/// Near clipping plane
pub const NEAR: f32 = 0.1;
/// Far clipping plane
pub const FAR: f32 = 3000.0;
/// Field of view used when none is configured, in degrees
pub const DEFAULT_FOV_DEGREES: f32 = 60.0;
/// Fixed eye position of every layer camera
pub const EYE: Vec3 = Vec3::new(0.0, 0.0, 5.0);

/// Orthographic projection spanning [0, width] x [0, height]
pub fn orthographic(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width as f32, 0.0, height as f32, NEAR, FAR)
}

/// Perspective projection for the given aspect ratio and vertical fov
pub fn perspective(aspect: f32, fov_degrees: f32) -> Mat4 {
    Mat4::perspective_rh(fov_degrees.to_radians(), aspect, NEAR, FAR)
}

/// Aspect ratio of a canvas, with height clamped to at least one pixel
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    width as f32 / height.max(1) as f32
}

/// The fixed look-at view shared by all layers
pub fn default_view() -> Mat4 {
    Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y)
}

/// Projection/view pair handed to the draw target with each layer's batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerCamera {
    pub projection: Mat4,
    pub view: Mat4,
}

impl LayerCamera {
    /// Combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
    }

    #[test]
    fn test_orthographic_corners() {
        for (w, h) in [(1280, 720), (800, 600), (1, 1), (3840, 2160)] {
            let inverse = orthographic(w, h).inverse();

            let low = inverse * Vec4::new(-1.0, -1.0, 0.5, 1.0);
            assert_close(low.x, 0.0);
            assert_close(low.y, 0.0);

            let high = inverse * Vec4::new(1.0, 1.0, 0.5, 1.0);
            assert_close(high.x, w as f32);
            assert_close(high.y, h as f32);
        }
    }

    #[test]
    fn test_default_view_moves_eye_to_origin() {
        let eye_in_view = default_view() * EYE.extend(1.0);
        assert_close(eye_in_view.x, 0.0);
        assert_close(eye_in_view.y, 0.0);
        assert_close(eye_in_view.z, 0.0);

        // Origin sits 5 units in front of the camera
        let origin = default_view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_close(origin.z, -5.0);
    }

    #[test]
    fn test_aspect_ratio_clamps_zero_height() {
        assert_close(aspect_ratio(1280, 720), 16.0 / 9.0);
        assert_close(aspect_ratio(640, 0), 640.0);
    }
}
