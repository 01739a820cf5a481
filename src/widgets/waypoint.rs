//! Rotating 3D waypoint marker

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::{Position, Size};
use crate::error::HudError;
use crate::graphics::{
    DrawableId, LayerSet, Mesh, Model, RenderLayerKind, ResourceError, ResourceLoader,
};

/// Rotation added per update, in radians
pub const ROTATION_STEP: f32 = 0.01;

/// Default model resource name
pub const DEFAULT_MODEL: &str = "waypoint.obj";

/// Built-in marker dimensions used when the model file is missing
const MARKER_WIDTH: f32 = 0.75;
const MARKER_HEIGHT: f32 = 1.5;

/// 3D marker spinning about the X axis on the 3D background
pub struct WaypointWidget {
    position: Position,
    size: Size,
    layer: Option<RenderLayerKind>,
    model_name: String,
    /// Accumulated angle in radians, never wrapped
    rotation: f64,
    rotation_step: f32,
    model: Option<DrawableId>,
}

impl WaypointWidget {
    pub fn new(size: Size, position: Position) -> Self {
        Self {
            position,
            size,
            layer: None,
            model_name: DEFAULT_MODEL.to_string(),
            rotation: 0.0,
            rotation_step: ROTATION_STEP,
            model: None,
        }
    }

    pub fn with_model(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_rotation_step(mut self, step: f32) -> Self {
        self.rotation_step = step;
        self
    }

    /// Load the model and add it to the 3D background batch
    pub fn register(
        &mut self,
        layers: &mut LayerSet,
        resources: &ResourceLoader,
    ) -> Result<(), HudError> {
        let layer = RenderLayerKind::Background3D;
        self.layer = Some(layer);

        if self.model.is_some() {
            return Ok(());
        }

        let mesh = match resources.load_model(&self.model_name) {
            Ok(mesh) => mesh,
            Err(ResourceError::NotFound { name, searched }) => {
                log::warn!(
                    "Model \"{}\" not found in {:?}, using built-in marker",
                    name,
                    searched
                );
                Mesh::waypoint_marker(MARKER_WIDTH, MARKER_HEIGHT)
            }
            Err(e) => return Err(e.into()),
        };

        let model = Model::new(Arc::new(mesh));
        self.model = Some(layers.get_mut(layer).batch_mut().add_model(model));
        Ok(())
    }

    /// Advance the rotation by one step
    pub fn update(&mut self, layers: &mut LayerSet) -> Result<(), HudError> {
        let layer = self.layer.ok_or(HudError::NotRegistered)?;
        let id = self.model.ok_or(HudError::NotRegistered)?;

        self.rotation += f64::from(self.rotation_step);

        let model = layers
            .get_mut(layer)
            .batch_mut()
            .model_mut(id)
            .ok_or(HudError::NotRegistered)?;
        model.set_matrix(self.transform());

        Ok(())
    }

    /// Current model matrix; the angle is reduced to one turn before narrowing to f32
    pub fn transform(&self) -> Mat4 {
        let angle = self.rotation.rem_euclid(TAU) as f32;
        Mat4::from_translation(Vec3::ZERO) * Mat4::from_rotation_x(angle)
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn rotation_step(&self) -> f32 {
        self.rotation_step
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model(&self) -> Option<DrawableId> {
        self.model
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn empty_resources() -> ResourceLoader {
        ResourceLoader::new(vec![PathBuf::from("/nonexistent/hud-overlay")])
    }

    #[test]
    fn test_missing_model_falls_back_to_marker() {
        let mut layers = LayerSet::new(1280, 720, 60.0);
        let mut widget = WaypointWidget::new(Size::new(1280.0, 720.0), Position::default());
        widget.register(&mut layers, &empty_resources()).unwrap();

        assert_eq!(widget.layer(), Some(RenderLayerKind::Background3D));
        let batch = layers.get(RenderLayerKind::Background3D).batch();
        let model = batch.model(widget.model().unwrap()).unwrap();
        assert_eq!(model.mesh().triangle_count(), 8);
    }

    #[test]
    fn test_rotation_accumulates() {
        let mut layers = LayerSet::new(1280, 720, 60.0);
        let mut widget = WaypointWidget::new(Size::new(1280.0, 720.0), Position::default());
        widget.register(&mut layers, &empty_resources()).unwrap();

        let mut previous = widget.rotation();
        for _ in 0..100 {
            widget.update(&mut layers).unwrap();
            assert!(widget.rotation() > previous);
            previous = widget.rotation();
        }

        let expected = Mat4::from_rotation_x(ROTATION_STEP * 100.0);
        let model = layers
            .get(RenderLayerKind::Background3D)
            .batch()
            .model(widget.model().unwrap())
            .unwrap();
        assert!(model.matrix().abs_diff_eq(expected, 1e-4));
        assert!((widget.rotation() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_keeps_advancing_at_large_angles() {
        let mut layers = LayerSet::new(1280, 720, 60.0);
        let mut widget = WaypointWidget::new(Size::new(1280.0, 720.0), Position::default());
        widget.register(&mut layers, &empty_resources()).unwrap();

        // About 121 hours at 60 fps with the default step
        widget.rotation = 262_144.0;
        let before = widget.rotation();
        widget.update(&mut layers).unwrap();

        assert!(widget.rotation() > before);
        assert!((widget.rotation() - before - f64::from(ROTATION_STEP)).abs() < 1e-9);

        let expected = Mat4::from_rotation_x(widget.rotation().rem_euclid(TAU) as f32);
        assert!(widget.transform().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_update_before_register_fails() {
        let mut layers = LayerSet::new(1280, 720, 60.0);
        let mut widget = WaypointWidget::new(Size::new(1280.0, 720.0), Position::default());
        assert!(matches!(
            widget.update(&mut layers),
            Err(HudError::NotRegistered)
        ));
        assert_eq!(widget.rotation(), 0.0);
    }

    #[test]
    fn test_broken_model_is_an_error() {
        let dir = std::env::temp_dir().join(format!("hud-waypoint-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.obj"), "v 0 0 0\n").unwrap();

        let mut layers = LayerSet::new(1280, 720, 60.0);
        let mut widget = WaypointWidget::new(Size::new(1280.0, 720.0), Position::default())
            .with_model("broken.obj");
        let result = widget.register(&mut layers, &ResourceLoader::new(vec![dir.clone()]));
        assert!(matches!(result, Err(HudError::Resource(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
