//! HUD composition
//!
//! Ties the three render layers to the widget list. Holds no GPU state, so
//! the whole update/render cycle can run against any [`DrawTarget`].

use glam::Mat4;

use crate::error::HudError;
use crate::graphics::camera::{self, DEFAULT_FOV_DEGREES};
use crate::graphics::{DrawTarget, LayerSet, ResourceLoader};
use crate::widgets::Widget;

/// Layers plus the widgets drawing into them
pub struct Hud {
    width: u32,
    height: u32,
    fov: f32,
    projection: Mat4,
    layers: LayerSet,
    widgets: Vec<Widget>,
    frame_count: u64,
}

impl Hud {
    /// Build the layers and register every widget in list order
    pub fn new(
        width: u32,
        height: u32,
        widgets: Vec<Widget>,
        resources: &ResourceLoader,
    ) -> Result<Self, HudError> {
        Self::with_fov(width, height, DEFAULT_FOV_DEGREES, widgets, resources)
    }

    pub fn with_fov(
        width: u32,
        height: u32,
        fov: f32,
        mut widgets: Vec<Widget>,
        resources: &ResourceLoader,
    ) -> Result<Self, HudError> {
        let mut layers = LayerSet::new(width, height, fov);

        for widget in &mut widgets {
            widget.register(&mut layers, resources)?;
            log::info!(
                "Registered {} widget on {}",
                widget.name(),
                widget
                    .layer()
                    .map(|kind| kind.display_name())
                    .unwrap_or("no layer")
            );
        }

        Ok(Self {
            width,
            height,
            fov,
            projection: camera::perspective(camera::aspect_ratio(width, height), fov),
            layers,
            widgets,
            frame_count: 0,
        })
    }

    /// Update every widget; the first error stops the frame
    pub fn update(&mut self) -> Result<(), HudError> {
        for widget in &mut self.widgets {
            widget.update(&mut self.layers)?;
        }
        self.frame_count += 1;
        Ok(())
    }

    /// Render all layers back to front
    pub fn render(&self, target: &mut impl DrawTarget) {
        self.layers.render(target);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.projection = camera::perspective(camera::aspect_ratio(width, height), self.fov);
        self.layers.resize(width, height);
        log::debug!("HUD resized to {}x{}", width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Default perspective projection for the canvas
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Number of completed updates
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::layer::tests::RecordingTarget;
    use crate::graphics::RenderLayerKind;
    use crate::pipeline::VideoFrame;
    use crate::widgets::{Position, Size, StreamState, StreamWidget, WaypointWidget};
    use glam::Vec2;
    use std::path::PathBuf;

    fn resources() -> ResourceLoader {
        ResourceLoader::new(vec![PathBuf::from("/nonexistent/hud-overlay")])
    }

    fn hud() -> Hud {
        let canvas = Size::new(1280.0, 720.0);
        let widgets = vec![
            StreamWidget::new(canvas, Position::default()).into(),
            WaypointWidget::new(canvas, Position::default()).into(),
        ];
        Hud::new(1280, 720, widgets, &resources()).unwrap()
    }

    fn stream(hud: &Hud) -> &StreamWidget {
        hud.widgets()[0].as_stream().unwrap()
    }

    #[test]
    fn test_widgets_bound_to_their_layers() {
        let mut hud = hud();
        assert_eq!(hud.widgets()[0].layer(), Some(RenderLayerKind::Background2D));
        assert_eq!(hud.widgets()[1].layer(), Some(RenderLayerKind::Background3D));
        assert_eq!(hud.projection(), camera::perspective(1280.0 / 720.0, 60.0));

        hud.update().unwrap();
        assert_eq!(stream(&hud).state(), StreamState::NoFrame);
        assert_eq!(hud.frame_count(), 1);
    }

    #[test]
    fn test_frame_scaled_to_canvas() {
        let mut hud = hud();
        let frame = VideoFrame::new(vec![0; VideoFrame::expected_size(640, 360)], 640, 360).unwrap();
        stream(&hud).mailbox().publish(frame);

        hud.update().unwrap();

        let widget = stream(&hud);
        assert_eq!(widget.state(), StreamState::SpriteLive);
        let sprite = hud
            .layers()
            .get(RenderLayerKind::Background2D)
            .batch()
            .sprite(widget.sprite().unwrap())
            .unwrap();
        assert_eq!(sprite.scale(), Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_render_order_and_contents() {
        let mut hud = hud();
        let frame = VideoFrame::new(vec![0; VideoFrame::expected_size(8, 8)], 8, 8).unwrap();
        stream(&hud).mailbox().publish(frame);
        hud.update().unwrap();

        let mut target = RecordingTarget::default();
        hud.render(&mut target);

        let summary: Vec<_> = target.passes.iter().map(|p| (p.0, p.3)).collect();
        assert_eq!(
            summary,
            vec![
                (RenderLayerKind::Background2D, 1),
                (RenderLayerKind::Background3D, 1),
                (RenderLayerKind::Foreground2D, 0),
            ]
        );
    }

    #[test]
    fn test_resize_updates_layers() {
        let mut hud = hud();
        hud.resize(800, 600);
        assert_eq!(hud.size(), (800, 600));
        assert_eq!(hud.layers().get(RenderLayerKind::Foreground2D).size(), (800, 600));
        assert_eq!(hud.projection(), camera::perspective(800.0 / 600.0, 60.0));
    }

    #[test]
    fn test_empty_widget_list() {
        let mut hud = Hud::new(640, 480, Vec::new(), &resources()).unwrap();
        hud.update().unwrap();

        let mut target = RecordingTarget::default();
        hud.render(&mut target);
        assert_eq!(target.passes.len(), 3);
    }
}
