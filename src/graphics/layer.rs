//! Render layers
//!
//! Three fixed layers are drawn every frame, back to front: a 2D background
//! (video), a 3D background (waypoints) and a 2D foreground. Each layer owns
//! its camera and batch; rendering hands both to a [`DrawTarget`] so no
//! transform state is shared between layers.

use glam::Mat4;

use super::batch::Batch;
use super::camera::{self, LayerCamera};

/// The fixed set of render layers, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderLayerKind {
    Background2D,
    Background3D,
    Foreground2D,
}

impl RenderLayerKind {
    /// All layers in the order they are drawn
    pub const DRAW_ORDER: [RenderLayerKind; 3] = [
        RenderLayerKind::Background2D,
        RenderLayerKind::Background3D,
        RenderLayerKind::Foreground2D,
    ];

    pub fn is_3d(&self) -> bool {
        matches!(self, RenderLayerKind::Background3D)
    }

    /// Depth test and culling used while drawing this layer
    pub fn depth_state(&self) -> DepthState {
        if self.is_3d() {
            DepthState {
                depth_test: true,
                cull_faces: true,
            }
        } else {
            DepthState::FLAT
        }
    }

    /// Display name for logs and UI
    pub fn display_name(&self) -> &'static str {
        match self {
            RenderLayerKind::Background2D => "Background 2D",
            RenderLayerKind::Background3D => "Background 3D",
            RenderLayerKind::Foreground2D => "Foreground 2D",
        }
    }
}

/// Fixed-function state for one layer pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub depth_test: bool,
    pub cull_faces: bool,
}

impl DepthState {
    /// No depth test, no culling
    pub const FLAT: DepthState = DepthState {
        depth_test: false,
        cull_faces: false,
    };
}

/// Everything needed to draw one layer
#[derive(Debug, Clone, Copy)]
pub struct LayerPass<'a> {
    pub kind: RenderLayerKind,
    pub depth: DepthState,
    pub camera: LayerCamera,
    pub batch: &'a Batch,
}

/// Something that can execute layer passes (the GPU renderer, or a recorder
/// in tests)
pub trait DrawTarget {
    fn draw_batch(&mut self, pass: LayerPass<'_>);
}

/// One render layer: a camera plus the batch drawn with it
#[derive(Debug, Clone)]
pub struct RenderLayer {
    kind: RenderLayerKind,
    width: u32,
    height: u32,
    fov: f32,
    projection: Mat4,
    view: Mat4,
    batch: Batch,
}

impl RenderLayer {
    pub fn new(kind: RenderLayerKind, width: u32, height: u32, fov: f32) -> Self {
        let mut layer = Self {
            kind,
            width,
            height,
            fov,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            batch: Batch::new(),
        };
        layer.resize(width, height);
        layer
    }

    /// Recompute the camera for a new canvas size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.projection = if self.kind.is_3d() {
            camera::perspective(camera::aspect_ratio(width, height), self.fov)
        } else {
            camera::orthographic(width, height)
        };
        self.view = camera::default_view();
    }

    /// Change the field of view (only affects the 3D layer's projection)
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.resize(self.width, self.height);
    }

    /// Hand this layer's camera and batch to the draw target
    pub fn render(&self, target: &mut impl DrawTarget) {
        target.draw_batch(LayerPass {
            kind: self.kind,
            depth: self.kind.depth_state(),
            camera: self.camera(),
            batch: &self.batch,
        });
    }

    pub fn kind(&self) -> RenderLayerKind {
        self.kind
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn camera(&self) -> LayerCamera {
        LayerCamera {
            projection: self.projection,
            view: self.view,
        }
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn batch_mut(&mut self) -> &mut Batch {
        &mut self.batch
    }
}

/// The three layers of the HUD
#[derive(Debug, Clone)]
pub struct LayerSet {
    background_2d: RenderLayer,
    background_3d: RenderLayer,
    foreground_2d: RenderLayer,
}

impl LayerSet {
    pub fn new(width: u32, height: u32, fov: f32) -> Self {
        Self {
            background_2d: RenderLayer::new(RenderLayerKind::Background2D, width, height, fov),
            background_3d: RenderLayer::new(RenderLayerKind::Background3D, width, height, fov),
            foreground_2d: RenderLayer::new(RenderLayerKind::Foreground2D, width, height, fov),
        }
    }

    pub fn get(&self, kind: RenderLayerKind) -> &RenderLayer {
        match kind {
            RenderLayerKind::Background2D => &self.background_2d,
            RenderLayerKind::Background3D => &self.background_3d,
            RenderLayerKind::Foreground2D => &self.foreground_2d,
        }
    }

    pub fn get_mut(&mut self, kind: RenderLayerKind) -> &mut RenderLayer {
        match kind {
            RenderLayerKind::Background2D => &mut self.background_2d,
            RenderLayerKind::Background3D => &mut self.background_3d,
            RenderLayerKind::Foreground2D => &mut self.foreground_2d,
        }
    }

    /// Layers in draw order
    pub fn iter(&self) -> impl Iterator<Item = &RenderLayer> {
        RenderLayerKind::DRAW_ORDER.into_iter().map(move |kind| self.get(kind))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        for kind in RenderLayerKind::DRAW_ORDER {
            self.get_mut(kind).resize(width, height);
        }
    }

    /// Render every layer in draw order
    pub fn render(&self, target: &mut impl DrawTarget) {
        for layer in self.iter() {
            layer.render(target);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use glam::Vec4;

    /// Records what each pass carried
    #[derive(Default)]
    pub(crate) struct RecordingTarget {
        pub passes: Vec<(RenderLayerKind, DepthState, LayerCamera, usize)>,
    }

    impl DrawTarget for RecordingTarget {
        fn draw_batch(&mut self, pass: LayerPass<'_>) {
            self.passes
                .push((pass.kind, pass.depth, pass.camera, pass.batch.len()));
        }
    }

    #[test]
    fn test_2d_layers_follow_resize() {
        let mut layer = RenderLayer::new(RenderLayerKind::Foreground2D, 1280, 720, 60.0);
        for (w, h) in [(800, 600), (1920, 1080), (333, 77)] {
            layer.resize(w, h);
            let inverse = layer.projection().inverse();
            let low = inverse * Vec4::new(-1.0, -1.0, 0.0, 1.0);
            let high = inverse * Vec4::new(1.0, 1.0, 0.0, 1.0);
            assert!((low.x).abs() < 1e-3 && (low.y).abs() < 1e-3);
            assert!((high.x - w as f32).abs() < 1e-2 && (high.y - h as f32).abs() < 1e-2);
            assert_eq!(layer.size(), (w, h));
        }
    }

    #[test]
    fn test_3d_layer_uses_perspective() {
        let mut layer = RenderLayer::new(RenderLayerKind::Background3D, 1280, 720, 60.0);
        assert_eq!(
            layer.projection(),
            camera::perspective(1280.0 / 720.0, 60.0)
        );

        layer.set_fov(90.0);
        assert_eq!(layer.projection(), camera::perspective(1280.0 / 720.0, 90.0));
        assert_eq!(layer.view(), camera::default_view());
    }

    #[test]
    fn test_depth_state_per_layer() {
        assert_eq!(RenderLayerKind::Background2D.depth_state(), DepthState::FLAT);
        assert_eq!(RenderLayerKind::Foreground2D.depth_state(), DepthState::FLAT);
        let depth = RenderLayerKind::Background3D.depth_state();
        assert!(depth.depth_test && depth.cull_faces);
    }

    #[test]
    fn test_passes_carry_their_own_camera_in_order() {
        let layers = LayerSet::new(1280, 720, 60.0);
        let mut target = RecordingTarget::default();
        layers.render(&mut target);

        let kinds: Vec<_> = target.passes.iter().map(|p| p.0).collect();
        assert_eq!(kinds, RenderLayerKind::DRAW_ORDER.to_vec());

        for (kind, depth, camera, _) in &target.passes {
            let layer = layers.get(*kind);
            assert_eq!(*camera, layer.camera());
            assert_eq!(*depth, kind.depth_state());
        }

        // The 3D pass must not carry a 2D projection and vice versa
        assert_ne!(target.passes[0].2, target.passes[1].2);
        assert_ne!(target.passes[1].2, target.passes[2].2);
    }
}
