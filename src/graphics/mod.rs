//! Layered rendering
//!
//! Cameras, drawables, batches and the three render layers, plus the wgpu
//! renderer that executes layer passes.

pub mod batch;
pub mod camera;
pub mod layer;
pub mod model;
pub mod renderer;
pub mod resource;
pub mod sprite;

pub use batch::{Batch, Drawable, DrawableId};
pub use camera::LayerCamera;
pub use layer::{DepthState, DrawTarget, LayerPass, LayerSet, RenderLayer, RenderLayerKind};
pub use model::{Mesh, Model, ModelVertex};
pub use renderer::{LayerFrame, LayerRenderer};
pub use resource::{ResourceError, ResourceLoader};
pub use sprite::Sprite;
