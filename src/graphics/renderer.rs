//! GPU renderer for layer passes
//!
//! Executes each [`LayerPass`] as its own wgpu render pass. Sprites get a
//! texture that is re-uploaded when the sprite's image revision changes;
//! models get vertex/index buffers built once per mesh. Every drawable has
//! its own uniform buffer, written with the camera carried by the pass.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::batch::{Drawable, DrawableId};
use super::layer::{DepthState, DrawTarget, LayerPass, RenderLayerKind};
use super::model::{Mesh, Model, ModelVertex};
use super::sprite::Sprite;

/// Depth buffer format shared by every pass
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Background colour behind all layers
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Sprite uniform buffer data
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SpriteUniforms {
    view_proj: [[f32; 4]; 4],
    /// x, y, width, height in layer pixels
    rect: [f32; 4],
}

/// Model uniform buffer data
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ModelUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
}

type DrawableKey = (RenderLayerKind, DrawableId);

/// GPU resources backing one sprite
struct SpriteGpu {
    texture: wgpu::Texture,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    revision: Option<u64>,
}

/// GPU resources backing one model
struct ModelGpu {
    mesh: Arc<Mesh>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Renders layer passes into the window surface
pub struct LayerRenderer {
    sprite_pipeline: wgpu::RenderPipeline,
    sprite_bind_group_layout: wgpu::BindGroupLayout,
    model_pipeline_depth: wgpu::RenderPipeline,
    model_pipeline_flat: wgpu::RenderPipeline,
    model_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    sprites: HashMap<DrawableKey, SpriteGpu>,
    models: HashMap<DrawableKey, ModelGpu>,
}

impl LayerRenderer {
    /// Create a renderer targeting the given surface format and size
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // Sprite pipeline: [0] uniforms, [1] texture, [2] sampler
        let sprite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/sprite.wgsl").into()),
        });

        let sprite_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Sprite Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let sprite_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&sprite_bind_group_layout],
            push_constant_ranges: &[],
        });

        let sprite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&sprite_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sprite_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &sprite_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(Self::depth_stencil_state(DepthState::FLAT)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Model pipelines: [0] uniforms
        let model_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Model Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/model.wgsl").into()),
        });

        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Model Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let model_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model Pipeline Layout"),
            bind_group_layouts: &[&model_bind_group_layout],
            push_constant_ranges: &[],
        });

        let model_pipeline = |label: &str, depth: DepthState| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&model_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &model_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[ModelVertex::buffer_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &model_shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: depth.cull_faces.then_some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(Self::depth_stencil_state(depth)),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let model_pipeline_depth = model_pipeline(
            "Model Pipeline (depth)",
            RenderLayerKind::Background3D.depth_state(),
        );
        let model_pipeline_flat = model_pipeline("Model Pipeline (flat)", DepthState::FLAT);

        let (depth_texture, depth_view) = Self::create_depth_target(device, width, height);

        Self {
            sprite_pipeline,
            sprite_bind_group_layout,
            model_pipeline_depth,
            model_pipeline_flat,
            model_bind_group_layout,
            sampler,
            depth_texture,
            depth_view,
            sprites: HashMap::new(),
            models: HashMap::new(),
        }
    }

    fn depth_stencil_state(depth: DepthState) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth.depth_test,
            depth_compare: if depth.depth_test {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    fn create_depth_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Layer Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Match the depth target to a new surface size
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let size = self.depth_texture.size();
        if size.width == width.max(1) && size.height == height.max(1) {
            return;
        }

        let (texture, view) = Self::create_depth_target(device, width, height);
        self.depth_texture = texture;
        self.depth_view = view;
        log::debug!("Resized layer depth target to {}x{}", width, height);
    }

    /// Start drawing a frame into `view`
    ///
    /// The first layer pass clears the target; later passes load it.
    pub fn begin_frame<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        encoder: &'a mut wgpu::CommandEncoder,
        view: &'a wgpu::TextureView,
    ) -> LayerFrame<'a> {
        LayerFrame {
            renderer: self,
            device,
            queue,
            encoder,
            view,
            cleared: false,
        }
    }

    /// Create or refresh the GPU side of a sprite
    fn prepare_sprite(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: DrawableKey,
        sprite: &Sprite,
        view_proj: glam::Mat4,
    ) {
        let image = sprite.image();

        let stale = match self.sprites.get(&key) {
            None => true,
            Some(gpu) => gpu.width != image.width || gpu.height != image.height,
        };

        if stale {
            log::debug!(
                "Creating sprite texture {}x{} for {:?}",
                image.width,
                image.height,
                key
            );
            let gpu = self.create_sprite_gpu(device, image.width, image.height);
            self.sprites.insert(key, gpu);
        }

        let Some(gpu) = self.sprites.get_mut(&key) else {
            return;
        };

        if gpu.revision != Some(sprite.revision()) {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &gpu.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &image.to_rgba(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(image.width * 4),
                    rows_per_image: Some(image.height),
                },
                wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
            );
            gpu.revision = Some(sprite.revision());
        }

        let uniforms = SpriteUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            rect: sprite.rect(),
        };
        queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn create_sprite_gpu(&self, device: &wgpu::Device, width: u32, height: u32) -> SpriteGpu {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sprite Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sprite Uniform Buffer"),
            size: std::mem::size_of::<SpriteUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Bind Group"),
            layout: &self.sprite_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        SpriteGpu {
            texture,
            uniform_buffer,
            bind_group,
            width,
            height,
            revision: None,
        }
    }

    /// Create or refresh the GPU side of a model
    fn prepare_model(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: DrawableKey,
        model: &Model,
        view_proj: glam::Mat4,
    ) {
        let stale = match self.models.get(&key) {
            None => true,
            Some(gpu) => !Arc::ptr_eq(&gpu.mesh, model.mesh()),
        };

        if stale {
            let gpu = self.create_model_gpu(device, model.mesh().clone());
            self.models.insert(key, gpu);
        }

        if let Some(gpu) = self.models.get(&key) {
            let uniforms = ModelUniforms {
                view_proj: view_proj.to_cols_array_2d(),
                model: model.matrix().to_cols_array_2d(),
            };
            queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }
    }

    fn create_model_gpu(&self, device: &wgpu::Device, mesh: Arc<Mesh>) -> ModelGpu {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniform Buffer"),
            size: std::mem::size_of::<ModelUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &self.model_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        ModelGpu {
            index_count: mesh.indices.len() as u32,
            mesh,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            bind_group,
        }
    }
}

/// One frame in progress; executes layer passes as they arrive
pub struct LayerFrame<'a> {
    renderer: &'a mut LayerRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    encoder: &'a mut wgpu::CommandEncoder,
    view: &'a wgpu::TextureView,
    cleared: bool,
}

impl LayerFrame<'_> {
    /// Clear the target if no layer pass did (e.g. nothing was rendered)
    pub fn finish(self) {
        if self.cleared {
            return;
        }

        let _ = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }
}

impl DrawTarget for LayerFrame<'_> {
    fn draw_batch(&mut self, pass: LayerPass<'_>) {
        let view_proj = pass.camera.view_projection();

        for (id, drawable) in pass.batch.iter() {
            let key = (pass.kind, id);
            match drawable {
                Drawable::Sprite(sprite) => {
                    self.renderer
                        .prepare_sprite(self.device, self.queue, key, sprite, view_proj)
                }
                Drawable::Model(model) => {
                    self.renderer
                        .prepare_model(self.device, self.queue, key, model, view_proj)
                }
            }
        }

        let load = if self.cleared {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(CLEAR_COLOR)
        };
        self.cleared = true;

        let renderer = &*self.renderer;
        let mut render_pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.kind.display_name()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            // Depth is per layer: each pass starts from a cleared depth buffer
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &renderer.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let model_pipeline = if pass.depth.depth_test {
            &renderer.model_pipeline_depth
        } else {
            &renderer.model_pipeline_flat
        };

        for (id, drawable) in pass.batch.iter() {
            let key = (pass.kind, id);
            match drawable {
                Drawable::Sprite(_) => {
                    let Some(gpu) = renderer.sprites.get(&key) else {
                        continue;
                    };
                    render_pass.set_pipeline(&renderer.sprite_pipeline);
                    render_pass.set_bind_group(0, &gpu.bind_group, &[]);
                    render_pass.draw(0..6, 0..1);
                }
                Drawable::Model(_) => {
                    let Some(gpu) = renderer.models.get(&key) else {
                        continue;
                    };
                    render_pass.set_pipeline(model_pipeline);
                    render_pass.set_bind_group(0, &gpu.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..gpu.index_count, 0, 0..1);
                }
            }
        }
    }
}
