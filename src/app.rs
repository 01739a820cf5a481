//! Window graphics context and per-frame driver
//!
//! Owns the wgpu surface, device and queue, the layer renderer and the
//! status overlay. Each frame updates the HUD, renders its layers back to
//! front, draws the status readout and presents.

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::error::HudError;
use crate::graphics::LayerRenderer;
use crate::hud::Hud;
use crate::ui::{FrameStats, StatusOverlay, StatusSnapshot};

/// Layer canvas size in logical pixels, the units widget boxes use
fn layer_size(size: PhysicalSize<u32>, scale_factor: f64) -> (u32, u32) {
    let logical = size.to_logical::<f64>(scale_factor);
    (
        (logical.width.round() as u32).max(1),
        (logical.height.round() as u32).max(1),
    )
}

/// Main application state
pub struct App {
    /// Reference to the window
    window: Arc<Window>,
    /// The wgpu surface for presenting rendered frames
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Current window size in physical pixels
    size: PhysicalSize<u32>,

    hud: Hud,
    renderer: LayerRenderer,
    overlay: StatusOverlay,
    stats: FrameStats,
    target_fps: u32,
}

impl App {
    /// Create the graphics context for `window` and take ownership of the HUD
    pub async fn new(
        window: Arc<Window>,
        hud: Hud,
        vsync: bool,
        target_fps: u32,
        show_status: bool,
    ) -> Result<Self, HudError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| HudError::Graphics(format!("Failed to create surface: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| HudError::Graphics("No suitable GPU adapter found".to_string()))?;

        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("HUD Overlay Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| HudError::Graphics(format!("Failed to create device: {}", e)))?;

        let surface_caps = surface.get_capabilities(&adapter);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| HudError::Graphics("Surface reports no formats".to_string()))?;

        log::info!("Surface format: {:?}", surface_format);

        let present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else if surface_caps
            .present_modes
            .contains(&wgpu::PresentMode::Mailbox)
        {
            wgpu::PresentMode::Mailbox
        } else if surface_caps
            .present_modes
            .contains(&wgpu::PresentMode::Immediate)
        {
            wgpu::PresentMode::Immediate
        } else {
            wgpu::PresentMode::Fifo
        };

        log::info!("Present mode: {:?}", present_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let renderer = LayerRenderer::new(&device, surface_format, config.width, config.height);
        let overlay = StatusOverlay::new(&device, surface_format, &window, show_status);

        let mut hud = hud;
        let (layer_width, layer_height) = layer_size(size, window.scale_factor());
        hud.resize(layer_width, layer_height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            hud,
            renderer,
            overlay,
            stats: FrameStats::new(),
            target_fps,
        })
    }

    /// Handle a window event, returning true if the overlay consumed it
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.overlay.handle_window_event(&self.window, event)
    }

    /// Resize the surface, depth target and layers
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer
                .resize(&self.device, new_size.width, new_size.height);
            let (layer_width, layer_height) =
                layer_size(new_size, self.window.scale_factor());
            self.hud.resize(layer_width, layer_height);
        }
    }

    /// Get current size
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn toggle_status(&mut self) {
        self.overlay.toggle();
    }

    /// Update widgets, then render and present
    ///
    /// Widget errors are fatal and returned; surface errors are handled here
    /// except running out of memory.
    pub fn frame(&mut self) -> Result<(), HudError> {
        self.hud.update()?;

        match self.render() {
            Ok(()) => Ok(()),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring...");
                self.resize(self.size);
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                Err(HudError::Graphics("Out of GPU memory".to_string()))
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                Ok(())
            }
        }
    }

    /// Render all layers and the status overlay into the next surface texture
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("HUD Frame Encoder"),
            });

        {
            let mut frame = self
                .renderer
                .begin_frame(&self.device, &self.queue, &mut encoder, &view);
            self.hud.render(&mut frame);
            frame.finish();
        }

        let snapshot = StatusSnapshot::capture(&self.hud, &self.stats, self.target_fps);
        self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            &self.window,
            [self.config.width, self.config.height],
            &snapshot,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.stats.record_frame();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_use_logical_pixels_on_hidpi() {
        assert_eq!(layer_size(PhysicalSize::new(2560, 1440), 2.0), (1280, 720));
        assert_eq!(layer_size(PhysicalSize::new(1920, 1080), 1.5), (1280, 720));
    }

    #[test]
    fn test_layer_size_matches_physical_at_unit_scale() {
        assert_eq!(layer_size(PhysicalSize::new(1280, 720), 1.0), (1280, 720));
        assert_eq!(layer_size(PhysicalSize::new(1, 1), 2.0), (1, 1));
    }
}
