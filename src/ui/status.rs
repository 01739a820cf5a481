//! Status readout
//!
//! A small egui area in the top-left corner showing frame rate and stream
//! health. Drawn over the layers after the foreground pass.

use std::time::Instant;

use winit::event::WindowEvent;
use winit::window::Window;

use crate::hud::Hud;
use crate::widgets::StreamState;

/// Recompute the frame rate once per interval
const FPS_UPDATE_INTERVAL_SECS: f64 = 1.0;

/// Frame rate counter
#[derive(Debug, Clone)]
pub struct FrameStats {
    frame_count: u64,
    frames_since_update: u64,
    last_fps_update: Instant,
    fps: f64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            frames_since_update: 0,
            last_fps_update: Instant::now(),
            fps: 0.0,
        }
    }

    /// Count a presented frame
    pub fn record_frame(&mut self) {
        self.record_frame_at(Instant::now());
    }

    pub fn record_frame_at(&mut self, now: Instant) {
        self.frame_count += 1;
        self.frames_since_update += 1;

        let elapsed = now.duration_since(self.last_fps_update).as_secs_f64();
        if elapsed >= FPS_UPDATE_INTERVAL_SECS {
            self.fps = self.frames_since_update as f64 / elapsed;
            self.frames_since_update = 0;
            self.last_fps_update = now;
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

/// What the readout shows for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub fps: f64,
    pub target_fps: u32,
    pub stream: Option<StreamStatus>,
    pub waypoint_rotation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamStatus {
    pub state: StreamState,
    pub source: Option<String>,
    pub resolution: Option<(u32, u32)>,
    pub frames_shown: u64,
    pub frames_dropped: u64,
}

impl StatusSnapshot {
    pub fn capture(hud: &Hud, stats: &FrameStats, target_fps: u32) -> Self {
        let stream = hud
            .widgets()
            .iter()
            .find_map(|widget| widget.as_stream())
            .map(|stream| StreamStatus {
                state: stream.state(),
                source: stream.source_description(),
                resolution: stream.stream_size(),
                frames_shown: stream.frames_shown(),
                frames_dropped: stream.mailbox().dropped(),
            });

        let waypoint_rotation = hud
            .widgets()
            .iter()
            .find_map(|widget| widget.as_waypoint())
            .map(|waypoint| waypoint.rotation());

        Self {
            fps: stats.fps(),
            target_fps,
            stream,
            waypoint_rotation,
        }
    }

    /// Text lines shown in the overlay
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("FPS: {:.1} / {}", self.fps, self.target_fps)];

        if let Some(stream) = &self.stream {
            let state = match stream.state {
                StreamState::NoFrame => "waiting for frames",
                StreamState::FrameAvailableNoSprite => "first frame pending",
                StreamState::SpriteLive => "live",
            };
            lines.push(format!("Stream: {}", state));
            if let Some(source) = &stream.source {
                lines.push(format!("Source: {}", source));
            }
            if let Some((width, height)) = stream.resolution {
                lines.push(format!("Resolution: {}x{}", width, height));
            }
            lines.push(format!(
                "Frames: {} shown, {} dropped",
                stream.frames_shown, stream.frames_dropped
            ));
        }

        if let Some(rotation) = self.waypoint_rotation {
            lines.push(format!("Waypoint: {:.2} rad", rotation));
        }

        lines
    }
}

fn fps_color(fps: f64, target_fps: u32) -> egui::Color32 {
    let ratio = fps / target_fps.max(1) as f64;
    if ratio >= 0.95 {
        egui::Color32::from_rgb(100, 255, 100)
    } else if ratio >= 0.5 {
        egui::Color32::from_rgb(255, 230, 100)
    } else {
        egui::Color32::from_rgb(255, 80, 80)
    }
}

/// egui context, input state and renderer for the readout
pub struct StatusOverlay {
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    visible: bool,
}

impl StatusOverlay {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        window: &Window,
        visible: bool,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let mut style = (*egui_ctx.style()).clone();
        style.visuals.window_shadow = egui::epaint::Shadow::NONE;
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
            visible,
        }
    }

    /// Feed a window event to egui, returning true if it was consumed
    pub fn handle_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.egui_state.on_window_event(window, event).consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Draw the readout on top of whatever `view` already holds
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        window: &Window,
        size_in_pixels: [u32; 2],
        snapshot: &StatusSnapshot,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);
        let visible = self.visible;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if !visible {
                return;
            }
            egui::Area::new(egui::Id::new("hud_status"))
                .anchor(egui::Align2::LEFT_TOP, egui::vec2(8.0, 8.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        let color = fps_color(snapshot.fps, snapshot.target_fps);
                        for (index, line) in snapshot.lines().into_iter().enumerate() {
                            let text = egui::RichText::new(line).monospace();
                            if index == 0 {
                                ui.label(text.color(color));
                            } else {
                                ui.label(text);
                            }
                        }
                    });
                });
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: window.scale_factor() as f32,
        };

        self.egui_renderer
            .update_buffers(device, queue, encoder, &paint_jobs, &screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Status Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            self.egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fps_updates_after_interval() {
        let mut stats = FrameStats::new();
        let start = stats.last_fps_update;

        for i in 1..=30 {
            stats.record_frame_at(start + Duration::from_millis(i * 10));
        }
        assert_eq!(stats.fps(), 0.0);

        stats.record_frame_at(start + Duration::from_secs(1));
        assert!((stats.fps() - 31.0).abs() < 1e-6);
        assert_eq!(stats.frame_count(), 31);
    }

    #[test]
    fn test_snapshot_lines() {
        let snapshot = StatusSnapshot {
            fps: 59.94,
            target_fps: 60,
            stream: Some(StreamStatus {
                state: StreamState::SpriteLive,
                source: Some("test pattern 640x360".to_string()),
                resolution: Some((640, 360)),
                frames_shown: 120,
                frames_dropped: 3,
            }),
            waypoint_rotation: Some(1.2),
        };

        assert_eq!(
            snapshot.lines(),
            vec![
                "FPS: 59.9 / 60",
                "Stream: live",
                "Source: test pattern 640x360",
                "Resolution: 640x360",
                "Frames: 120 shown, 3 dropped",
                "Waypoint: 1.20 rad",
            ]
        );
    }

    #[test]
    fn test_snapshot_without_widgets() {
        let snapshot = StatusSnapshot {
            fps: 0.0,
            target_fps: 30,
            stream: None,
            waypoint_rotation: None,
        };
        assert_eq!(snapshot.lines(), vec!["FPS: 0.0 / 30"]);
    }
}
