//! HUD Overlay - Main Entry Point
//!
//! Composites a live video stream and a rotating waypoint marker in a single
//! window until the window is closed or Escape is pressed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hud_overlay::config::HudConfig;
use hud_overlay::graphics::ResourceLoader;
use hud_overlay::logging::{init_logging, LogConfig};
use hud_overlay::pipeline::build_source;
use hud_overlay::widgets::{Position, Size, StreamWidget, WaypointWidget, Widget};
use hud_overlay::{App, Hud, HudError};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Application state machine
enum AppState {
    /// Window not created yet; the HUD waits here
    Uninitialized(Option<Hud>),
    /// Window and graphics context are ready
    Running { window: Arc<Window>, app: App },
}

/// winit handler driving the HUD
struct HudOverlayApp {
    config: HudConfig,
    state: AppState,
    /// Cleared by a close request or Escape; the loop exits once false
    alive: bool,
    next_redraw_at: Instant,
    fatal: Option<HudError>,
}

impl HudOverlayApp {
    fn new(config: HudConfig, hud: Hud) -> Self {
        Self {
            config,
            state: AppState::Uninitialized(Some(hud)),
            alive: true,
            next_redraw_at: Instant::now(),
            fatal: None,
        }
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        self.alive = false;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: HudError) {
        log::error!("{}", error);
        self.fatal = Some(error);
        self.shut_down(event_loop);
    }

    fn create_app(&mut self, event_loop: &ActiveEventLoop, hud: Hud) -> Result<(), HudError> {
        let window_config = &self.config.window;
        log::info!("Creating window...");

        let window_attributes = WindowAttributes::default()
            .with_title(window_config.title.clone())
            .with_inner_size(LogicalSize::new(window_config.width, window_config.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| HudError::Graphics(format!("Failed to create window: {}", e)))?,
        );

        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let app = pollster::block_on(App::new(
            window.clone(),
            hud,
            window_config.vsync,
            window_config.target_fps,
            window_config.show_status,
        ))?;

        log::info!("HUD ready. Press ESC to exit, F1 for status, F11 for fullscreen");

        self.state = AppState::Running { window, app };
        Ok(())
    }
}

impl ApplicationHandler for HudOverlayApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Uninitialized(pending) = &mut self.state else {
            return;
        };
        let Some(hud) = pending.take() else {
            return;
        };

        if let Err(e) = self.create_app(event_loop, hud) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let AppState::Running { window, app } = &mut self.state else {
            return;
        };

        let overlay_consumed = app.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                self.shut_down(event_loop);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } if !overlay_consumed => match key_code {
                KeyCode::Escape => {
                    log::info!("Escape pressed, exiting...");
                    self.shut_down(event_loop);
                }
                KeyCode::F1 => app.toggle_status(),
                KeyCode::F11 => {
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                        log::info!("Exiting fullscreen");
                    } else {
                        window.set_fullscreen(Some(winit::window::Fullscreen::Borderless(None)));
                        log::info!("Entering fullscreen");
                    }
                }
                _ => {}
            },

            WindowEvent::Resized(physical_size) => {
                app.resize(physical_size);
            }

            WindowEvent::RedrawRequested if self.alive => {
                if let Err(e) = app.frame() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.alive {
            return;
        }

        let AppState::Running { window, .. } = &self.state else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        // Drive redraws at the target rate
        let target_fps = self.config.window.target_fps.max(1);
        let frame_duration = Duration::from_nanos(1_000_000_000u64 / target_fps as u64);
        let now = Instant::now();

        if now >= self.next_redraw_at {
            window.request_redraw();
            self.next_redraw_at += frame_duration;

            // Reset if too far behind
            if now > self.next_redraw_at + frame_duration * 2 {
                self.next_redraw_at = now + frame_duration;
            }
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_redraw_at));
    }
}

/// Build the widget list from the config
fn build_widgets(config: &HudConfig) -> Result<Vec<Widget>, HudError> {
    let mut widgets = Vec::new();

    let stream = &config.stream;
    if stream.enabled {
        let source = build_source(stream)?;
        let widget = StreamWidget::new(
            Size::new(stream.width, stream.height),
            Position::new(stream.x, stream.y),
        )
        .with_source(source);
        widgets.push(widget.into());
    }

    let waypoint = &config.waypoint;
    if waypoint.enabled {
        let widget = WaypointWidget::new(
            Size::new(waypoint.width, waypoint.height),
            Position::new(waypoint.x, waypoint.y),
        )
        .with_model(waypoint.model.clone())
        .with_rotation_step(waypoint.rotation_step);
        widgets.push(widget.into());
    }

    Ok(widgets)
}

fn run(config: HudConfig) -> Result<(), HudError> {
    let resources = ResourceLoader::new(config.resources.search_paths.clone());

    let widgets = build_widgets(&config)?;
    let hud = Hud::with_fov(
        config.window.width,
        config.window.height,
        config.window.fov_degrees,
        widgets,
        &resources,
    )?;

    let event_loop = EventLoop::new()
        .map_err(|e| HudError::Graphics(format!("Failed to create event loop: {}", e)))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = HudOverlayApp::new(config, hud);
    event_loop
        .run_app(&mut app)
        .map_err(|e| HudError::Graphics(format!("Event loop error: {}", e)))?;

    match app.fatal.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn main() {
    let loaded = match HudConfig::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(&LogConfig::default());
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let config = loaded.config;

    init_logging(&config.log);
    log::info!("HUD Overlay v{}", env!("CARGO_PKG_VERSION"));

    if let Some((path, e)) = loaded.ignored {
        log::warn!("Ignoring config at {}: {} (using defaults)", path.display(), e);
    }

    if let Err(e) = run(config) {
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
