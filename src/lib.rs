//! HUD Overlay - layered video and 3D waypoint compositor
//!
//! Composites a live video stream and a rotating 3D waypoint marker over
//! three render layers (2D background, 3D background, 2D foreground) in a
//! single wgpu window. Video frames arrive from a media pipeline thread and
//! are handed to the render loop through a single-slot mailbox.

pub mod app;
pub mod config;
pub mod error;
pub mod graphics;
pub mod hud;
pub mod logging;
pub mod pipeline;
pub mod ui;
pub mod widgets;

pub use app::App;
pub use config::HudConfig;
pub use error::HudError;
pub use hud::Hud;
pub use widgets::{Position, Size, StreamWidget, WaypointWidget, Widget};
