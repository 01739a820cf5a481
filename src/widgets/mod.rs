//! HUD widgets
//!
//! A widget owns a placement on screen and the per-frame logic that keeps
//! its drawable current. Each widget is registered against exactly one render
//! layer before it is updated.

pub mod stream;
pub mod waypoint;

pub use stream::{StreamState, StreamWidget};
pub use waypoint::WaypointWidget;

use crate::error::HudError;
use crate::graphics::{LayerSet, RenderLayerKind, ResourceLoader};

/// Screen position in layer pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Widget size in layer pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Every widget kind the HUD can host
pub enum Widget {
    Stream(StreamWidget),
    Waypoint(WaypointWidget),
}

impl Widget {
    /// Bind to a render layer and build one-time resources
    pub fn register(
        &mut self,
        layers: &mut LayerSet,
        resources: &ResourceLoader,
    ) -> Result<(), HudError> {
        match self {
            Widget::Stream(widget) => widget.register(layers, resources),
            Widget::Waypoint(widget) => widget.register(layers, resources),
        }
    }

    /// Bring the widget's drawable up to date; called once per frame
    pub fn update(&mut self, layers: &mut LayerSet) -> Result<(), HudError> {
        match self {
            Widget::Stream(widget) => widget.update(layers),
            Widget::Waypoint(widget) => widget.update(layers),
        }
    }

    /// The layer this widget is registered to, if any
    pub fn layer(&self) -> Option<RenderLayerKind> {
        match self {
            Widget::Stream(widget) => widget.layer(),
            Widget::Waypoint(widget) => widget.layer(),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Widget::Stream(widget) => widget.position(),
            Widget::Waypoint(widget) => widget.position(),
        }
    }

    pub fn size(&self) -> Size {
        match self {
            Widget::Stream(widget) => widget.size(),
            Widget::Waypoint(widget) => widget.size(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Widget::Stream(_) => "stream",
            Widget::Waypoint(_) => "waypoint",
        }
    }

    pub fn as_stream(&self) -> Option<&StreamWidget> {
        match self {
            Widget::Stream(widget) => Some(widget),
            _ => None,
        }
    }

    pub fn as_waypoint(&self) -> Option<&WaypointWidget> {
        match self {
            Widget::Waypoint(widget) => Some(widget),
            _ => None,
        }
    }
}

impl From<StreamWidget> for Widget {
    fn from(widget: StreamWidget) -> Self {
        Widget::Stream(widget)
    }
}

impl From<WaypointWidget> for Widget {
    fn from(widget: WaypointWidget) -> Self {
        Widget::Waypoint(widget)
    }
}
