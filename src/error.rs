//! Top-level error type
//!
//! Every failure that reaches the entry point is fatal: it is logged and the
//! process exits.

use thiserror::Error;

use crate::config::ConfigError;
use crate::graphics::resource::ResourceError;
use crate::pipeline::PipelineError;

/// Errors surfaced by the HUD
#[derive(Error, Debug)]
pub enum HudError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Video pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
    #[error("Widget updated before being registered to a render layer")]
    NotRegistered,
    #[error("Graphics error: {0}")]
    Graphics(String),
}
