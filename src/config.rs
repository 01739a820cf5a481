//! Configuration for the HUD
//!
//! Loaded from a JSON file. Every section falls back to its defaults, which
//! reproduce the stock 1280x720 canvas fed by a 640x360 RGB capture.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::LogConfig;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "HUD_CONFIG";

/// Default pipeline description: v4l2 MJPEG capture decoded to packed RGB
pub const DEFAULT_LAUNCH: &str = "v4l2src device=/dev/video0 ! image/jpeg,width=640,height=360 \
     ! jpegdec ! videoconvert ! video/x-raw,format=RGB ! appsink name=sink";

/// Errors that can occur while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No platform config directory available")]
    NoConfigDir,
}

/// Which frame source feeds the stream widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Built-in moving colour bars
    #[default]
    TestPattern,
    /// GStreamer launch string with an appsink named "sink"
    Gstreamer,
    /// Native camera capture
    Camera,
}

/// Window and canvas settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Use Fifo presentation (display paced)
    pub vsync: bool,
    /// Redraw rate when vsync is off
    pub target_fps: u32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Show the status readout in the top-left corner
    pub show_status: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "HUD Overlay".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            target_fps: 60,
            fov_degrees: crate::graphics::camera::DEFAULT_FOV_DEGREES,
            show_status: true,
        }
    }
}

/// Stream widget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub enabled: bool,
    pub source: SourceKind,
    /// Pipeline description for the GStreamer source
    pub launch: String,
    /// Camera index for the camera source
    pub camera_index: u32,
    /// Requested capture size (camera and test pattern)
    pub capture_width: u32,
    pub capture_height: u32,
    /// Frame rate of the test pattern
    pub frame_rate: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: SourceKind::default(),
            launch: DEFAULT_LAUNCH.to_string(),
            camera_index: 0,
            capture_width: 640,
            capture_height: 360,
            frame_rate: 30,
            x: 0.0,
            y: 0.0,
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Waypoint widget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypointConfig {
    pub enabled: bool,
    /// Model file name looked up on the resource search path
    pub model: String,
    /// Rotation added every frame, in radians
    pub rotation_step: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "waypoint.obj".to_string(),
            rotation_step: crate::widgets::waypoint::ROTATION_STEP,
            x: 0.0,
            y: 0.0,
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Resource lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Directories searched in order for named resources
    pub search_paths: Vec<PathBuf>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from("resources"), PathBuf::from(".")],
        }
    }
}

/// Complete HUD configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    pub window: WindowConfig,
    pub stream: StreamConfig,
    pub waypoint: WaypointConfig,
    pub resources: ResourceConfig,
    pub log: LogConfig,
}

/// Result of [`HudConfig::load`]
///
/// Loading runs before the logger exists, so a config file that had to be
/// skipped is handed back for the caller to report.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: HudConfig,
    /// Default-location file that failed to load, with the reason
    pub ignored: Option<(PathBuf, ConfigError)>,
}

impl HudConfig {
    /// Default config file location in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("HudOverlay");
            p.push("config.json");
            p
        })
    }

    /// Parse a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load the config for this run
    ///
    /// Uses `HUD_CONFIG` when set, otherwise the platform config file when it
    /// exists, otherwise the defaults. An explicitly named file that cannot
    /// be read or parsed is an error; a broken default file falls back to the
    /// defaults and is reported in [`LoadedConfig::ignored`].
    pub fn load() -> Result<LoadedConfig, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Ok(LoadedConfig {
                config: Self::load_from(Path::new(&path))?,
                ignored: None,
            });
        }

        Ok(match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => LoadedConfig {
                config: Self::default(),
                ignored: None,
            },
        })
    }

    /// Load `path` if it exists, falling back to the defaults when it is
    /// missing or broken
    pub fn load_or_default(path: &Path) -> LoadedConfig {
        if !path.exists() {
            return LoadedConfig {
                config: Self::default(),
                ignored: None,
            };
        }

        match Self::load_from(path) {
            Ok(config) => LoadedConfig {
                config,
                ignored: None,
            },
            Err(e) => LoadedConfig {
                config: Self::default(),
                ignored: Some((path.to_path_buf(), e)),
            },
        }
    }

    /// Save to the platform config file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_canvas() {
        let config = HudConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.fov_degrees, 60.0);
        assert_eq!(config.stream.capture_width, 640);
        assert_eq!(config.stream.capture_height, 360);
        assert!(config.stream.launch.contains("appsink name=sink"));
        assert!(config.stream.launch.contains("format=RGB"));
        assert_eq!(config.waypoint.model, "waypoint.obj");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = HudConfig::from_json(
            r#"{ "window": { "width": 800, "height": 600 }, "stream": { "source": "gstreamer" } }"#,
        )
        .unwrap();

        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert!(config.window.vsync);
        assert_eq!(config.stream.source, SourceKind::Gstreamer);
        assert_eq!(config.stream.capture_width, 640);
        assert_eq!(config.waypoint, WaypointConfig::default());
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let result = HudConfig::from_json(r#"{ "stream": { "source": "ndi" } }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_broken_default_file_is_reported() {
        let dir = std::env::temp_dir().join(format!("hud-config-broken-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, "{ \"window\": ").unwrap();

        let loaded = HudConfig::load_or_default(&path);
        assert_eq!(loaded.config, HudConfig::default());
        match loaded.ignored {
            Some((ignored_path, ConfigError::Parse(_))) => assert_eq!(ignored_path, path),
            other => panic!("expected parse failure to be reported, got {:?}", other),
        }

        let missing = HudConfig::load_or_default(&dir.join("absent.json"));
        assert!(missing.ignored.is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("hud-config-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.json");

        let mut config = HudConfig::default();
        config.window.title = "Rover HUD".to_string();
        config.stream.source = SourceKind::Camera;
        config.save_to(&path).unwrap();

        let loaded = HudConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(&dir);
    }
}
