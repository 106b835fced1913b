use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::MAX_DEVICE_INDEX;

const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;
const DEFAULT_WINDOW: &str = "faceview";
const DEFAULT_POLL_TIMEOUT_MS: u64 = 1;

#[derive(Debug, Deserialize, Default)]
struct FaceviewConfigFile {
    camera: Option<CameraConfigFile>,
    display: Option<DisplayConfigFile>,
    detect: Option<DetectConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    preferred_index: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    read_failure_budget: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    window: Option<String>,
    poll_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectConfigFile {
    cascade_path: Option<PathBuf>,
    mesh_model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FaceviewConfig {
    pub camera: CameraSettings,
    pub display: DisplaySettings,
    pub detect: DetectSettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub preferred_index: Option<u32>,
    pub width: u32,
    pub height: u32,
    /// `None` means transient read failures are retried forever.
    pub read_failure_budget: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub window: String,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DetectSettings {
    pub cascade_path: Option<PathBuf>,
    pub mesh_model_path: Option<PathBuf>,
}

impl FaceviewConfig {
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Load with an explicit config file path taking precedence over the
    /// `FACEVIEW_CONFIG` environment variable.
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("FACEVIEW_CONFIG").ok();
        let config_path = path.or(env_path.as_deref().map(Path::new));
        let file_cfg = match config_path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FaceviewConfigFile) -> Self {
        let camera = CameraSettings {
            preferred_index: file.camera.as_ref().and_then(|camera| camera.preferred_index),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_HEIGHT),
            read_failure_budget: file.camera.and_then(|camera| camera.read_failure_budget),
        };
        let display = DisplaySettings {
            window: file
                .display
                .as_ref()
                .and_then(|display| display.window.clone())
                .unwrap_or_else(|| DEFAULT_WINDOW.to_string()),
            poll_timeout: Duration::from_millis(
                file.display
                    .and_then(|display| display.poll_timeout_ms)
                    .unwrap_or(DEFAULT_POLL_TIMEOUT_MS),
            ),
        };
        let detect = DetectSettings {
            cascade_path: file.detect.as_ref().and_then(|d| d.cascade_path.clone()),
            mesh_model_path: file.detect.and_then(|d| d.mesh_model_path),
        };
        Self {
            camera,
            display,
            detect,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(index) = std::env::var("FACEVIEW_CAMERA_INDEX") {
            let parsed: u32 = index
                .parse()
                .map_err(|_| anyhow!("FACEVIEW_CAMERA_INDEX must be an integer device index"))?;
            self.camera.preferred_index = Some(parsed);
        }
        if let Ok(width) = std::env::var("FACEVIEW_WIDTH") {
            let parsed: u32 = width
                .parse()
                .map_err(|_| anyhow!("FACEVIEW_WIDTH must be an integer pixel width"))?;
            self.camera.width = parsed;
        }
        if let Ok(height) = std::env::var("FACEVIEW_HEIGHT") {
            let parsed: u32 = height
                .parse()
                .map_err(|_| anyhow!("FACEVIEW_HEIGHT must be an integer pixel height"))?;
            self.camera.height = parsed;
        }
        if let Ok(budget) = std::env::var("FACEVIEW_READ_FAILURE_BUDGET") {
            let parsed: u32 = budget.parse().map_err(|_| {
                anyhow!("FACEVIEW_READ_FAILURE_BUDGET must be an integer read count")
            })?;
            self.camera.read_failure_budget = Some(parsed);
        }
        if let Ok(window) = std::env::var("FACEVIEW_WINDOW") {
            if !window.trim().is_empty() {
                self.display.window = window;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(index) = self.camera.preferred_index {
            if index > MAX_DEVICE_INDEX {
                return Err(anyhow!(
                    "camera index {} is out of range (devices 0..={} are probed)",
                    index,
                    MAX_DEVICE_INDEX
                ));
            }
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("capture resolution must be non-zero"));
        }
        if self.camera.read_failure_budget == Some(0) {
            return Err(anyhow!("read failure budget must be greater than zero"));
        }
        if self.display.window.trim().is_empty() {
            return Err(anyhow!("window name must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FaceviewConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
