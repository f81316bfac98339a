//! Persisted capture configuration
//!
//! All knobs the recording controls expose live in one explicit value that
//! is handed to the controller at construction and written back when a
//! selection changes. Nothing here is global state.

use crate::host::CaptureProfile;
use crate::screen::CaptureRegion;
use crate::state::CaptureDeviceKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings persistence errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Capture configuration, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// Dedicated capture directory, used when `capture_to_project_folder`
    /// is off or no project folder is known
    pub capture_folder: PathBuf,

    /// Prefer the project folder over the dedicated capture directory
    pub capture_to_project_folder: bool,

    /// Default device kind selected in the controls
    pub default_device: CaptureDeviceKind,

    /// Default audio capture device name
    pub default_audio_device: String,

    /// Audio capture volume, 0-100
    pub audio_capture_volume: u8,

    /// Audio enablement toggle
    pub capture_audio: bool,

    /// Video enablement toggle
    pub capture_video: bool,

    /// External encoder executable
    pub encoder_path: PathBuf,

    /// Container extension for screen grabs
    pub grab_extension: String,

    /// Screen grab frame rate
    pub grab_fps: u32,

    /// Screen grab region selection
    pub grab_region: CaptureRegion,

    /// Keep the captured area centered on the mouse
    pub grab_follow_mouse: bool,

    /// Hide the capture region outline
    pub grab_hide_frame: bool,

    /// Exclude the mouse pointer from the grab
    pub grab_hide_mouse: bool,

    /// Free-form extra encoder arguments
    pub grab_parameters: String,

    /// Webcam-class video device
    pub video_device: String,

    /// Audio device/channel string used for preview producers
    pub audio_capture_channel: String,

    /// Channel count for preview audio producers
    pub audio_channels: u8,

    /// Geometry/rate profile for preview producers
    pub preview_profile: CaptureProfile,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            capture_folder: std::env::temp_dir(),
            capture_to_project_folder: true,
            default_device: CaptureDeviceKind::Webcam,
            default_audio_device: String::new(),
            audio_capture_volume: 100,
            capture_audio: true,
            capture_video: true,
            encoder_path: PathBuf::from("ffmpeg"),
            grab_extension: "mp4".to_string(),
            grab_fps: 25,
            grab_region: CaptureRegion::FullScreen,
            grab_follow_mouse: false,
            grab_hide_frame: false,
            grab_hide_mouse: false,
            grab_parameters: String::new(),
            video_device: "/dev/video0".to_string(),
            audio_capture_channel: "default".to_string(),
            audio_channels: 2,
            preview_profile: CaptureProfile::default(),
        }
    }
}

impl CaptureSettings {
    /// Read settings from `path`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        tracing::debug!("Loaded capture settings from {:?}", path);
        Ok(settings)
    }

    /// Write settings to `path`.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::debug!("Saved capture settings to {:?}", path);
        Ok(())
    }

    /// Directory that receives captured files: the project folder when
    /// configured and known, the dedicated capture folder otherwise.
    pub fn capture_folder_for(&self, project_folder: Option<&Path>) -> PathBuf {
        match project_folder {
            Some(folder) if self.capture_to_project_folder => folder.to_path_buf(),
            _ => self.capture_folder.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");

        let mut settings = CaptureSettings::default();
        settings.grab_fps = 60;
        settings.default_device = CaptureDeviceKind::ScreenGrab;
        settings.grab_region = CaptureRegion::Region {
            x: 10,
            y: 20,
            width: 640,
            height: 480,
        };
        settings.save(&path).unwrap();

        let loaded = CaptureSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");
        fs::write(&path, r#"{"grabFps": 50}"#).unwrap();

        let loaded = CaptureSettings::load(&path).unwrap();
        assert_eq!(loaded.grab_fps, 50);
        assert_eq!(loaded.grab_extension, "mp4");
        assert_eq!(loaded.default_device, CaptureDeviceKind::Webcam);
    }

    #[test]
    fn test_capture_folder_selection() {
        let mut settings = CaptureSettings::default();
        settings.capture_folder = PathBuf::from("/captures");

        let project = PathBuf::from("/projects/demo");
        assert_eq!(
            settings.capture_folder_for(Some(&project)),
            PathBuf::from("/projects/demo")
        );
        assert_eq!(settings.capture_folder_for(None), PathBuf::from("/captures"));

        settings.capture_to_project_folder = false;
        assert_eq!(
            settings.capture_folder_for(Some(&project)),
            PathBuf::from("/captures")
        );
    }
}
