//! Host integration traits
//!
//! The controller never touches pixels or samples. Native capture, the
//! monitor display and the multimedia producer graph belong to the hosting
//! application and are reached through the narrow traits defined here.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors surfaced by host collaborators
#[derive(Error, Debug)]
pub enum HostError {
    #[error("native capture failed: {0}")]
    Capture(String),

    #[error("invalid producer: {0}")]
    Producer(String),
}

/// State of the host's native media recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCaptureState {
    Inactive,
    Recording,
}

/// The host "core" object: native device capture and audio plumbing.
pub trait MediaCaptureHost: Send + Sync {
    /// Names of the available audio capture devices.
    fn audio_capture_devices(&self) -> Vec<String>;

    /// Start a native capture with the given enablement flags, writing to
    /// `output`.
    fn start_capture(
        &self,
        capture_audio: bool,
        capture_video: bool,
        output: &Path,
        audio_device: &str,
    ) -> Result<(), HostError>;

    /// Stop a native capture previously started with the same flags.
    fn stop_capture(&self, capture_audio: bool, capture_video: bool) -> Result<(), HostError>;

    /// Forward the capture volume (0-100) to the audio pipeline.
    fn set_capture_volume(&self, volume: u8);

    /// Current state of the native recorder.
    fn capture_state(&self) -> MediaCaptureState;
}

/// Geometry and rate used when opening preview producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureProfile {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30.0,
        }
    }
}

/// Fully resolved description of a single capture device to open as a
/// producer.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceInput {
    Video {
        device: String,
        width: u32,
        height: u32,
        frame_rate: f64,
        /// Capture streams are not seekable; always false for previews
        seekable: bool,
    },
    Audio {
        device: String,
        channels: u8,
    },
}

/// A producer handle from the multimedia library.
pub trait Producer: Send {
    /// Whether construction actually yielded a usable producer.
    fn is_valid(&self) -> bool;
}

impl std::fmt::Debug for dyn Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("is_valid", &self.is_valid())
            .finish()
    }
}

/// Constructs producers and multi-track aggregates.
pub trait ProducerFactory: Send + Sync {
    /// Open a single capture device as a producer.
    fn open(&self, input: &DeviceInput) -> Result<Box<dyn Producer>, HostError>;

    /// Combine producers into one aggregate; `tracks[0]` becomes track 0.
    fn multitrack(&self, tracks: Vec<Box<dyn Producer>>) -> Result<Box<dyn Producer>, HostError>;
}

/// The monitor's playback display.
pub trait MonitorDisplay: Send + Sync {
    /// Render the given producer.
    fn show(&self, producer: Box<dyn Producer>);

    /// Show nothing (clear the active clip).
    fn clear(&self);
}

/// cpal-backed enumeration of system audio input devices, for hosts that
/// do not bring their own device list.
pub struct SystemAudioDevices;

impl SystemAudioDevices {
    /// Names of the input devices reported by the default audio host.
    pub fn input_names() -> Vec<String> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        match host.input_devices() {
            Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate audio input devices: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = CaptureProfile::default();
        assert_eq!(profile.width, 1280);
        assert_eq!(profile.height, 720);
        assert_eq!(profile.frame_rate, 30.0);
    }

    #[test]
    fn test_enumeration_does_not_panic() {
        // No audio hardware on CI; only assert this returns
        let _ = SystemAudioDevices::input_names();
    }
}
