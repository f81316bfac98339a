//! Capture state and request types
//!
//! Defines the controller-level state machine, the device-kind selector and
//! the transient description of one capture invocation.

use crate::screen::CaptureRegion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current state of the capture controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    /// No capture or preview in progress
    Idle,
    /// A capture session (external process or native) is running
    Recording,
    /// A preview graph is on the monitor display
    Previewing,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Which capture backend handles start/stop/preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureDeviceKind {
    /// Webcam-class native device, captured through the host primitive
    Webcam,
    /// Screen grab through the external encoder process
    ScreenGrab,
    /// Recognized but unimplemented, kept for forward compatibility
    Decklink,
}

impl CaptureDeviceKind {
    /// Live preview is only available for webcam-class devices.
    pub fn supports_preview(&self) -> bool {
        matches!(self, Self::Webcam)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Webcam => "Webcam",
            Self::ScreenGrab => "Screen Grab",
            Self::Decklink => "Decklink",
        }
    }
}

/// Description of one capture invocation, resolved from settings and UI
/// state at start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    /// Backend selector
    pub device_kind: CaptureDeviceKind,

    /// Whether audio is captured
    pub capture_audio: bool,

    /// Whether video is captured
    pub capture_video: bool,

    /// Audio capture device name
    pub audio_device: String,

    /// User-selected screen (None = primary)
    pub screen_index: Option<usize>,

    /// Region of the screen to grab
    pub region: CaptureRegion,

    /// Grab frame rate
    pub frame_rate: u32,

    /// Allocated output file
    pub output_path: PathBuf,

    /// Free-form extra encoder arguments, already whitespace-split
    pub extra_args: Vec<String>,
}
