//! Preview graph construction
//!
//! Builds the short-lived producer shown on the monitor display while
//! previewing a webcam-class device: a non-seekable video producer from the
//! capture profile, optionally combined with an audio producer into a
//! two-track aggregate (video on track 0, audio on track 1).

use crate::host::{DeviceInput, HostError, Producer, ProducerFactory};
use crate::settings::CaptureSettings;

/// Build the preview producer for the configured webcam-class device.
///
/// Requires video capture to be enabled; an audio-only configuration has
/// nothing to show and is reported as an invalid producer.
pub fn build_preview(
    factory: &dyn ProducerFactory,
    settings: &CaptureSettings,
) -> Result<Box<dyn Producer>, HostError> {
    if !settings.capture_video {
        return Err(HostError::Producer(
            "preview requires video capture".to_string(),
        ));
    }

    let profile = &settings.preview_profile;
    let video = factory.open(&DeviceInput::Video {
        device: settings.video_device.clone(),
        width: profile.width,
        height: profile.height,
        frame_rate: profile.frame_rate,
        seekable: false,
    })?;
    if !video.is_valid() {
        return Err(HostError::Producer(format!(
            "device {} produced no usable stream",
            settings.video_device
        )));
    }

    if !settings.capture_audio {
        return Ok(video);
    }

    let audio = factory.open(&DeviceInput::Audio {
        device: settings.audio_capture_channel.clone(),
        channels: settings.audio_channels,
    })?;
    let combined = factory.multitrack(vec![video, audio])?;
    if !combined.is_valid() {
        return Err(HostError::Producer(
            "combined audio/video producer is invalid".to_string(),
        ));
    }
    Ok(combined)
}
