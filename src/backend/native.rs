//! Native device capture backend
//!
//! Webcam-class devices are captured by the host's own media recorder; this
//! backend only snapshots the enablement flags and output path so the
//! matching stop call and the completion event can be produced later.

use super::{BackendResult, CaptureBackend, ExitReport, StopOutcome};
use crate::host::{MediaCaptureHost, MediaCaptureState};
use crate::state::{CaptureDeviceKind, CaptureRequest};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Snapshot of an active native capture.
struct NativeCapture {
    capture_audio: bool,
    capture_video: bool,
    output_path: PathBuf,
}

/// Backend delegating capture to the host primitive.
pub struct NativeDeviceBackend {
    host: Arc<dyn MediaCaptureHost>,
    active: Option<NativeCapture>,
}

impl NativeDeviceBackend {
    pub fn new(host: Arc<dyn MediaCaptureHost>) -> Self {
        Self { host, active: None }
    }
}

#[async_trait]
impl CaptureBackend for NativeDeviceBackend {
    fn kind(&self) -> CaptureDeviceKind {
        CaptureDeviceKind::Webcam
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }

    async fn start(&mut self, request: CaptureRequest) -> BackendResult<()> {
        if self.active.is_some() {
            tracing::debug!("Native capture already active, ignoring start");
            return Ok(());
        }
        self.host.start_capture(
            request.capture_audio,
            request.capture_video,
            &request.output_path,
            &request.audio_device,
        )?;
        tracing::info!("Native capture started to {:?}", request.output_path);
        self.active = Some(NativeCapture {
            capture_audio: request.capture_audio,
            capture_video: request.capture_video,
            output_path: request.output_path,
        });
        Ok(())
    }

    async fn stop(&mut self) -> BackendResult<StopOutcome> {
        let Some(capture) = self.active.take() else {
            return Ok(StopOutcome::Idle);
        };
        // Only stop what the host still reports as running
        if self.host.capture_state() == MediaCaptureState::Recording
            && (capture.capture_audio || capture.capture_video)
        {
            self.host
                .stop_capture(capture.capture_audio, capture.capture_video)?;
            tracing::info!("Native capture stopped, clip at {:?}", capture.output_path);
            return Ok(StopOutcome::NativeStopped(capture.output_path));
        }
        Ok(StopOutcome::Idle)
    }

    fn poll_exit(&mut self) -> Option<ExitReport> {
        // The host primitive has no asynchronous completion of its own
        None
    }
}
