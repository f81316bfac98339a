//! Capture controller
//!
//! Mediates between the recording controls and the two capture backends:
//! the external-process screen grab and the host-native device capture.
//! Holds the toggle state the controls render, owns at most one active
//! session or preview, and reports results through the event hub.

use crate::backend::{
    BackendError, CaptureBackend, ExitReport, GrabOptions, NativeDeviceBackend, ScreenGrabBackend,
    StopOutcome,
};
use crate::events::{CaptureEvent, EventHub, WarningAction};
use crate::host::{MediaCaptureHost, MonitorDisplay, ProducerFactory};
use crate::paths;
use crate::preview;
use crate::screen::ScreenLayout;
use crate::settings::CaptureSettings;
use crate::state::{CaptureDeviceKind, CaptureRequest, CaptureState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Mute/unmute hint for the capture volume control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeIndicator {
    Muted,
    Active,
}

/// The recording-control session controller.
pub struct CaptureController {
    settings: CaptureSettings,
    settings_path: Option<PathBuf>,

    host: Arc<dyn MediaCaptureHost>,
    display: Arc<dyn MonitorDisplay>,
    factory: Arc<dyn ProducerFactory>,
    events: EventHub,

    screen_backend: ScreenGrabBackend,
    native_backend: NativeDeviceBackend,

    device_kind: CaptureDeviceKind,
    screen_index: Option<usize>,
    project_folder: Option<PathBuf>,

    record_armed: bool,
    previewing: bool,
    controls_enabled: bool,
    toolbar_visible: bool,
}

impl CaptureController {
    pub fn new(
        settings: CaptureSettings,
        host: Arc<dyn MediaCaptureHost>,
        display: Arc<dyn MonitorDisplay>,
        factory: Arc<dyn ProducerFactory>,
        screens: ScreenLayout,
    ) -> Self {
        let device_kind = settings.default_device;
        let grab_options = Self::grab_options_from(&settings);
        Self {
            screen_backend: ScreenGrabBackend::new(grab_options, screens),
            native_backend: NativeDeviceBackend::new(Arc::clone(&host)),
            host,
            display,
            factory,
            events: EventHub::new(),
            settings,
            settings_path: None,
            device_kind,
            screen_index: None,
            project_folder: None,
            record_armed: false,
            previewing: false,
            controls_enabled: true,
            toolbar_visible: false,
        }
    }

    /// Persist settings changes to `path` (best-effort).
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    fn grab_options_from(settings: &CaptureSettings) -> GrabOptions {
        GrabOptions {
            encoder_path: settings.encoder_path.clone(),
            follow_mouse: settings.grab_follow_mouse,
            hide_frame: settings.grab_hide_frame,
            hide_mouse: settings.grab_hide_mouse,
            ..GrabOptions::default()
        }
    }

    /// Resolve settings and UI state into one invocation description.
    fn request(&self, device_kind: CaptureDeviceKind, output_path: PathBuf) -> CaptureRequest {
        CaptureRequest {
            device_kind,
            capture_audio: self.settings.capture_audio,
            capture_video: self.settings.capture_video,
            audio_device: self.settings.default_audio_device.clone(),
            screen_index: self.screen_index,
            region: self.settings.grab_region,
            frame_rate: self.settings.grab_fps,
            output_path,
            extra_args: self
                .settings
                .grab_parameters
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> CaptureState {
        if self.screen_backend.is_active() || self.native_backend.is_active() {
            CaptureState::Recording
        } else if self.previewing {
            CaptureState::Previewing
        } else {
            CaptureState::Idle
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn device_kind(&self) -> CaptureDeviceKind {
        self.device_kind
    }

    /// Whether the record toggle is checked.
    pub fn is_record_armed(&self) -> bool {
        self.record_armed
    }

    /// Whether the record toggle and device selector are enabled.
    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    /// Whether the preview toggle is available for the selected device.
    pub fn preview_available(&self) -> bool {
        self.device_kind.supports_preview()
    }

    /// Whether the screen selector applies: region grabs pin their own
    /// coordinates, only full-screen grabs follow the selected screen.
    pub fn screen_selection_enabled(&self) -> bool {
        matches!(self.settings.grab_region, crate::screen::CaptureRegion::FullScreen)
    }

    pub fn toolbar_visible(&self) -> bool {
        self.toolbar_visible
    }

    /// Stderr log of the running or last finished capture process.
    pub fn session_log(&self) -> String {
        self.screen_backend.log()
    }

    /// Audio capture devices reported by the host.
    pub fn audio_devices(&self) -> Vec<String> {
        self.host.audio_capture_devices()
    }

    pub fn set_screen_index(&mut self, index: Option<usize>) {
        self.screen_index = index;
    }

    pub fn set_project_folder(&mut self, folder: Option<PathBuf>) {
        self.project_folder = folder;
    }

    pub fn set_screen_layout(&mut self, screens: ScreenLayout) {
        self.screen_backend.set_screen_layout(screens);
    }

    /// The record toggle changed.
    pub async fn set_recording(&mut self, record: bool) {
        match self.device_kind {
            CaptureDeviceKind::Webcam => {
                if record {
                    self.start_native().await;
                } else {
                    self.stop_capture().await;
                }
            }
            CaptureDeviceKind::ScreenGrab => {
                if record {
                    self.start_grab().await;
                } else {
                    self.stop_grab().await;
                }
            }
            CaptureDeviceKind::Decklink => {
                tracing::debug!("Recording not implemented for {}", self.device_kind.label());
                self.record_armed = false;
            }
        }
    }

    /// Stop whatever capture is active, if any.
    pub async fn stop_capture(&mut self) {
        if self.screen_backend.is_active() {
            self.stop_grab().await;
            return;
        }
        match self.native_backend.stop().await {
            Ok(StopOutcome::NativeStopped(path)) => {
                self.record_armed = false;
                self.display.clear();
                self.events.clip_ready(path);
            }
            Ok(_) => {
                self.record_armed = false;
            }
            Err(e) => {
                tracing::warn!("Failed to stop native capture: {e}");
                self.events.warning(format!("Failed to stop capture: {e}"));
                self.record_armed = false;
            }
        }
    }

    /// Drain asynchronous process-exit notifications. Call from the host's
    /// event loop while a screen grab is running.
    pub fn pump(&mut self) {
        if let Some(report) = self.screen_backend.poll_exit() {
            self.finish_grab(report);
        }
    }

    async fn start_native(&mut self) {
        if self.native_backend.is_active() {
            tracing::debug!("Native capture already running, ignoring start");
            return;
        }
        let folder = self.settings.capture_folder_for(self.project_folder.as_deref());
        let extension = if self.settings.capture_video { "mpeg" } else { "wav" };
        let output_path = paths::allocate_capture_path(&folder, extension);
        let request = self.request(CaptureDeviceKind::Webcam, output_path);

        self.record_armed = true;
        if let Err(e) = self.native_backend.start(request).await {
            tracing::warn!("Native capture failed to start: {e}");
            self.events.warning(format!("Failed to start capture: {e}"));
            self.record_armed = false;
        }
    }

    async fn start_grab(&mut self) {
        if self.screen_backend.is_active() {
            tracing::debug!("Capture process already running, ignoring start");
            return;
        }
        let folder = self.settings.capture_folder_for(self.project_folder.as_deref());
        if !paths::dir_is_writable(&folder) {
            self.events.warning(format!(
                "The directory {} is not writable.\nPlease make sure you have the required permissions.",
                folder.display()
            ));
            self.record_armed = false;
            return;
        }
        let output_path = paths::allocate_capture_path(&folder, &self.settings.grab_extension);
        let request = self.request(CaptureDeviceKind::ScreenGrab, output_path);

        self.screen_backend.set_options(Self::grab_options_from(&self.settings));
        self.record_armed = true;
        match self.screen_backend.start(request).await {
            Ok(()) => {
                self.controls_enabled = false;
            }
            Err(BackendError::Launch { path, .. }) => {
                self.events.warning(format!(
                    "Failed to start the capture application:\n{}",
                    path.display()
                ));
                self.record_armed = false;
            }
            Err(e) => {
                tracing::warn!("Capture process failed to start: {e}");
                self.events.warning(format!("Failed to start capture: {e}"));
                self.record_armed = false;
            }
        }
    }

    async fn stop_grab(&mut self) {
        if !self.screen_backend.is_active() {
            return;
        }
        match self.screen_backend.stop().await {
            Ok(StopOutcome::Finished(report)) => self.finish_grab(report),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to stop capture process: {e}");
                self.events.warning(format!("Failed to stop capture: {e}"));
                self.controls_enabled = true;
                self.record_armed = false;
            }
        }
    }

    /// Completion handling for the external capture process.
    fn finish_grab(&mut self, report: ExitReport) {
        self.controls_enabled = true;
        self.record_armed = false;
        if report.is_success() {
            tracing::info!("Capture finished, clip at {:?}", report.output_path);
            self.events.clip_ready(report.output_path);
        } else {
            tracing::warn!(
                "Capture process failed (code {:?}, crashed: {})",
                report.code,
                report.crashed
            );
            let mut message = String::from("Capture crashed, please check your parameters");
            if !report.log.is_empty() {
                message.push('\n');
                message.push_str(report.log.trim_end());
            }
            self.events
                .sticky_warning(message, vec![WarningAction::ShowLog]);
        }
    }

    /// The preview toggle changed. Only webcam-class devices can preview.
    pub async fn set_preview(&mut self, preview: bool) {
        if !self.device_kind.supports_preview() {
            return;
        }
        if preview {
            match preview::build_preview(self.factory.as_ref(), &self.settings) {
                Ok(producer) => {
                    self.display.show(producer);
                    self.previewing = true;
                }
                Err(e) => {
                    tracing::warn!("Preview construction failed: {e}");
                    self.events
                        .warning("Capture crashed, please check your parameters");
                }
            }
        } else if self.previewing {
            self.display.clear();
            self.previewing = false;
        }
    }

    /// The audio-device selection changed; persists the new default.
    pub fn set_audio_device(&mut self, device: impl Into<String>) {
        self.settings.default_audio_device = device.into();
        self.persist();
    }

    /// The capture-volume control changed; persists, forwards to the host
    /// audio pipeline, and returns the indicator to render.
    pub fn set_capture_volume(&mut self, volume: u8) -> VolumeIndicator {
        let volume = volume.min(100);
        self.settings.audio_capture_volume = volume;
        self.host.set_capture_volume(volume);
        self.persist();
        if volume == 0 {
            VolumeIndicator::Muted
        } else {
            VolumeIndicator::Active
        }
    }

    pub fn set_capture_audio(&mut self, enabled: bool) {
        self.settings.capture_audio = enabled;
        self.persist();
    }

    pub fn set_capture_video(&mut self, enabled: bool) {
        self.settings.capture_video = enabled;
        self.persist();
    }

    /// The device-kind selection changed; persists the new default.
    ///
    /// An active session or preview of the previous kind is torn down
    /// before the switch takes effect.
    pub async fn set_device_kind(&mut self, kind: CaptureDeviceKind) {
        if kind == self.device_kind {
            return;
        }
        if self.state() == CaptureState::Recording {
            self.stop_capture().await;
        }
        if self.previewing {
            self.set_preview(false).await;
        }
        self.device_kind = kind;
        self.settings.default_device = kind;
        self.persist();
        tracing::info!("Capture device switched to {}", kind.label());
    }

    /// Show the record-control surface.
    pub fn show_controls(&mut self) {
        self.toolbar_visible = true;
        self.events.toolbar_visible(true);
    }

    /// Hide the record-control surface. A running screen grab survives
    /// this; a native capture is stopped.
    pub async fn hide_controls(&mut self) {
        if !self.screen_backend.is_active() {
            self.stop_capture().await;
        }
        self.toolbar_visible = false;
        self.events.toolbar_visible(false);
    }

    fn persist(&self) {
        if let Some(path) = &self.settings_path {
            if let Err(e) = self.settings.save(path) {
                tracing::warn!("Failed to persist capture settings: {e}");
            }
        }
    }
}
