//! Events raised to the hosting application
//!
//! The controller never presents UI itself; warnings, captured-file
//! availability and toolbar visibility are broadcast to whoever subscribes.

use std::path::PathBuf;
use tokio::sync::broadcast;

/// Auto-dismiss delay for transient warnings.
const WARNING_TIMEOUT_MS: u64 = 5_000;

/// Action the host may attach to a warning notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningAction {
    /// Reveal the accumulated session log (see `CaptureController::session_log`)
    ShowLog,
}

/// Events emitted by the capture controller
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// User-visible warning. `auto_dismiss_ms` of `None` means sticky.
    Warning {
        message: String,
        auto_dismiss_ms: Option<u64>,
        actions: Vec<WarningAction>,
    },
    /// A captured file is ready to be added to the project
    ClipReady(PathBuf),
    /// The record-control surface was shown or hidden
    ToolbarVisible(bool),
}

/// Broadcast hub for controller events.
#[derive(Debug)]
pub struct EventHub {
    tx: broadcast::Sender<CaptureEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: CaptureEvent) {
        let _ = self.tx.send(event);
    }

    /// Transient warning with the default auto-dismiss delay.
    pub(crate) fn warning(&self, message: impl Into<String>) {
        self.emit(CaptureEvent::Warning {
            message: message.into(),
            auto_dismiss_ms: Some(WARNING_TIMEOUT_MS),
            actions: Vec::new(),
        });
    }

    /// Sticky warning with attached actions.
    pub(crate) fn sticky_warning(&self, message: impl Into<String>, actions: Vec<WarningAction>) {
        self.emit(CaptureEvent::Warning {
            message: message.into(),
            auto_dismiss_ms: None,
            actions,
        });
    }

    pub(crate) fn clip_ready(&self, path: PathBuf) {
        self.emit(CaptureEvent::ClipReady(path));
    }

    pub(crate) fn toolbar_visible(&self, visible: bool) {
        self.emit(CaptureEvent::ToolbarVisible(visible));
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
