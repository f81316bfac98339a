//! Capture backends
//!
//! Two mutually exclusive backends implement a uniform capability contract:
//! screen grabs run an external encoder process, webcam-class devices
//! delegate to the host's native capture primitive. The controller selects
//! one by device kind and owns at most one active session at a time.

pub mod native;
pub mod process;

use crate::host::HostError;
use crate::state::{CaptureDeviceKind, CaptureRequest};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use native::NativeDeviceBackend;
pub use process::{GrabOptions, ScreenGrabBackend};

/// Backend errors
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start the capture application: {}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("host error: {0}")]
    Host(#[from] HostError),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Snapshot of a finished external capture process.
#[derive(Debug, Clone)]
pub struct ExitReport {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,

    /// Abnormal termination (signal/crash)
    pub crashed: bool,

    /// The output path allocated at session start
    pub output_path: PathBuf,

    /// Accumulated stderr log
    pub log: String,
}

impl ExitReport {
    /// Exit code 0 is success; 255 is the encoder's expected
    /// termination-by-request code and counts as success too.
    pub fn is_success(&self) -> bool {
        !self.crashed && matches!(self.code, Some(0) | Some(255))
    }
}

/// Result of a stop request.
#[derive(Debug)]
pub enum StopOutcome {
    /// Nothing was active
    Idle,

    /// The external process ended; completion handling applies
    Finished(ExitReport),

    /// Native capture ended cleanly, clip written to the given path
    NativeStopped(PathBuf),
}

/// Uniform start/stop contract over the two capture backends.
#[async_trait]
pub trait CaptureBackend: Send {
    fn kind(&self) -> CaptureDeviceKind;

    /// Whether a session is currently owned by this backend.
    fn is_active(&self) -> bool;

    /// Begin a capture. Starting while active is a silent no-op.
    async fn start(&mut self, request: CaptureRequest) -> BackendResult<()>;

    /// End the active capture, if any.
    async fn stop(&mut self) -> BackendResult<StopOutcome>;

    /// Non-blocking check for an external process that ended on its own.
    fn poll_exit(&mut self) -> Option<ExitReport>;
}
