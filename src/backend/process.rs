//! External-process screen grab backend
//!
//! Translates a capture request into the encoder's screen-grab argument
//! grammar, supervises the spawned process, accumulates its stderr and
//! implements the quit-byte stop protocol with terminate/kill escalation.

use super::{BackendError, BackendResult, CaptureBackend, ExitReport, StopOutcome};
use crate::screen::{CaptureRegion, ScreenLayout, ScreenRect};
use crate::state::{CaptureDeviceKind, CaptureRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Grab configuration that is not part of the per-invocation request.
#[derive(Debug, Clone)]
pub struct GrabOptions {
    /// External encoder executable
    pub encoder_path: PathBuf,

    /// Keep the captured area centered on the mouse
    pub follow_mouse: bool,

    /// Hide the capture region outline
    pub hide_frame: bool,

    /// Exclude the mouse pointer from the grab
    pub hide_mouse: bool,

    /// How long to wait for the encoder to honor the quit byte
    pub graceful_wait: Duration,

    /// Grace delay between terminate and forced kill
    pub kill_grace: Duration,
}

impl Default for GrabOptions {
    fn default() -> Self {
        Self {
            encoder_path: PathBuf::from("ffmpeg"),
            follow_mouse: false,
            hide_frame: false,
            hide_mouse: false,
            graceful_wait: Duration::from_secs(5),
            kill_grace: Duration::from_millis(1500),
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
fn simplify_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// X11-class grab arguments:
/// `-f x11grab [-follow_mouse centered] [-show_region 1] -framerate <fps>
/// -s <W>x<H> -i :0.0+<x>,<y>[+nomouse] [<extra>...] <output>`
fn x11_grab_args(request: &CaptureRequest, screen: ScreenRect, options: &GrabOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["-f".into(), "x11grab".into()];
    if options.follow_mouse {
        args.extend(["-follow_mouse".into(), "centered".into()]);
    }
    if !options.hide_frame {
        args.extend(["-show_region".into(), "1".into()]);
    }
    args.extend(["-framerate".into(), request.frame_rate.to_string()]);
    let mut input = String::from(":0.0");
    match request.region {
        CaptureRegion::FullScreen => {
            args.extend(["-s".into(), format!("{}x{}", screen.width, screen.height)]);
            input.push_str(&format!("+{},{}", screen.x, screen.y));
        }
        CaptureRegion::Region { x, y, width, height } => {
            args.extend(["-s".into(), format!("{width}x{height}")]);
            input.push_str(&format!("+{x},{y}"));
        }
    }
    if options.hide_mouse {
        input.push_str("+nomouse");
    }
    args.extend(["-i".into(), input]);
    args.extend(request.extra_args.iter().cloned());
    args.push(request.output_path.to_string_lossy().to_string());
    args
}

/// Desktop grab arguments for hosts without an X display:
/// `-f gdigrab -framerate <fps> -i desktop [<extra>...] <output>`
fn desktop_grab_args(request: &CaptureRequest) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-f".into(),
        "gdigrab".into(),
        "-framerate".into(),
        request.frame_rate.to_string(),
        "-i".into(),
        "desktop".into(),
    ];
    args.extend(request.extra_args.iter().cloned());
    args.push(request.output_path.to_string_lossy().to_string());
    args
}

/// Build the full argument vector for the platform's grab backend.
fn build_grab_args(
    request: &CaptureRequest,
    screen: ScreenRect,
    options: &GrabOptions,
) -> Vec<String> {
    if cfg!(target_os = "windows") {
        desktop_grab_args(request)
    } else {
        x11_grab_args(request, screen, options)
    }
}

/// One running external capture process.
struct GrabSession {
    id: Uuid,
    child: Child,
    output_path: PathBuf,
    started_at: DateTime<Utc>,
    log: Arc<Mutex<String>>,
    reader: Option<JoinHandle<()>>,
}

impl GrabSession {
    fn spawn(encoder: &Path, args: &[String], output_path: PathBuf) -> BackendResult<Self> {
        let mut child = Command::new(encoder)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::Launch {
                path: encoder.to_path_buf(),
                source: e,
            })?;

        let log = Arc::new(Mutex::new(String::new()));
        let reader = child.stderr.take().map(|mut stderr| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match stderr.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let chunk = simplify_whitespace(&String::from_utf8_lossy(&buf[..n]));
                            if !chunk.is_empty() {
                                let mut log = log.lock();
                                log.push_str(&chunk);
                                log.push('\n');
                            }
                        }
                    }
                }
            })
        });

        let id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            "Capture session {id} started at {}: {:?} {:?}",
            started_at.to_rfc3339(),
            encoder,
            args
        );

        Ok(Self {
            id,
            child,
            output_path,
            started_at,
            log,
            reader,
        })
    }

    /// Ask the encoder to finish cleanly. Many encoder CLIs treat a single
    /// `q` on stdin as "stop and flush the output file".
    fn request_quit(&mut self) {
        if let Some(stdin) = self.child.stdin.as_mut() {
            if stdin.write_all(b"q").and_then(|_| stdin.flush()).is_err() {
                tracing::debug!("Quit byte not delivered, process already exited?");
            }
        }
    }

    fn wait_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            let _ = unsafe { libc::kill(self.child.id() as libc::pid_t, libc::SIGTERM) };
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.kill();
        }
    }

    /// Stop the process: quit byte, bounded wait, then terminate and a
    /// forced kill after the grace delay.
    fn shutdown(&mut self, options: &GrabOptions) -> std::io::Result<ExitStatus> {
        self.request_quit();
        if let Some(status) = self.wait_timeout(options.graceful_wait)? {
            return Ok(status);
        }
        tracing::warn!("Capture session {} did not honor quit, terminating", self.id);
        self.terminate();
        if let Some(status) = self.wait_timeout(options.kill_grace)? {
            return Ok(status);
        }
        tracing::warn!("Capture session {} ignored terminate, killing", self.id);
        self.child.kill()?;
        self.child.wait()
    }

    fn into_report(mut self, status: ExitStatus) -> ExitReport {
        // The reader ends at pipe EOF; join so the log is complete
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        ExitReport {
            code: status.code(),
            crashed: status.code().is_none(),
            output_path: self.output_path,
            log: self.log.lock().clone(),
        }
    }
}

/// Screen-grab backend owning at most one external encoder process.
pub struct ScreenGrabBackend {
    options: GrabOptions,
    screens: ScreenLayout,
    session: Option<GrabSession>,
    last_log: String,
}

impl ScreenGrabBackend {
    pub fn new(options: GrabOptions, screens: ScreenLayout) -> Self {
        Self {
            options,
            screens,
            session: None,
            last_log: String::new(),
        }
    }

    pub fn set_options(&mut self, options: GrabOptions) {
        self.options = options;
    }

    pub fn set_screen_layout(&mut self, screens: ScreenLayout) {
        self.screens = screens;
    }

    /// Stderr log of the running session, or of the last finished one.
    pub fn log(&self) -> String {
        match &self.session {
            Some(session) => session.log.lock().clone(),
            None => self.last_log.clone(),
        }
    }

    /// Id of the running session, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Start timestamp of the running session, if any.
    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.started_at)
    }
}

#[async_trait]
impl CaptureBackend for ScreenGrabBackend {
    fn kind(&self) -> CaptureDeviceKind {
        CaptureDeviceKind::ScreenGrab
    }

    fn is_active(&self) -> bool {
        self.session.is_some()
    }

    async fn start(&mut self, request: CaptureRequest) -> BackendResult<()> {
        if let Some(session) = &self.session {
            tracing::debug!("Capture session {} already active, ignoring start", session.id);
            return Ok(());
        }
        self.last_log.clear();

        let geometry = self.screens.geometry(request.screen_index);
        let args = build_grab_args(&request, geometry, &self.options);
        let session = GrabSession::spawn(&self.options.encoder_path, &args, request.output_path)?;
        self.session = Some(session);
        Ok(())
    }

    async fn stop(&mut self) -> BackendResult<StopOutcome> {
        let Some(mut session) = self.session.take() else {
            return Ok(StopOutcome::Idle);
        };
        let status = session.shutdown(&self.options)?;
        let report = session.into_report(status);
        self.last_log = report.log.clone();
        Ok(StopOutcome::Finished(report))
    }

    fn poll_exit(&mut self) -> Option<ExitReport> {
        let status = self.session.as_mut().and_then(|s| match s.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Failed to poll capture process: {e}");
                None
            }
        })?;
        let session = self.session.take()?;
        let report = session.into_report(status);
        self.last_log = report.log.clone();
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn request(region: CaptureRegion, extra: &[&str]) -> CaptureRequest {
        CaptureRequest {
            device_kind: CaptureDeviceKind::ScreenGrab,
            capture_audio: false,
            capture_video: true,
            audio_device: String::new(),
            screen_index: None,
            region,
            frame_rate: 25,
            output_path: PathBuf::from("/tmp/capture0000.mp4"),
            extra_args: extra.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_x11_fullscreen_args() {
        let options = GrabOptions {
            follow_mouse: true,
            hide_mouse: true,
            ..GrabOptions::default()
        };
        let screen = ScreenRect::new(1920, 0, 2560, 1440);
        let args = x11_grab_args(&request(CaptureRegion::FullScreen, &[]), screen, &options);
        assert_eq!(
            args,
            vec![
                "-f",
                "x11grab",
                "-follow_mouse",
                "centered",
                "-show_region",
                "1",
                "-framerate",
                "25",
                "-s",
                "2560x1440",
                "-i",
                ":0.0+1920,0+nomouse",
                "/tmp/capture0000.mp4",
            ]
        );
    }

    #[test]
    fn test_x11_region_args() {
        let options = GrabOptions {
            hide_frame: true,
            ..GrabOptions::default()
        };
        let screen = ScreenRect::new(0, 0, 1920, 1080);
        let region = CaptureRegion::Region {
            x: 100,
            y: 200,
            width: 640,
            height: 480,
        };
        let args = x11_grab_args(&request(region, &[]), screen, &options);
        assert_eq!(
            args,
            vec![
                "-f",
                "x11grab",
                "-framerate",
                "25",
                "-s",
                "640x480",
                "-i",
                ":0.0+100,200",
                "/tmp/capture0000.mp4",
            ]
        );
    }

    #[test]
    fn test_extra_args_precede_output() {
        let options = GrabOptions::default();
        let screen = ScreenRect::new(0, 0, 1920, 1080);
        let args = x11_grab_args(
            &request(CaptureRegion::FullScreen, &["-c:v", "libx264"]),
            screen,
            &options,
        );
        let len = args.len();
        assert_eq!(&args[len - 3..], &["-c:v", "libx264", "/tmp/capture0000.mp4"]);
    }

    #[test]
    fn test_desktop_args() {
        let args = desktop_grab_args(&request(CaptureRegion::FullScreen, &["-y"]));
        assert_eq!(
            args,
            vec![
                "-f",
                "gdigrab",
                "-framerate",
                "25",
                "-i",
                "desktop",
                "-y",
                "/tmp/capture0000.mp4",
            ]
        );
    }

    #[test]
    fn test_simplify_whitespace() {
        assert_eq!(simplify_whitespace("  a \t b\r\nc  "), "a b c");
        assert_eq!(simplify_whitespace("\r\n"), "");
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn backend_for(script: PathBuf) -> ScreenGrabBackend {
            let options = GrabOptions {
                encoder_path: script,
                graceful_wait: Duration::from_millis(300),
                kill_grace: Duration::from_millis(300),
                ..GrabOptions::default()
            };
            ScreenGrabBackend::new(options, ScreenLayout::default())
        }

        fn poll_until_exit(backend: &mut ScreenGrabBackend) -> ExitReport {
            let deadline = Instant::now() + Duration::from_secs(5);
            loop {
                if let Some(report) = backend.poll_exit() {
                    return report;
                }
                assert!(Instant::now() < deadline, "process did not exit in time");
                thread::sleep(Duration::from_millis(20));
            }
        }

        #[tokio::test]
        async fn test_clean_exit_reports_success() {
            let dir = TempDir::new().unwrap();
            let script = write_script(dir.path(), "enc", "exit 0");
            let mut backend = backend_for(script);

            backend.start(request(CaptureRegion::FullScreen, &[])).await.unwrap();
            let report = poll_until_exit(&mut backend);
            assert_eq!(report.code, Some(0));
            assert!(report.is_success());
            assert_eq!(report.output_path, PathBuf::from("/tmp/capture0000.mp4"));
            assert!(!backend.is_active());
        }

        #[tokio::test]
        async fn test_stderr_is_accumulated() {
            let dir = TempDir::new().unwrap();
            let script = write_script(
                dir.path(),
                "enc",
                "echo 'frame   dropped' >&2\necho again >&2\nexit 7",
            );
            let mut backend = backend_for(script);

            backend.start(request(CaptureRegion::FullScreen, &[])).await.unwrap();
            let report = poll_until_exit(&mut backend);
            assert_eq!(report.code, Some(7));
            assert!(!report.is_success());
            assert!(report.log.contains("frame dropped"));
            assert!(report.log.contains("again"));
            assert_eq!(backend.log(), report.log);
        }

        #[tokio::test]
        async fn test_quit_byte_stops_process() {
            let dir = TempDir::new().unwrap();
            // Exits 0 as soon as one byte arrives on stdin
            let script = write_script(dir.path(), "enc", "head -c1 >/dev/null\nexit 0");
            let mut backend = backend_for(script);

            backend.start(request(CaptureRegion::FullScreen, &[])).await.unwrap();
            assert!(backend.is_active());
            match backend.stop().await.unwrap() {
                StopOutcome::Finished(report) => {
                    assert_eq!(report.code, Some(0));
                    assert!(report.is_success());
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert!(!backend.is_active());
        }

        #[tokio::test]
        async fn test_stop_escalates_to_terminate() {
            let dir = TempDir::new().unwrap();
            // Ignores stdin; only a signal gets rid of it
            let script = write_script(dir.path(), "enc", "sleep 30");
            let mut backend = backend_for(script);

            backend.start(request(CaptureRegion::FullScreen, &[])).await.unwrap();
            match backend.stop().await.unwrap() {
                StopOutcome::Finished(report) => {
                    assert!(report.crashed);
                    assert!(!report.is_success());
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_stop_without_session_is_idle() {
            let dir = TempDir::new().unwrap();
            let script = write_script(dir.path(), "enc", "exit 0");
            let mut backend = backend_for(script);
            assert!(matches!(backend.stop().await.unwrap(), StopOutcome::Idle));
        }

        #[tokio::test]
        async fn test_double_start_is_noop() {
            let dir = TempDir::new().unwrap();
            let script = write_script(dir.path(), "enc", "head -c1 >/dev/null\nexit 0");
            let mut backend = backend_for(script);

            backend.start(request(CaptureRegion::FullScreen, &[])).await.unwrap();
            let first = backend.session_id().unwrap();
            backend.start(request(CaptureRegion::FullScreen, &[])).await.unwrap();
            assert_eq!(backend.session_id(), Some(first));
            assert!(backend.session_started_at().unwrap() <= Utc::now());

            let _ = backend.stop().await.unwrap();
        }

        #[tokio::test]
        async fn test_launch_failure() {
            let mut backend = backend_for(PathBuf::from("/nonexistent/encoder"));
            let err = backend
                .start(request(CaptureRegion::FullScreen, &[]))
                .await
                .unwrap_err();
            match err {
                BackendError::Launch { path, .. } => {
                    assert_eq!(path, PathBuf::from("/nonexistent/encoder"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert!(!backend.is_active());
        }
    }
}
