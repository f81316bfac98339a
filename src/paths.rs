//! Capture output path allocation
//!
//! Captured files are numbered `capture0000.<ext>`, `capture0001.<ext>`, …
//! within the configured capture directory. Allocation is a linear probe
//! for the first free name.

use std::path::{Path, PathBuf};

/// Return the first non-existing `captureNNNN.<extension>` path in `dir`.
///
/// The index is zero-padded to 4 digits and grows without bound; in
/// practice the probe terminates after a handful of iterations. The
/// returned path does not exist at call time.
pub fn allocate_capture_path(dir: &Path, extension: &str) -> PathBuf {
    let mut path = dir.join(format!("capture0000.{extension}"));
    let mut index = 1usize;
    while path.exists() {
        path = dir.join(format!("capture{index:04}.{extension}"));
        index += 1;
    }
    path
}

/// Check whether `dir` accepts new files.
///
/// Probes by creating (and immediately removing) a scratch file inside the
/// directory, which also covers read-only mounts and paths that are not
/// directories at all.
pub fn dir_is_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".recmon-probe-")
        .tempfile_in(dir)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_first_allocation() {
        let dir = tempdir().unwrap();
        let path = allocate_capture_path(dir.path(), "mp4");
        assert_eq!(path, dir.path().join("capture0000.mp4"));
        assert!(!path.exists());
    }

    #[test]
    fn test_sequential_allocation() {
        let dir = tempdir().unwrap();
        for i in 0..3 {
            fs::write(dir.path().join(format!("capture{i:04}.mp4")), b"").unwrap();
        }
        let path = allocate_capture_path(dir.path(), "mp4");
        assert_eq!(path, dir.path().join("capture0003.mp4"));
        assert!(!path.exists());
    }

    #[test]
    fn test_allocation_fills_gaps() {
        // Linear probe from zero, so a freed early slot is reused
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("capture0001.mp4"), b"").unwrap();
        let path = allocate_capture_path(dir.path(), "mp4");
        assert_eq!(path, dir.path().join("capture0000.mp4"));
    }

    #[test]
    fn test_extension_is_independent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("capture0000.mp4"), b"").unwrap();
        let path = allocate_capture_path(dir.path(), "wav");
        assert_eq!(path, dir.path().join("capture0000.wav"));
    }

    #[test]
    fn test_writable_probe() {
        let dir = tempdir().unwrap();
        assert!(dir_is_writable(dir.path()));

        // A plain file is not a writable directory
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();
        assert!(!dir_is_writable(&file));

        // Neither is a missing path
        assert!(!dir_is_writable(&dir.path().join("missing")));
    }
}
