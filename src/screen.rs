//! Screen geometry
//!
//! Types describing the screens available for grab capture and the region
//! selection applied to them.

use serde::{Deserialize, Serialize};

/// A rectangle in desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Information about one attached screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    /// Position in the host's screen list
    pub index: usize,

    /// Display name
    pub name: String,

    /// Geometry in desktop coordinates
    pub geometry: ScreenRect,

    /// Whether this is the primary screen
    pub is_primary: bool,
}

/// The set of screens reported by the host at controller construction.
#[derive(Debug, Clone, Default)]
pub struct ScreenLayout {
    screens: Vec<ScreenInfo>,
}

impl ScreenLayout {
    pub fn new(screens: Vec<ScreenInfo>) -> Self {
        Self { screens }
    }

    /// Layout with a single screen of the given geometry.
    pub fn single(geometry: ScreenRect) -> Self {
        Self {
            screens: vec![ScreenInfo {
                index: 0,
                name: "Screen 0".to_string(),
                geometry,
                is_primary: true,
            }],
        }
    }

    pub fn screens(&self) -> &[ScreenInfo] {
        &self.screens
    }

    /// Whether screen selection is meaningful (more than one screen).
    pub fn is_multi(&self) -> bool {
        self.screens.len() > 1
    }

    /// Geometry of the screen at `index`, the primary screen when `index`
    /// is absent or out of range, the first screen when none is marked
    /// primary, and a 1920x1080 rect at the origin when the layout is
    /// empty.
    pub fn geometry(&self, index: Option<usize>) -> ScreenRect {
        if let Some(ix) = index {
            if let Some(screen) = self.screens.get(ix) {
                return screen.geometry;
            }
            tracing::warn!("Screen index {ix} out of range, falling back to primary");
        }
        self.screens
            .iter()
            .find(|s| s.is_primary)
            .or_else(|| self.screens.first())
            .map(|s| s.geometry)
            .unwrap_or_else(|| ScreenRect::new(0, 0, 1920, 1080))
    }
}

/// Portion of the selected screen to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaptureRegion {
    /// Capture the whole selected screen
    FullScreen,

    /// Capture a fixed region in desktop coordinates
    Region { x: i32, y: i32, width: u32, height: u32 },
}

impl Default for CaptureRegion {
    fn default() -> Self {
        Self::FullScreen
    }
}
