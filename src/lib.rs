//! recmon - recording-control session library.
//!
//! Implements the capture logic behind a monitor panel's recording
//! controls: device-kind selection, collision-free output file naming,
//! supervision of an external screen-grab encoder process, delegation to a
//! host-native capture primitive for webcam-class devices, and live
//! preview graphs. The GUI toolkit, the multimedia producer library and
//! the host core are consumed through the traits in [`host`].

pub mod backend;
pub mod controller;
pub mod events;
pub mod host;
pub mod logging;
pub mod paths;
pub mod preview;
pub mod screen;
pub mod settings;
pub mod state;

pub use controller::{CaptureController, VolumeIndicator};
pub use events::{CaptureEvent, WarningAction};
pub use screen::{CaptureRegion, ScreenInfo, ScreenLayout, ScreenRect};
pub use settings::CaptureSettings;
pub use state::{CaptureDeviceKind, CaptureRequest, CaptureState};
