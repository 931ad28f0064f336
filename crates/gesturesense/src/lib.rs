//! Hand gesture desktop control.
//!
//! GestureSense reads frames from a webcam, finds hands with the MediaPipe palm detection and hand
//! landmark networks, and turns fixed landmark geometries into desktop input:
//!
//! * the left hand's index finger tip moves the pointer,
//! * right thumb on index finger tip scrolls up, on the index finger PIP joint scrolls down,
//! * right thumb on ring finger MCP clicks, on pinky tip minimizes the focused window.
//!
//! The classification core ([`gesture`]) is independent of the camera, the models and the desktop.
//! Those are reached through [`detector::HandDetector`] and [`executor::ActionExecutor`], which
//! [`app::ControlLoop`] combines.
//!
//! # Coordinates
//!
//! Image and screen coordinates have X pointing right and Y pointing *down*. Angles of rotated
//! rectangles are in radians, clockwise. Landmarks are normalized by the frame size, so that
//! `(0.0, 0.0)` is the top left and `(1.0, 1.0)` the bottom right corner of the frame.
//!
//! # Environment Variables
//!
//! * `GESTURESENSE_WEBCAM_NAME`: Forces the device to use for [`Webcam`]s created without an
//!   explicit device name. If unset, the first device that supports a compatible image format will
//!   be used.
//! * `GESTURESENSE_PALM_MODEL`, `GESTURESENSE_LANDMARK_MODEL`: paths of the ONNX models.
//! * `GESTURESENSE_DRY_RUN`, `GESTURESENSE_FULLSCREEN`, `GESTURESENSE_RESOLUTION`: see
//!   [`config::Config`].
//!
//! [`Webcam`]: video::webcam::Webcam

use log::LevelFilter;

pub mod app;
pub mod config;
pub mod detection;
pub mod detector;
pub mod executor;
pub mod geometry;
pub mod gesture;
pub mod gui;
pub mod hand;
pub mod image;
pub mod landmark;
pub mod nn;
pub mod num;
pub mod rect;
pub mod termination;
pub mod timer;
pub mod tracking;
pub mod video;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and GestureSense log at *debug* level, `wgpu` at *warn* level. `RUST_LOG`
/// takes precedence over both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
