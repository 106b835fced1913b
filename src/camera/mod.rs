//! Camera acquisition.
//!
//! This module probes platform capture backends and device indices until a
//! combination both opens and yields a confirming frame, then hands the
//! resulting stream to the pipeline:
//! - `backend`: platform classes, backend preference orders, index ordering
//! - `acquire`: the probing loop and its trait seams
//! - `synthetic`: in-process camera for tests and `--synthetic` runs
//! - `v4l2`: direct V4L2 devices (feature: camera-v4l2)
//! - `opencv`: cross-platform capture via videoio (feature: opencv-runtime)
//!
//! The acquisition layer opens at most one stream per run. A candidate that
//! opens but fails its confirming read is released before probing continues.

mod acquire;
mod backend;
#[cfg(feature = "opencv-runtime")]
pub mod opencv;
pub mod synthetic;
#[cfg(feature = "camera-v4l2")]
pub mod v4l2;

pub use acquire::{acquire, AcquisitionError, CameraOpener, CaptureStream, Provenance};
pub use backend::{candidate_indices, host_platform, preferred_backends, BackendKind, Platform};
pub use synthetic::SyntheticCamera;
#[cfg(feature = "opencv-runtime")]
pub use opencv::OpenCvCamera;
#[cfg(feature = "camera-v4l2")]
pub use v4l2::V4l2Camera;

/// Device indices are probed over `0..=MAX_DEVICE_INDEX`.
pub const MAX_DEVICE_INDEX: u32 = 5;
