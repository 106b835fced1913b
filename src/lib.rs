//! faceview
//!
//! A real-time face overlay pipeline: probe for a camera, read frames in a
//! loop, run a box detector and a landmark mesh tracker over each frame,
//! composite the results and a frame-rate readout onto a working copy, and
//! show it in a window until the operator cancels.
//!
//! # Module Structure
//!
//! - `frame`: pixel buffers and colorspace conversions
//! - `camera`: backend/index probing and capture streams
//! - `detect`: detector capabilities, result types, landmark topology
//! - `overlay`: drawing primitives and the compositing order
//! - `display`: window surfaces and the cancellation key
//! - `pipeline`: the per-frame loop and its lifecycle
//!
//! The default build is self-contained: synthetic cameras, stub detectors
//! and the headless display need no native libraries. Real capture and
//! inference backends sit behind the `camera-v4l2`, `opencv-runtime` and
//! `mesh-tract` features.

pub mod camera;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod overlay;
pub mod pipeline;

pub use camera::{
    acquire, candidate_indices, host_platform, preferred_backends, AcquisitionError, BackendKind,
    CameraOpener, CaptureStream, Platform, Provenance, SyntheticCamera, MAX_DEVICE_INDEX,
};
#[cfg(feature = "opencv-runtime")]
pub use camera::OpenCvCamera;
#[cfg(feature = "camera-v4l2")]
pub use camera::V4l2Camera;
pub use config::FaceviewConfig;
pub use detect::{
    BoxDetector, BoxDetectorParams, EdgeGroup, FaceBox, FaceMesh, Landmark, MeshTracker,
    MeshTrackerParams, StubBoxDetector, StubMeshTracker,
};
#[cfg(feature = "opencv-runtime")]
pub use detect::HaarBoxDetector;
#[cfg(feature = "mesh-tract")]
pub use detect::TractMeshTracker;
pub use display::{DisplaySurface, HeadlessDisplay, CANCEL_KEY};
#[cfg(feature = "opencv-runtime")]
pub use display::HighguiDisplay;
pub use frame::{Frame, PixelLayout};
pub use overlay::{composite, Canvas, RecordingCanvas};
#[cfg(feature = "opencv-runtime")]
pub use overlay::MatCanvas;
pub use pipeline::{frame_rate, Pipeline, PipelineConfig, PipelineState, StepOutcome};
