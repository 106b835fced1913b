//! Capability traits and their fixed operating parameters.

use anyhow::Result;

use crate::frame::Frame;

use super::result::{FaceBox, FaceMesh};

/// Parameters of the box-detection capability. Not user-configurable.
#[derive(Clone, Copy, Debug)]
pub struct BoxDetectorParams {
    /// Step between consecutive search scales.
    pub scale_factor: f64,
    /// Overlap threshold suppressing low-confidence detections.
    pub min_neighbors: i32,
    /// Smallest detectable box edge, in pixels.
    pub min_size: i32,
}

impl Default for BoxDetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 80,
        }
    }
}

/// Parameters of the mesh-tracking capability. Not user-configurable.
#[derive(Clone, Copy, Debug)]
pub struct MeshTrackerParams {
    /// Stream mode carries tracking state across calls; static-image mode
    /// acquires every face fresh on every frame.
    pub stream_mode: bool,
    /// Upper bound on simultaneously tracked faces.
    pub max_faces: usize,
    /// Auxiliary eye/lip landmark refinement.
    pub refine_landmarks: bool,
    /// Confidence required to acquire a face.
    pub detection_confidence: f32,
    /// Confidence required to keep a face that was accepted on an earlier
    /// frame. Only reachable in stream mode (see [`mesh_accept_threshold`]).
    pub tracking_confidence: f32,
}

impl Default for MeshTrackerParams {
    fn default() -> Self {
        Self {
            stream_mode: true,
            max_faces: 4,
            refine_landmarks: true,
            detection_confidence: 0.5,
            tracking_confidence: 0.5,
        }
    }
}

/// Face-box detection over a grayscale frame.
///
/// Stateless per frame: each call is an independent function over the pixel
/// data. Implementations must not mutate the input frame and must honor
/// `BoxDetectorParams::min_size` (see [`filter_min_size`]).
pub trait BoxDetector {
    fn name(&self) -> &'static str;

    fn detect(&mut self, gray: &Frame) -> Result<Vec<FaceBox>>;
}

/// Landmark-mesh tracking over an RGB frame.
///
/// Implementations may keep private state across calls to stabilize
/// tracking; the caller treats every `process` call as an independent
/// request against one long-lived instance. At most
/// `MeshTrackerParams::max_faces` meshes are returned per call (see
/// [`truncate_max_faces`]).
pub trait MeshTracker {
    fn name(&self) -> &'static str;

    fn process(&mut self, rgb: &Frame) -> Result<Vec<FaceMesh>>;
}

/// Drop boxes smaller than `min_size` in either dimension. Every backend
/// runs its raw output through this before returning.
pub fn filter_min_size(boxes: Vec<FaceBox>, params: &BoxDetectorParams) -> Vec<FaceBox> {
    boxes
        .into_iter()
        .filter(|b| b.width >= params.min_size && b.height >= params.min_size)
        .collect()
}

/// Cap the number of returned meshes at `max_faces`, keeping the leading
/// (highest-priority) entries.
pub fn truncate_max_faces(mut meshes: Vec<FaceMesh>, params: &MeshTrackerParams) -> Vec<FaceMesh> {
    meshes.truncate(params.max_faces);
    meshes
}

/// Confidence a mesh candidate must clear to be returned. In stream mode an
/// actively tracked face only needs the tracking-continuity confidence;
/// fresh acquisitions and static-image mode use the detection confidence.
pub fn mesh_accept_threshold(params: &MeshTrackerParams, tracking_active: bool) -> f32 {
    if params.stream_mode && tracking_active {
        params.tracking_confidence
    } else {
        params.detection_confidence
    }
}
