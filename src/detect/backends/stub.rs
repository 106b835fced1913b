//! Stub implementations of both capabilities.
//!
//! Used by tests and synthetic runs. Deterministic: the box detector returns
//! a configured set of boxes, the mesh tracker lays procedural face ovals
//! over the frame. Both honor the capability invariants the same way real
//! backends do.

use anyhow::Result;

use crate::frame::Frame;

use super::super::capability::{
    filter_min_size, truncate_max_faces, BoxDetector, BoxDetectorParams, MeshTracker,
    MeshTrackerParams,
};
use super::super::result::{FaceBox, FaceMesh, Landmark};
use super::super::topology;

/// Box detector returning a preconfigured result set.
pub struct StubBoxDetector {
    params: BoxDetectorParams,
    boxes: Vec<FaceBox>,
}

impl StubBoxDetector {
    /// One centered box covering roughly 40% of the frame.
    pub fn centered() -> Self {
        Self {
            params: BoxDetectorParams::default(),
            boxes: Vec::new(),
        }
    }

    /// A fixed response, still subject to the min-size filter.
    pub fn with_boxes(boxes: Vec<FaceBox>) -> Self {
        Self {
            params: BoxDetectorParams::default(),
            boxes,
        }
    }

    fn centered_box(&self, frame: &Frame) -> Vec<FaceBox> {
        let width = (frame.width as i32 * 2) / 5;
        let height = (frame.height as i32 * 2) / 5;
        vec![FaceBox {
            x: (frame.width as i32 - width) / 2,
            y: (frame.height as i32 - height) / 2,
            width,
            height,
        }]
    }
}

impl BoxDetector for StubBoxDetector {
    fn name(&self) -> &'static str {
        "stub-box"
    }

    fn detect(&mut self, gray: &Frame) -> Result<Vec<FaceBox>> {
        let raw = if self.boxes.is_empty() {
            self.centered_box(gray)
        } else {
            self.boxes.clone()
        };
        Ok(filter_min_size(raw, &self.params))
    }
}

/// Mesh tracker emitting procedural face meshes on the shared topology.
pub struct StubMeshTracker {
    params: MeshTrackerParams,
    /// How many faces the stub "sees" per frame. May exceed the cap; the
    /// returned set never does.
    face_count: usize,
}

impl StubMeshTracker {
    pub fn new(face_count: usize) -> Self {
        Self {
            params: MeshTrackerParams::default(),
            face_count,
        }
    }

    /// Landmarks arranged as an oval face centered in one horizontal slot.
    fn procedural_mesh(&self, frame: &Frame, slot: usize, slots: usize) -> FaceMesh {
        let cx = frame.width as f32 * (slot as f32 + 0.5) / slots as f32;
        let cy = frame.height as f32 / 2.0;
        let rx = frame.width as f32 / (slots as f32 * 3.0);
        let ry = frame.height as f32 / 4.0;

        let landmarks = (0..topology::LANDMARK_COUNT)
            .map(|i| {
                let angle = i as f32 / topology::LANDMARK_COUNT as f32 * std::f32::consts::TAU;
                Landmark {
                    x: cx + rx * angle.cos(),
                    y: cy + ry * angle.sin(),
                    z: 0.0,
                }
            })
            .collect();

        FaceMesh {
            landmarks,
            tessellation: topology::tessellation_edges(),
            contours: topology::contour_edges(),
        }
    }
}

impl MeshTracker for StubMeshTracker {
    fn name(&self) -> &'static str {
        "stub-mesh"
    }

    fn process(&mut self, rgb: &Frame) -> Result<Vec<FaceMesh>> {
        let slots = self.face_count.max(1);
        let meshes = (0..self.face_count)
            .map(|slot| self.procedural_mesh(rgb, slot, slots))
            .collect();
        Ok(truncate_max_faces(meshes, &self.params))
    }
}
