//! Detection result shapes shared by all backends.

/// An axis-aligned face region in frame-pixel coordinates.
///
/// Produced independently per frame; there is no identity or tracking
/// correlation across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A single landmark position. `z` is relative depth where the backend
/// provides it, 0.0 otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Named connectivity selection for mesh drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeGroup {
    /// Fine tessellation across the whole face.
    Tessellation,
    /// Facial contour outline (jaw, brows, nose, eyes, lips).
    Contours,
}

/// A landmark mesh for one face: point positions plus the two edge groups
/// used for the two overlay styles. Edges are index pairs into `landmarks`.
#[derive(Clone, Debug)]
pub struct FaceMesh {
    pub landmarks: Vec<Landmark>,
    pub tessellation: Vec<[u16; 2]>,
    pub contours: Vec<[u16; 2]>,
}

impl FaceMesh {
    pub fn edges(&self, group: EdgeGroup) -> &[[u16; 2]] {
        match group {
            EdgeGroup::Tessellation => &self.tessellation,
            EdgeGroup::Contours => &self.contours,
        }
    }
}
