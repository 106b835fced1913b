//! Face-analysis capabilities.
//!
//! Two independent capabilities run over every frame:
//! - `BoxDetector`: axis-aligned face regions from a grayscale copy
//! - `MeshTracker`: landmark meshes with two named edge groups from an RGB
//!   copy
//!
//! Both are consumed behind traits so backends can be swapped or scripted in
//! tests without touching the pipeline. Results are per-frame and carry no
//! cross-frame identity.

mod backends;
mod capability;
mod result;
pub mod topology;

pub use backends::{StubBoxDetector, StubMeshTracker};
#[cfg(feature = "opencv-runtime")]
pub use backends::HaarBoxDetector;
#[cfg(feature = "mesh-tract")]
pub use backends::TractMeshTracker;
pub use capability::{
    filter_min_size, mesh_accept_threshold, truncate_max_faces, BoxDetector, BoxDetectorParams,
    MeshTracker, MeshTrackerParams,
};
pub use result::{EdgeGroup, FaceBox, FaceMesh, Landmark};
