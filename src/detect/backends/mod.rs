#[cfg(feature = "opencv-runtime")]
mod haar;
mod stub;
#[cfg(feature = "mesh-tract")]
mod tract;

#[cfg(feature = "opencv-runtime")]
pub use haar::HaarBoxDetector;
pub use stub::{StubBoxDetector, StubMeshTracker};
#[cfg(feature = "mesh-tract")]
pub use tract::TractMeshTracker;
