//! Device probing and the capture-stream seam.

use anyhow::Result;

use crate::frame::Frame;

use super::backend::{candidate_indices, preferred_backends, BackendKind, Platform};

/// An open camera stream.
///
/// Implementations release the underlying device on drop. The stream is
/// exclusively owned by the pipeline; at most one is open per run.
pub trait CaptureStream {
    /// Read the next frame. A failure here is transient to the caller; the
    /// pipeline skips the iteration and retries.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Request a capture resolution. Best effort: the device may coerce or
    /// ignore the request, and no verification is performed. Consumers take
    /// dimensions from the frames themselves.
    fn request_resolution(&mut self, width: u32, height: u32);
}

impl std::fmt::Debug for dyn CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CaptureStream")
    }
}

/// Opens capture streams for (backend, index) candidates.
///
/// This is the probing seam: production openers talk to real devices, tests
/// script which candidates open and which yield frames.
pub trait CameraOpener {
    fn open(&mut self, backend: BackendKind, index: u32) -> Result<Box<dyn CaptureStream>>;
}

/// The (backend, index) pair that produced a successful acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provenance {
    pub backend: BackendKind,
    pub index: u32,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx={}, api={}", self.index, self.backend.name())
    }
}

/// No backend/index combination yielded a confirmed readable stream.
///
/// Terminal: there is no retry policy across process restarts. This is an
/// environment problem surfaced to the operator, not a transient condition.
#[derive(Clone, Debug)]
pub struct AcquisitionError {
    pub attempts: usize,
}

impl std::fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no usable camera after {} probe attempts; \
             check device permissions and whether another application holds the camera",
            self.attempts
        )
    }
}

impl std::error::Error for AcquisitionError {}

/// Probe backends (outer) and device indices (inner) until a candidate both
/// opens and yields one confirming frame.
///
/// Backend preference strictly dominates index preference: a backend is
/// exhausted across all indices before the next backend is tried. A stream
/// that opens but fails its confirming read is dropped before probing
/// continues; it is never returned.
pub fn acquire(
    opener: &mut dyn CameraOpener,
    platform: Platform,
    preferred_index: Option<u32>,
) -> Result<(Box<dyn CaptureStream>, Provenance), AcquisitionError> {
    let indices = candidate_indices(preferred_index);
    let mut attempts = 0usize;

    for &backend in preferred_backends(platform) {
        for &index in &indices {
            attempts += 1;
            let mut stream = match opener.open(backend, index) {
                Ok(stream) => stream,
                Err(err) => {
                    log::debug!("probe {}:{} failed to open: {}", backend.name(), index, err);
                    continue;
                }
            };
            match stream.read_frame() {
                Ok(_) => {
                    let provenance = Provenance { backend, index };
                    return Ok((stream, provenance));
                }
                Err(err) => {
                    // Open without data happens on stale device nodes; the
                    // handle is released here by dropping it.
                    log::debug!(
                        "probe {}:{} opened but produced no frame: {}",
                        backend.name(),
                        index,
                        err
                    );
                    drop(stream);
                }
            }
        }
    }

    Err(AcquisitionError { attempts })
}
