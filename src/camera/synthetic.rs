//! Synthetic camera for tests and `--synthetic` runs.
//!
//! Mirrors a real device closely enough for the pipeline to be exercised
//! headless: a configurable matrix of which (backend, index) pairs open and
//! which of those actually produce frames, plus procedural pixel generation
//! with an occasional scene change.

use anyhow::{anyhow, Result};

use crate::frame::{Frame, PixelLayout};

use super::acquire::{CameraOpener, CaptureStream};
use super::backend::BackendKind;

/// Opener backed by in-process synthetic devices.
pub struct SyntheticCamera {
    /// Candidates that open. The flag controls whether reads succeed.
    available: Vec<(BackendKind, u32, bool)>,
    width: u32,
    height: u32,
}

impl SyntheticCamera {
    /// A camera that answers every probe with a working device.
    pub fn always_available(width: u32, height: u32) -> Self {
        let mut available = Vec::new();
        for backend in [
            BackendKind::DirectShow,
            BackendKind::MediaFoundation,
            BackendKind::AvFoundation,
            BackendKind::V4l2,
            BackendKind::Any,
        ] {
            for index in 0..=super::MAX_DEVICE_INDEX {
                available.push((backend, index, true));
            }
        }
        Self {
            available,
            width,
            height,
        }
    }

    /// A camera with an explicit open/read matrix.
    pub fn with_matrix(available: Vec<(BackendKind, u32, bool)>, width: u32, height: u32) -> Self {
        Self {
            available,
            width,
            height,
        }
    }
}

impl CameraOpener for SyntheticCamera {
    fn open(&mut self, backend: BackendKind, index: u32) -> Result<Box<dyn CaptureStream>> {
        for &(b, i, reads) in &self.available {
            if b == backend && i == index {
                log::debug!("synthetic device opened at {}:{}", backend.name(), index);
                return Ok(Box::new(SyntheticStream {
                    width: self.width,
                    height: self.height,
                    reads_succeed: reads,
                    frame_count: 0,
                    scene_state: 0,
                }));
            }
        }
        Err(anyhow!(
            "no synthetic device at {}:{}",
            backend.name(),
            index
        ))
    }
}

/// In-process frame generator. Most frames are a static pattern; every 50th
/// frame the scene shifts so downstream consumers see variation.
pub struct SyntheticStream {
    width: u32,
    height: u32,
    reads_succeed: bool,
    frame_count: u64,
    scene_state: u8,
}

impl CaptureStream for SyntheticStream {
    fn read_frame(&mut self) -> Result<Frame> {
        if !self.reads_succeed {
            return Err(anyhow!("synthetic device produces no frames"));
        }
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let len = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; len];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        Frame::new(pixels, self.width, self.height, PixelLayout::Bgr)
    }

    fn request_resolution(&mut self, width: u32, height: u32) {
        // Synthetic devices honor the request exactly.
        self.width = width;
        self.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::acquire::acquire;
    use crate::camera::backend::Platform;

    #[test]
    fn synthetic_stream_produces_frames() {
        let mut camera = SyntheticCamera::always_available(64, 48);
        let mut stream = camera.open(BackendKind::Any, 0).unwrap();
        let frame = stream.read_frame().unwrap();
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(frame.layout, PixelLayout::Bgr);
    }

    #[test]
    fn matrix_controls_probing_outcome() {
        let mut camera =
            SyntheticCamera::with_matrix(vec![(BackendKind::V4l2, 3, true)], 32, 32);
        let (_stream, provenance) = acquire(&mut camera, Platform::Linux, None).unwrap();
        assert_eq!(provenance.backend, BackendKind::V4l2);
        assert_eq!(provenance.index, 3);
    }

    #[test]
    fn resolution_request_is_honored() {
        let mut camera = SyntheticCamera::always_available(32, 32);
        let mut stream = camera.open(BackendKind::Any, 0).unwrap();
        stream.request_resolution(128, 72);
        let frame = stream.read_frame().unwrap();
        assert_eq!((frame.width, frame.height), (128, 72));
    }

    #[test]
    fn consecutive_frames_differ() {
        let mut camera = SyntheticCamera::always_available(16, 16);
        let mut stream = camera.open(BackendKind::Any, 0).unwrap();
        let a = stream.read_frame().unwrap();
        let b = stream.read_frame().unwrap();
        assert_ne!(a.data, b.data);
    }
}
