#![cfg(feature = "opencv-runtime")]

//! Cross-platform capture via OpenCV's videoio.
//!
//! Every backend identifier maps onto a videoio API preference constant, so
//! one opener serves all three platform classes.

use anyhow::{anyhow, Context, Result};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio;

use crate::frame::{Frame, PixelLayout};

use super::acquire::{CameraOpener, CaptureStream};
use super::backend::BackendKind;

fn api_preference(backend: BackendKind) -> i32 {
    match backend {
        BackendKind::DirectShow => videoio::CAP_DSHOW,
        BackendKind::MediaFoundation => videoio::CAP_MSMF,
        BackendKind::AvFoundation => videoio::CAP_AVFOUNDATION,
        BackendKind::V4l2 => videoio::CAP_V4L2,
        BackendKind::Any => videoio::CAP_ANY,
    }
}

/// Opener backed by `videoio::VideoCapture`.
pub struct OpenCvCamera;

impl CameraOpener for OpenCvCamera {
    fn open(&mut self, backend: BackendKind, index: u32) -> Result<Box<dyn CaptureStream>> {
        let capture = videoio::VideoCapture::new(index as i32, api_preference(backend))
            .with_context(|| format!("construct capture {}:{}", backend.name(), index))?;
        if !capture
            .is_opened()
            .with_context(|| format!("query capture {}:{}", backend.name(), index))?
        {
            return Err(anyhow!(
                "device {}:{} did not open",
                backend.name(),
                index
            ));
        }
        Ok(Box::new(OpenCvStream { capture }))
    }
}

/// An open videoio stream. The device is released when the capture drops.
pub struct OpenCvStream {
    capture: videoio::VideoCapture,
}

impl CaptureStream for OpenCvStream {
    fn read_frame(&mut self) -> Result<Frame> {
        let mut mat = Mat::default();
        let ok = self.capture.read(&mut mat).context("read capture frame")?;
        if !ok || mat.empty() {
            return Err(anyhow!("capture returned no frame"));
        }
        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let data = mat.data_bytes().context("access frame bytes")?.to_vec();
        Frame::new(data, width, height, PixelLayout::Bgr)
    }

    fn request_resolution(&mut self, width: u32, height: u32) {
        // Best effort; the device may coerce or ignore either property.
        if let Err(err) = self
            .capture
            .set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)
        {
            log::warn!("failed to request frame width {}: {}", width, err);
        }
        if let Err(err) = self
            .capture
            .set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)
        {
            log::warn!("failed to request frame height {}: {}", height, err);
        }
    }
}
