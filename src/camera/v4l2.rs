#![cfg(feature = "camera-v4l2")]

//! Direct V4L2 capture.
//!
//! Answers probes for the `v4l2` and `any` backends by opening
//! `/dev/video{index}`. The device is asked for packed RGB at open time so
//! the confirming read already produces frames the pipeline can consume.
//! Format negotiation is best effort: the device's answer wins and
//! downstream consumers read dimensions from the frames.

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use crate::frame::{Frame, PixelLayout};

use super::acquire::{CameraOpener, CaptureStream};
use super::backend::BackendKind;

/// Opener for local V4L2 device nodes.
pub struct V4l2Camera;

impl CameraOpener for V4l2Camera {
    fn open(&mut self, backend: BackendKind, index: u32) -> Result<Box<dyn CaptureStream>> {
        if !matches!(backend, BackendKind::V4l2 | BackendKind::Any) {
            anyhow::bail!("backend {} not available via v4l2", backend.name());
        }
        let path = format!("/dev/video{}", index);
        let mut device =
            v4l::Device::with_path(&path).with_context(|| format!("open v4l2 device {}", path))?;
        let format = negotiate_rgb3(&mut device, &path, None)?;
        Ok(Box::new(V4l2Stream {
            path,
            pending: Some(device),
            state: None,
            active_width: format.width,
            active_height: format.height,
        }))
    }
}

/// The format to request: the current format with `RGB3` forced and, when
/// given, the requested dimensions.
fn rgb3_request(mut format: v4l::Format, size: Option<(u32, u32)>) -> v4l::Format {
    if let Some((width, height)) = size {
        format.width = width;
        format.height = height;
    }
    format.fourcc = v4l::FourCC::new(b"RGB3");
    format
}

/// Ask the device for packed RGB, at its current size unless one is given.
/// A failed set falls back to the device's current format; an unusable
/// format then surfaces as a read failure during probing.
fn negotiate_rgb3(
    device: &mut v4l::Device,
    path: &str,
    size: Option<(u32, u32)>,
) -> Result<v4l::Format> {
    use v4l::video::Capture;

    let current = device
        .format()
        .with_context(|| format!("read v4l2 format on {}", path))?;
    match device.set_format(&rgb3_request(current, size)) {
        Ok(negotiated) => Ok(negotiated),
        Err(err) => {
            log::warn!("v4l2 {}: failed to set format: {}", path, err);
            device
                .format()
                .with_context(|| format!("read v4l2 format after set failure on {}", path))
        }
    }
}

#[self_referencing]
struct StreamState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

/// An open V4L2 stream. The mmap stream is created lazily on the first read;
/// a resolution request tears down any active stream, renegotiates the
/// format, and the next read restarts capture.
pub struct V4l2Stream {
    path: String,
    pending: Option<v4l::Device>,
    state: Option<StreamState>,
    active_width: u32,
    active_height: u32,
}

impl V4l2Stream {
    fn start_streaming(&mut self) -> Result<()> {
        use v4l::buffer::Type;

        let Some(device) = self.pending.take() else {
            return Ok(());
        };
        let state = StreamStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);
        Ok(())
    }
}

impl CaptureStream for V4l2Stream {
    fn read_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream as _;

        if self.state.is_none() {
            self.start_streaming()?;
        }
        let state = self
            .state
            .as_mut()
            .with_context(|| format!("v4l2 device {} not streaming", self.path))?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .with_context(|| format!("capture v4l2 frame from {}", self.path))?;

        Frame::new(
            buf.to_vec(),
            self.active_width,
            self.active_height,
            PixelLayout::Rgb,
        )
    }

    fn request_resolution(&mut self, width: u32, height: u32) {
        // The confirming probe read may have started the stream already;
        // into_heads tears it down and hands the device back.
        let mut device = match (self.pending.take(), self.state.take()) {
            (Some(device), _) => device,
            (None, Some(state)) => state.into_heads().device,
            (None, None) => return,
        };
        match negotiate_rgb3(&mut device, &self.path, Some((width, height))) {
            Ok(negotiated) => {
                self.active_width = negotiated.width;
                self.active_height = negotiated.height;
            }
            Err(err) => {
                log::warn!("v4l2 {}: {}", self.path, err);
            }
        }
        self.pending = Some(device);
    }
}
