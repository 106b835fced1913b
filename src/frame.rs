//! Frame container and color-layout conversions.
//!
//! A captured `Frame` is read-only to detectors. The compositor never draws
//! on a captured frame directly; it receives a separate working copy so the
//! detectors and the overlay never alias the same buffer.

use anyhow::{anyhow, Result};

/// Pixel layout of a frame buffer.
///
/// `Bgr` is the native capture layout. Detectors receive converted copies:
/// the box detector a single-channel `Gray` copy, the mesh tracker an `Rgb`
/// copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// 3 bytes per pixel, blue-green-red (native capture order).
    Bgr,
    /// 1 byte per pixel luminance.
    Gray,
    /// 3 bytes per pixel, red-green-blue.
    Rgb,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Bgr | PixelLayout::Rgb => 3,
        }
    }
}

/// A raw pixel buffer with dimensions and a layout tag.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl Frame {
    /// Wrap a pixel buffer, checking that its length matches the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: PixelLayout) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(layout.bytes_per_pixel()))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer is {} bytes, expected {} for {}x{} {:?}",
                data.len(),
                expected,
                width,
                height,
                layout
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            layout,
        })
    }

    /// Mutable working copy for the compositor.
    pub fn working_copy(&self) -> Frame {
        self.clone()
    }

    /// Single-channel luminance copy (BT.601 integer weights).
    pub fn to_gray(&self) -> Result<Frame> {
        let data = match self.layout {
            PixelLayout::Gray => self.data.clone(),
            PixelLayout::Bgr => luma_from_triplets(&self.data, |p| (p[2], p[1], p[0])),
            PixelLayout::Rgb => luma_from_triplets(&self.data, |p| (p[0], p[1], p[2])),
        };
        Frame::new(data, self.width, self.height, PixelLayout::Gray)
    }

    /// Three-channel RGB copy.
    pub fn to_rgb(&self) -> Result<Frame> {
        let data = match self.layout {
            PixelLayout::Rgb => self.data.clone(),
            PixelLayout::Bgr => {
                let mut out = self.data.clone();
                for px in out.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                out
            }
            PixelLayout::Gray => {
                let mut out = Vec::with_capacity(self.data.len() * 3);
                for &v in &self.data {
                    out.extend_from_slice(&[v, v, v]);
                }
                out
            }
        };
        Frame::new(data, self.width, self.height, PixelLayout::Rgb)
    }
}

fn luma_from_triplets(data: &[u8], rgb: impl Fn(&[u8]) -> (u8, u8, u8)) -> Vec<u8> {
    data.chunks_exact(3)
        .map(|px| {
            let (r, g, b) = rgb(px);
            ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
        })
        .collect()
}
