#![cfg(feature = "opencv-runtime")]

//! Haar cascade box detector.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::frame::{Frame, PixelLayout};

use super::super::capability::{filter_min_size, BoxDetector, BoxDetectorParams};
use super::super::result::FaceBox;

/// Cascade classifier over grayscale frames with the fixed search
/// parameters (scale 1.1, 5 neighbors, 80x80 minimum).
pub struct HaarBoxDetector {
    cascade: CascadeClassifier,
    params: BoxDetectorParams,
}

impl HaarBoxDetector {
    /// Load the cascade definition. A missing or empty definition is a fatal
    /// startup error; the pipeline never runs without it.
    pub fn new<P: AsRef<Path>>(cascade_path: P) -> Result<Self> {
        let cascade_path = cascade_path.as_ref();
        let path_str = cascade_path
            .to_str()
            .ok_or_else(|| anyhow!("cascade path is not valid UTF-8"))?;
        let cascade = CascadeClassifier::new(path_str)
            .with_context(|| format!("load cascade from {}", cascade_path.display()))?;
        if cascade.empty().unwrap_or(true) {
            return Err(anyhow!(
                "cascade definition at {} is empty",
                cascade_path.display()
            ));
        }
        Ok(Self {
            cascade,
            params: BoxDetectorParams::default(),
        })
    }
}

impl BoxDetector for HaarBoxDetector {
    fn name(&self) -> &'static str {
        "haar"
    }

    fn detect(&mut self, gray: &Frame) -> Result<Vec<FaceBox>> {
        if gray.layout != PixelLayout::Gray {
            return Err(anyhow!("haar detector requires a grayscale frame"));
        }
        let mat = Mat::from_slice(&gray.data)
            .context("wrap frame bytes")?
            .reshape(1, gray.height as i32)
            .context("reshape frame matrix")?
            .try_clone()
            .context("clone frame matrix")?;

        let mut objects: Vector<Rect> = Vector::new();
        let min = Size::new(self.params.min_size, self.params.min_size);
        self.cascade
            .detect_multi_scale(
                &mat,
                &mut objects,
                self.params.scale_factor,
                self.params.min_neighbors,
                0,
                min,
                Size::new(0, 0),
            )
            .context("cascade detection")?;

        let boxes = objects
            .iter()
            .map(|r| FaceBox {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
            })
            .collect();
        Ok(filter_min_size(boxes, &self.params))
    }
}
