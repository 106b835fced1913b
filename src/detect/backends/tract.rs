#![cfg(feature = "mesh-tract")]

//! ONNX landmark-regression mesh tracker.
//!
//! Loads a local model that maps an RGB crop to 68 normalized landmark
//! coordinates (x, y interleaved, optionally followed by a confidence
//! scalar). No network I/O; the model file is read once at startup.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::frame::{Frame, PixelLayout};

use super::super::capability::{
    mesh_accept_threshold, truncate_max_faces, MeshTracker, MeshTrackerParams,
};
use super::super::result::{FaceMesh, Landmark};
use super::super::topology;

pub struct TractMeshTracker {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_width: usize,
    input_height: usize,
    params: MeshTrackerParams,
    /// Whether the previous frame carried an accepted face. Drives the
    /// stream-mode threshold choice.
    tracking_active: bool,
}

impl TractMeshTracker {
    /// Load an ONNX landmark model and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: usize, input_height: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, input_height, input_width)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_width,
            input_height,
            params: MeshTrackerParams::default(),
            tracking_active: false,
        })
    }

    /// Nearest-neighbor resample of the RGB frame into the model's NCHW
    /// input tensor.
    fn build_input(&self, rgb: &Frame) -> Result<Tensor> {
        let (fw, fh) = (rgb.width as usize, rgb.height as usize);
        if fw == 0 || fh == 0 {
            return Err(anyhow!("empty frame"));
        }
        let (iw, ih) = (self.input_width, self.input_height);
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, ih, iw), |(_, channel, y, x)| {
            let sx = x * fw / iw;
            let sy = y * fh / ih;
            let idx = (sy * fw + sx) * 3 + channel;
            rgb.data[idx] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn extract_mesh(&mut self, outputs: TVec<TValue>, frame: &Frame) -> Result<Option<FaceMesh>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let values = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = values.iter().copied().collect();

        let coords = topology::LANDMARK_COUNT * 2;
        if flat.len() < coords {
            return Err(anyhow!(
                "model produced {} values, expected at least {}",
                flat.len(),
                coords
            ));
        }

        // Trailing scalar beyond the coordinates is the face confidence;
        // absent one, the mesh is accepted. A face accepted on the previous
        // frame only needs to clear the tracking-continuity threshold.
        let confidence = flat.get(coords).copied().unwrap_or(1.0);
        let threshold = mesh_accept_threshold(&self.params, self.tracking_active);
        self.tracking_active = confidence >= threshold;
        if !self.tracking_active {
            return Ok(None);
        }

        let landmarks = flat[..coords]
            .chunks_exact(2)
            .map(|pair| Landmark {
                x: pair[0] * frame.width as f32,
                y: pair[1] * frame.height as f32,
                z: 0.0,
            })
            .collect();

        Ok(Some(FaceMesh {
            landmarks,
            tessellation: topology::tessellation_edges(),
            contours: topology::contour_edges(),
        }))
    }
}

impl MeshTracker for TractMeshTracker {
    fn name(&self) -> &'static str {
        "tract-mesh"
    }

    fn process(&mut self, rgb: &Frame) -> Result<Vec<FaceMesh>> {
        if rgb.layout != PixelLayout::Rgb {
            return Err(anyhow!("mesh tracker requires an RGB frame"));
        }
        let input = self.build_input(rgb)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let meshes = match self.extract_mesh(outputs, rgb)? {
            Some(mesh) => vec![mesh],
            None => Vec::new(),
        };
        Ok(truncate_max_faces(meshes, &self.params))
    }
}
