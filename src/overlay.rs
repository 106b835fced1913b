//! Overlay compositing.
//!
//! The compositor draws detection results and the frame-rate readout onto a
//! working copy of the captured frame through the `Canvas` seam. Layering is
//! fixed: face boxes with labels, then per mesh the fine tessellation
//! followed by the contour outline (outline stays legible on top), and the
//! frame-rate text last so nothing ever occludes it.

use anyhow::{anyhow, Result};

use crate::detect::{EdgeGroup, FaceBox, FaceMesh};
use crate::frame::Frame;

/// BGR color and stroke width for one draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawStyle {
    pub color: (u8, u8, u8),
    pub thickness: i32,
}

pub const BOX_STYLE: DrawStyle = DrawStyle {
    color: (0, 255, 0),
    thickness: 2,
};
pub const TESSELLATION_STYLE: DrawStyle = DrawStyle {
    color: (128, 128, 128),
    thickness: 1,
};
pub const CONTOUR_STYLE: DrawStyle = DrawStyle {
    color: (0, 220, 0),
    thickness: 2,
};
pub const FPS_STYLE: DrawStyle = DrawStyle {
    color: (255, 255, 255),
    thickness: 2,
};

/// Label drawn above each face box.
pub const BOX_LABEL: &str = "face";
/// Fixed screen position of the frame-rate readout.
pub const FPS_POSITION: (i32, i32) = (10, 28);

/// Drawing primitives, provided by the rendering backend.
///
/// A canvas takes ownership of the working frame for the duration of one
/// composite pass: `begin`, draw calls, `finish` returns the annotated
/// frame.
pub trait Canvas {
    fn begin(&mut self, frame: Frame) -> Result<()>;

    fn rect(&mut self, x: i32, y: i32, width: i32, height: i32, style: DrawStyle) -> Result<()>;

    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, style: DrawStyle) -> Result<()>;

    fn text(&mut self, x: i32, y: i32, text: &str, style: DrawStyle) -> Result<()>;

    fn finish(&mut self) -> Result<Frame>;
}

/// Draw both result sets and the frame rate onto the working frame.
pub fn composite(
    canvas: &mut dyn Canvas,
    working: Frame,
    boxes: &[FaceBox],
    meshes: &[FaceMesh],
    fps: f64,
) -> Result<Frame> {
    canvas.begin(working)?;

    for b in boxes {
        canvas.rect(b.x, b.y, b.width, b.height, BOX_STYLE)?;
        canvas.text(b.x, b.y - 8, BOX_LABEL, BOX_STYLE)?;
    }

    for mesh in meshes {
        draw_edges(canvas, mesh, EdgeGroup::Tessellation, TESSELLATION_STYLE)?;
        draw_edges(canvas, mesh, EdgeGroup::Contours, CONTOUR_STYLE)?;
    }

    let (fx, fy) = FPS_POSITION;
    canvas.text(fx, fy, &format!("FPS: {:.1}", fps), FPS_STYLE)?;

    canvas.finish()
}

fn draw_edges(
    canvas: &mut dyn Canvas,
    mesh: &FaceMesh,
    group: EdgeGroup,
    style: DrawStyle,
) -> Result<()> {
    for edge in mesh.edges(group) {
        let a = mesh
            .landmarks
            .get(edge[0] as usize)
            .ok_or_else(|| anyhow!("edge index {} out of range", edge[0]))?;
        let b = mesh
            .landmarks
            .get(edge[1] as usize)
            .ok_or_else(|| anyhow!("edge index {} out of range", edge[1]))?;
        canvas.line(
            a.x.round() as i32,
            a.y.round() as i32,
            b.x.round() as i32,
            b.y.round() as i32,
            style,
        )?;
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Recording canvas
// ----------------------------------------------------------------------------

/// One recorded draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Rect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        style: DrawStyle,
    },
    Line {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        style: DrawStyle,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        style: DrawStyle,
    },
}

/// Canvas that records draw calls instead of rasterizing.
///
/// Backs headless runs and lets tests assert on layering order. Ops reset at
/// every `begin`; the ops of the most recent pass stay readable after
/// `finish`.
#[derive(Default)]
pub struct RecordingCanvas {
    frame: Option<Frame>,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }
}

impl Canvas for RecordingCanvas {
    fn begin(&mut self, frame: Frame) -> Result<()> {
        self.frame = Some(frame);
        self.ops.clear();
        Ok(())
    }

    fn rect(&mut self, x: i32, y: i32, width: i32, height: i32, style: DrawStyle) -> Result<()> {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            style,
        });
        Ok(())
    }

    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, style: DrawStyle) -> Result<()> {
        self.ops.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            style,
        });
        Ok(())
    }

    fn text(&mut self, x: i32, y: i32, text: &str, style: DrawStyle) -> Result<()> {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            style,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<Frame> {
        self.frame
            .take()
            .ok_or_else(|| anyhow!("finish without begin"))
    }
}

// ----------------------------------------------------------------------------
// OpenCV canvas
// ----------------------------------------------------------------------------

#[cfg(feature = "opencv-runtime")]
pub use self::opencv_canvas::MatCanvas;

#[cfg(feature = "opencv-runtime")]
mod opencv_canvas {
    use anyhow::{anyhow, Context, Result};
    use opencv::core::{Mat, Point, Rect, Scalar};
    use opencv::imgproc;
    use opencv::prelude::*;

    use crate::frame::{Frame, PixelLayout};

    use super::{Canvas, DrawStyle};

    fn scalar(style: DrawStyle) -> Scalar {
        let (b, g, r) = style.color;
        Scalar::new(b as f64, g as f64, r as f64, 0.0)
    }

    /// Canvas rasterizing onto an OpenCV matrix.
    #[derive(Default)]
    pub struct MatCanvas {
        mat: Option<Mat>,
        width: u32,
        height: u32,
    }

    impl MatCanvas {
        pub fn new() -> Self {
            Self::default()
        }

        fn mat(&mut self) -> Result<&mut Mat> {
            self.mat.as_mut().ok_or_else(|| anyhow!("draw without begin"))
        }
    }

    impl Canvas for MatCanvas {
        fn begin(&mut self, frame: Frame) -> Result<()> {
            if frame.layout != PixelLayout::Bgr {
                return Err(anyhow!("canvas requires a BGR working frame"));
            }
            self.width = frame.width;
            self.height = frame.height;
            let mat = Mat::from_slice(&frame.data)
                .context("wrap working frame")?
                .reshape(3, frame.height as i32)
                .context("reshape working frame")?
                .try_clone()
                .context("clone working frame")?;
            self.mat = Some(mat);
            Ok(())
        }

        fn rect(&mut self, x: i32, y: i32, width: i32, height: i32, style: DrawStyle) -> Result<()> {
            let color = scalar(style);
            let thickness = style.thickness;
            imgproc::rectangle(
                self.mat()?,
                Rect::new(x, y, width, height),
                color,
                thickness,
                imgproc::LINE_8,
                0,
            )
            .context("draw rectangle")
        }

        fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, style: DrawStyle) -> Result<()> {
            let color = scalar(style);
            let thickness = style.thickness;
            imgproc::line(
                self.mat()?,
                Point::new(x1, y1),
                Point::new(x2, y2),
                color,
                thickness,
                imgproc::LINE_8,
                0,
            )
            .context("draw line")
        }

        fn text(&mut self, x: i32, y: i32, text: &str, style: DrawStyle) -> Result<()> {
            let color = scalar(style);
            let thickness = style.thickness;
            imgproc::put_text(
                self.mat()?,
                text,
                Point::new(x, y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.7,
                color,
                thickness,
                imgproc::LINE_8,
                false,
            )
            .context("draw text")
        }

        fn finish(&mut self) -> Result<Frame> {
            let mat = self.mat.take().ok_or_else(|| anyhow!("finish without begin"))?;
            let data = mat.data_bytes().context("read annotated bytes")?.to_vec();
            Frame::new(data, self.width, self.height, PixelLayout::Bgr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Landmark, StubMeshTracker, MeshTracker};
    use crate::frame::PixelLayout;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 64 * 48 * 3], 64, 48, PixelLayout::Bgr).unwrap()
    }

    fn small_mesh() -> FaceMesh {
        FaceMesh {
            landmarks: vec![
                Landmark {
                    x: 1.0,
                    y: 1.0,
                    z: 0.0,
                },
                Landmark {
                    x: 5.0,
                    y: 5.0,
                    z: 0.0,
                },
            ],
            tessellation: vec![[0, 1]],
            contours: vec![[1, 0]],
        }
    }

    #[test]
    fn fps_text_is_always_the_last_op() {
        let mut canvas = RecordingCanvas::new();
        let boxes = vec![FaceBox {
            x: 2,
            y: 10,
            width: 20,
            height: 20,
        }];
        let meshes = vec![small_mesh()];
        composite(&mut canvas, frame(), &boxes, &meshes, 12.34).unwrap();

        let last = canvas.ops().last().unwrap();
        match last {
            DrawOp::Text { text, style, .. } => {
                assert_eq!(text, "FPS: 12.3");
                assert_eq!(*style, FPS_STYLE);
            }
            other => panic!("expected fps text last, got {:?}", other),
        }
    }

    #[test]
    fn contours_draw_after_tessellation_for_each_mesh() {
        let mut canvas = RecordingCanvas::new();
        let meshes = vec![small_mesh(), small_mesh()];
        composite(&mut canvas, frame(), &[], &meshes, 0.0).unwrap();

        let line_styles: Vec<DrawStyle> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Line { style, .. } => Some(*style),
                _ => None,
            })
            .collect();
        assert_eq!(
            line_styles,
            vec![
                TESSELLATION_STYLE,
                CONTOUR_STYLE,
                TESSELLATION_STYLE,
                CONTOUR_STYLE
            ]
        );
    }

    #[test]
    fn box_label_sits_above_the_box_corner() {
        let mut canvas = RecordingCanvas::new();
        let boxes = vec![FaceBox {
            x: 12,
            y: 30,
            width: 20,
            height: 20,
        }];
        composite(&mut canvas, frame(), &boxes, &[], 0.0).unwrap();

        assert_eq!(
            canvas.ops()[0],
            DrawOp::Rect {
                x: 12,
                y: 30,
                width: 20,
                height: 20,
                style: BOX_STYLE
            }
        );
        assert_eq!(
            canvas.ops()[1],
            DrawOp::Text {
                x: 12,
                y: 22,
                text: BOX_LABEL.to_string(),
                style: BOX_STYLE
            }
        );
    }

    #[test]
    fn stub_mesh_composites_without_error() {
        let mut tracker = StubMeshTracker::new(3);
        let rgb = frame().to_rgb().unwrap();
        let meshes = tracker.process(&rgb).unwrap();
        let mut canvas = RecordingCanvas::new();
        let out = composite(&mut canvas, frame(), &[], &meshes, 30.0).unwrap();
        assert_eq!(out.width, 64);
        assert!(!canvas.ops().is_empty());
    }

    #[test]
    fn composite_returns_the_working_frame() {
        let mut canvas = RecordingCanvas::new();
        let out = composite(&mut canvas, frame(), &[], &[], 1.0).unwrap();
        assert_eq!((out.width, out.height), (64, 48));
        assert_eq!(out.layout, PixelLayout::Bgr);
    }
}
