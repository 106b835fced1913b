//! faceview - live camera face overlay viewer
//!
//! This viewer:
//! 1. Probes platform capture backends and device indices for a camera
//! 2. Reads frames in a loop and runs the box detector and mesh tracker
//! 3. Composites boxes, mesh edges and a frame-rate readout onto each frame
//! 4. Shows the result in a window until 'q' or Ctrl-C

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use faceview::{
    host_platform, CameraOpener, Canvas, DisplaySurface, FaceviewConfig, Pipeline, PipelineConfig,
    StubBoxDetector, StubMeshTracker, SyntheticCamera, CANCEL_KEY,
};

#[cfg(feature = "mesh-tract")]
const MESH_MODEL_INPUT: usize = 192;

#[derive(Parser, Debug)]
#[command(name = "faceview", about = "Show live camera frames with face overlays")]
struct Args {
    /// Path to a JSON config file
    #[arg(long, env = "FACEVIEW_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Camera device index to try first (0..=5)
    #[arg(long, value_name = "INDEX")]
    camera_index: Option<u32>,

    /// Requested capture width in pixels
    #[arg(long, value_name = "PIXELS")]
    width: Option<u32>,

    /// Requested capture height in pixels
    #[arg(long, value_name = "PIXELS")]
    height: Option<u32>,

    /// Window title
    #[arg(long, value_name = "NAME")]
    window: Option<String>,

    /// Use the in-process synthetic camera instead of real hardware
    #[arg(long)]
    synthetic: bool,

    /// Run without a window; frames are processed but not shown
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = FaceviewConfig::load_with(args.config.as_deref())?;
    if let Some(index) = args.camera_index {
        cfg.camera.preferred_index = Some(index);
    }
    if let Some(width) = args.width {
        cfg.camera.width = width;
    }
    if let Some(height) = args.height {
        cfg.camera.height = height;
    }
    if let Some(window) = args.window.clone() {
        cfg.display.window = window;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })?;

    let mut opener = build_opener(&args, &cfg);
    let box_detector = build_box_detector(&cfg)?;
    let mesh_tracker = build_mesh_tracker(&cfg)?;
    let canvas = build_canvas();
    let display = build_display(&args, &cfg)?;

    let pipeline_cfg = PipelineConfig {
        preferred_index: cfg.camera.preferred_index,
        requested_width: cfg.camera.width,
        requested_height: cfg.camera.height,
        poll_timeout: cfg.display.poll_timeout,
        read_failure_budget: cfg.camera.read_failure_budget,
    };
    let (pipeline, provenance) = Pipeline::start(
        opener.as_mut(),
        host_platform(),
        box_detector,
        mesh_tracker,
        canvas,
        display,
        pipeline_cfg,
    )?;
    let mut pipeline = pipeline.with_cancel_flag(cancel);

    log::info!("camera ready ({})", provenance);
    log::info!("Press '{}' to quit.", CANCEL_KEY);

    pipeline.run()?;
    log::info!(
        "stopped after {} frames",
        pipeline.frames_processed()
    );
    Ok(())
}

fn build_opener(args: &Args, cfg: &FaceviewConfig) -> Box<dyn CameraOpener> {
    if args.synthetic {
        return Box::new(SyntheticCamera::always_available(
            cfg.camera.width,
            cfg.camera.height,
        ));
    }
    #[cfg(feature = "opencv-runtime")]
    {
        return Box::new(faceview::OpenCvCamera);
    }
    #[cfg(all(feature = "camera-v4l2", not(feature = "opencv-runtime")))]
    {
        return Box::new(faceview::V4l2Camera);
    }
    #[cfg(not(any(feature = "opencv-runtime", feature = "camera-v4l2")))]
    {
        log::warn!("no capture backend compiled in; using the synthetic camera");
        Box::new(SyntheticCamera::always_available(
            cfg.camera.width,
            cfg.camera.height,
        ))
    }
}

fn build_box_detector(cfg: &FaceviewConfig) -> Result<Box<dyn faceview::BoxDetector>> {
    #[cfg(feature = "opencv-runtime")]
    if let Some(path) = &cfg.detect.cascade_path {
        return Ok(Box::new(faceview::HaarBoxDetector::new(path)?));
    }
    let _ = cfg;
    Ok(Box::new(StubBoxDetector::centered()))
}

fn build_mesh_tracker(cfg: &FaceviewConfig) -> Result<Box<dyn faceview::MeshTracker>> {
    #[cfg(feature = "mesh-tract")]
    if let Some(path) = &cfg.detect.mesh_model_path {
        return Ok(Box::new(faceview::TractMeshTracker::new(
            path,
            MESH_MODEL_INPUT,
            MESH_MODEL_INPUT,
        )?));
    }
    let _ = cfg;
    Ok(Box::new(StubMeshTracker::new(1)))
}

fn build_canvas() -> Box<dyn Canvas> {
    #[cfg(feature = "opencv-runtime")]
    {
        return Box::new(faceview::MatCanvas::new());
    }
    #[cfg(not(feature = "opencv-runtime"))]
    {
        Box::new(faceview::RecordingCanvas::new())
    }
}

fn build_display(args: &Args, cfg: &FaceviewConfig) -> Result<Box<dyn DisplaySurface>> {
    #[cfg(feature = "opencv-runtime")]
    if !args.headless {
        return Ok(Box::new(faceview::HighguiDisplay::open(
            &cfg.display.window,
        )?));
    }
    #[cfg(not(feature = "opencv-runtime"))]
    if !args.headless {
        log::warn!("no window backend compiled in; running headless");
    }
    let _ = cfg;
    Ok(Box::new(faceview::HeadlessDisplay::new()))
}
