//! End-to-end pipeline runs over the synthetic stack: scripted cameras and
//! displays, stub detectors, recording canvas.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use faceview::{
    acquire, BackendKind, CameraOpener, CaptureStream, Frame, HeadlessDisplay, Pipeline,
    PipelineConfig, PipelineState, PixelLayout, Platform, RecordingCanvas, StepOutcome,
    StubBoxDetector, StubMeshTracker, SyntheticCamera, CANCEL_KEY,
};

/// Stream that fails reads on scripted read numbers and counts its drops.
struct ScriptedStream {
    reads: u64,
    fail_on: Vec<u64>,
    drops: Arc<AtomicU32>,
}

impl CaptureStream for ScriptedStream {
    fn read_frame(&mut self) -> Result<Frame> {
        self.reads += 1;
        if self.fail_on.contains(&self.reads) {
            return Err(anyhow!("scripted read failure"));
        }
        Frame::new(vec![0u8; 64 * 48 * 3], 64, 48, PixelLayout::Bgr)
    }

    fn request_resolution(&mut self, _width: u32, _height: u32) {}
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedOpener {
    fail_on: Vec<u64>,
    drops: Arc<AtomicU32>,
}

impl CameraOpener for ScriptedOpener {
    fn open(&mut self, _backend: BackendKind, _index: u32) -> Result<Box<dyn CaptureStream>> {
        Ok(Box::new(ScriptedStream {
            reads: 0,
            fail_on: self.fail_on.clone(),
            drops: self.drops.clone(),
        }))
    }
}

fn start(
    opener: &mut dyn CameraOpener,
    display: HeadlessDisplay,
    config: PipelineConfig,
) -> Pipeline {
    let (pipeline, _provenance) = Pipeline::start(
        opener,
        Platform::Linux,
        Box::new(StubBoxDetector::centered()),
        Box::new(StubMeshTracker::new(2)),
        Box::new(RecordingCanvas::new()),
        Box::new(display),
        config,
    )
    .expect("pipeline start");
    pipeline
}

#[test]
fn full_run_stops_on_cancellation_key() {
    let mut camera = SyntheticCamera::always_available(64, 48);
    let display = HeadlessDisplay::with_keys(vec![None, None, None, Some(CANCEL_KEY)]);
    let mut pipeline = start(&mut camera, display, PipelineConfig::default());

    pipeline.run().expect("clean run");
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(pipeline.frames_processed(), 4);
}

#[test]
fn preferred_index_shows_up_in_provenance() {
    let mut camera = SyntheticCamera::always_available(64, 48);
    let (_stream, provenance) = acquire(&mut camera, Platform::Linux, Some(3)).expect("acquire");
    assert_eq!(provenance.index, 3);
    assert_eq!(provenance.backend, BackendKind::V4l2);
    assert_eq!(format!("{}", provenance), "idx=3, api=v4l2");
}

#[test]
fn transient_failure_mid_run_does_not_terminate() {
    let drops = Arc::new(AtomicU32::new(0));
    let mut opener = ScriptedOpener {
        // Read 1 is the probing confirmation; the failure lands on the
        // fifth loop iteration.
        fail_on: vec![6],
        drops,
    };
    let display = HeadlessDisplay::with_keys(vec![None; 8]);
    let mut pipeline = start(&mut opener, display, PipelineConfig::default());

    let mut outcomes = Vec::new();
    for _ in 0..7 {
        outcomes.push(pipeline.step().expect("step"));
    }
    assert_eq!(outcomes[4], StepOutcome::SkippedRead);
    assert_eq!(pipeline.state(), PipelineState::Running);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, StepOutcome::Processed { .. }))
            .count(),
        6
    );
}

#[test]
fn camera_is_released_exactly_once_per_run() {
    let drops = Arc::new(AtomicU32::new(0));
    let mut opener = ScriptedOpener {
        fail_on: vec![],
        drops: drops.clone(),
    };
    let display = HeadlessDisplay::with_keys(vec![Some(CANCEL_KEY)]);
    let mut pipeline = start(&mut opener, display, PipelineConfig::default());

    pipeline.run().expect("clean run");
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    drop(pipeline);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn persistent_failures_are_fatal_only_with_a_budget() {
    let drops = Arc::new(AtomicU32::new(0));
    let mut opener = ScriptedOpener {
        fail_on: (2..200).collect(),
        drops: drops.clone(),
    };
    let display = HeadlessDisplay::with_keys(vec![None; 200]);
    let config = PipelineConfig {
        read_failure_budget: Some(10),
        ..PipelineConfig::default()
    };
    let mut pipeline = start(&mut opener, display, config);

    let err = pipeline.run().expect_err("budget exhausted");
    assert!(err.to_string().contains("10 consecutive reads"));
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn acquisition_failure_names_the_remediation() {
    let mut camera = SyntheticCamera::with_matrix(vec![], 64, 48);
    let err = acquire(&mut camera, Platform::MacOs, None).expect_err("nothing opens");
    assert_eq!(err.attempts, 12);
    assert!(err.to_string().contains("another application"));
}
