//! The per-frame processing loop.
//!
//! Single-threaded and synchronous: capture, both detectors, composite,
//! display, then a bounded key poll that doubles as the pacing point.
//! The loop owns every resource it touches; the only cross-iteration state
//! is the previous-iteration timestamp used for the frame-rate readout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::camera::{acquire, CameraOpener, CaptureStream, Platform, Provenance};
use crate::detect::{BoxDetector, MeshTracker};
use crate::display::{DisplaySurface, CANCEL_KEY};
use crate::overlay::{composite, Canvas};

/// Loop lifecycle. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// What a single iteration did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepOutcome {
    /// Frame captured, analyzed, composited and shown.
    Processed { fps: f64 },
    /// The frame read failed; nothing else ran this iteration.
    SkippedRead,
    /// The cancellation key (or the process-level flag) was observed.
    CancelRequested,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Device index tried first under every backend, when in range.
    pub preferred_index: Option<u32>,
    /// Requested capture resolution. Best effort, never verified.
    pub requested_width: u32,
    pub requested_height: u32,
    /// Key-poll timeout; the single suspension point per iteration.
    pub poll_timeout: Duration,
    /// Consecutive failed reads tolerated before giving up. `None` retries
    /// forever, trusting the device to recover.
    pub read_failure_budget: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preferred_index: None,
            requested_width: 1280,
            requested_height: 720,
            poll_timeout: Duration::from_millis(1),
            read_failure_budget: None,
        }
    }
}

/// Frames per second from an iteration delta, in seconds. Non-positive
/// deltas report 0.0 rather than dividing by zero.
pub fn frame_rate(delta_secs: f64) -> f64 {
    if delta_secs > 0.0 {
        1.0 / delta_secs
    } else {
        0.0
    }
}

/// The pipeline context: capture stream, both detector adapters, canvas,
/// display, and the previous-iteration timestamp. No state lives outside
/// this struct.
pub struct Pipeline {
    stream: Option<Box<dyn CaptureStream>>,
    box_detector: Box<dyn BoxDetector>,
    mesh_tracker: Box<dyn MeshTracker>,
    canvas: Box<dyn Canvas>,
    display: Option<Box<dyn DisplaySurface>>,
    cancel_flag: Option<Arc<AtomicBool>>,
    config: PipelineConfig,
    state: PipelineState,
    prev: Instant,
    consecutive_read_failures: u32,
    frames_processed: u64,
    last_health_log: Instant,
}

impl Pipeline {
    /// Acquire a camera and assemble the loop context.
    ///
    /// Probing failure is fatal: the pipeline transitions straight to
    /// `Stopped` by never being constructed, and the error carries the
    /// operator-facing remediation hint.
    pub fn start(
        opener: &mut dyn CameraOpener,
        platform: Platform,
        box_detector: Box<dyn BoxDetector>,
        mesh_tracker: Box<dyn MeshTracker>,
        canvas: Box<dyn Canvas>,
        display: Box<dyn DisplaySurface>,
        config: PipelineConfig,
    ) -> Result<(Self, Provenance)> {
        log::debug!("pipeline state: {:?}", PipelineState::Starting);
        let (mut stream, provenance) = acquire(opener, platform, config.preferred_index)
            .context("camera acquisition failed")?;
        stream.request_resolution(config.requested_width, config.requested_height);

        let now = Instant::now();
        let pipeline = Self {
            stream: Some(stream),
            box_detector,
            mesh_tracker,
            canvas,
            display: Some(display),
            cancel_flag: None,
            config,
            state: PipelineState::Running,
            prev: now,
            consecutive_read_failures: 0,
            frames_processed: 0,
            last_health_log: now,
        };
        log::debug!("pipeline state: {:?}", pipeline.state);
        Ok((pipeline, provenance))
    }

    /// Attach a process-level cancellation flag (Ctrl-C), checked at the
    /// same iteration boundary as the cancellation key.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Run iterations until cancellation or a fatal error. Resources are
    /// released exactly once on every exit path.
    pub fn run(&mut self) -> Result<()> {
        while self.state == PipelineState::Running {
            match self.step() {
                Ok(StepOutcome::CancelRequested) => {
                    self.state = PipelineState::Stopping;
                    log::debug!("pipeline state: {:?}", self.state);
                }
                Ok(_) => {}
                Err(err) => {
                    self.state = PipelineState::Stopping;
                    self.shutdown();
                    return Err(err);
                }
            }
        }
        self.shutdown();
        Ok(())
    }

    /// One loop iteration. Public so the loop body is testable in
    /// isolation; `run` is a thin driver around it.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("pipeline already stopped"))?;

        let frame = match stream.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                self.consecutive_read_failures += 1;
                log::debug!(
                    "frame read failed ({} consecutive): {}",
                    self.consecutive_read_failures,
                    err
                );
                if let Some(budget) = self.config.read_failure_budget {
                    if self.consecutive_read_failures >= budget {
                        return Err(err.context(format!(
                            "camera produced no frames for {} consecutive reads",
                            budget
                        )));
                    }
                }
                return Ok(StepOutcome::SkippedRead);
            }
        };
        self.consecutive_read_failures = 0;

        let gray = frame.to_gray()?;
        let rgb = frame.to_rgb()?;

        let boxes = self
            .box_detector
            .detect(&gray)
            .with_context(|| format!("{} detection failed", self.box_detector.name()))?;
        let meshes = self
            .mesh_tracker
            .process(&rgb)
            .with_context(|| format!("{} tracking failed", self.mesh_tracker.name()))?;

        let now = Instant::now();
        let fps = frame_rate(now.duration_since(self.prev).as_secs_f64());
        self.prev = now;

        let shown = composite(
            self.canvas.as_mut(),
            frame.working_copy(),
            &boxes,
            &meshes,
            fps,
        )?;

        let display = self
            .display
            .as_mut()
            .ok_or_else(|| anyhow!("pipeline already stopped"))?;
        display.show(&shown)?;
        self.frames_processed += 1;

        if self.last_health_log.elapsed() >= Duration::from_secs(5) {
            log::info!(
                "pipeline healthy: frames={} fps={:.1} faces={} meshes={}",
                self.frames_processed,
                fps,
                boxes.len(),
                meshes.len()
            );
            self.last_health_log = Instant::now();
        }

        let key = display.poll_key(self.config.poll_timeout)?;
        if key == Some(CANCEL_KEY) || self.flag_raised() {
            return Ok(StepOutcome::CancelRequested);
        }
        Ok(StepOutcome::Processed { fps })
    }

    fn flag_raised(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Release the capture stream and display surface. Idempotent: both are
    /// taken, so a second call finds nothing to release.
    fn shutdown(&mut self) {
        drop(self.stream.take());
        drop(self.display.take());
        self.state = PipelineState::Stopped;
        log::debug!("pipeline state: {:?}", self.state);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.state != PipelineState::Stopped {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::camera::{BackendKind, SyntheticCamera};
    use crate::detect::{StubBoxDetector, StubMeshTracker};
    use crate::display::HeadlessDisplay;
    use crate::frame::{Frame, PixelLayout};
    use crate::overlay::RecordingCanvas;

    #[test]
    fn frame_rate_guards_non_positive_deltas() {
        assert_eq!(frame_rate(0.0), 0.0);
        assert_eq!(frame_rate(-0.5), 0.0);
        assert!((frame_rate(0.05) - 20.0).abs() < 1e-9);
        assert!((frame_rate(2.0) - 0.5).abs() < 1e-9);
    }

    /// Stream that fails reads on scripted iterations and counts drops.
    struct FlakyStream {
        reads: u64,
        fail_on: Vec<u64>,
        drops: Rc<RefCell<u32>>,
    }

    impl CaptureStream for FlakyStream {
        fn read_frame(&mut self) -> Result<Frame> {
            self.reads += 1;
            if self.fail_on.contains(&self.reads) {
                return Err(anyhow!("device hiccup"));
            }
            Frame::new(vec![0u8; 64 * 48 * 3], 64, 48, PixelLayout::Bgr)
        }

        fn request_resolution(&mut self, _width: u32, _height: u32) {}
    }

    impl Drop for FlakyStream {
        fn drop(&mut self) {
            *self.drops.borrow_mut() += 1;
        }
    }

    struct FlakyOpener {
        fail_on: Vec<u64>,
        drops: Rc<RefCell<u32>>,
    }

    impl CameraOpener for FlakyOpener {
        fn open(&mut self, _backend: BackendKind, _index: u32) -> Result<Box<dyn CaptureStream>> {
            Ok(Box::new(FlakyStream {
                // Probing consumes one confirming read before the loop sees
                // the stream.
                reads: 0,
                fail_on: self.fail_on.clone(),
                drops: self.drops.clone(),
            }))
        }
    }

    fn start_pipeline(
        opener: &mut dyn CameraOpener,
        display: HeadlessDisplay,
        config: PipelineConfig,
    ) -> Pipeline {
        let (pipeline, _provenance) = Pipeline::start(
            opener,
            Platform::Linux,
            Box::new(StubBoxDetector::centered()),
            Box::new(StubMeshTracker::new(1)),
            Box::new(RecordingCanvas::new()),
            Box::new(display),
            config,
        )
        .unwrap();
        pipeline
    }

    #[test]
    fn synthetic_stack_runs_to_cancellation() {
        let mut camera = SyntheticCamera::always_available(64, 48);
        let display = HeadlessDisplay::with_keys(vec![None, None, Some(CANCEL_KEY)]);
        let mut pipeline = start_pipeline(&mut camera, display, PipelineConfig::default());

        pipeline.run().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert_eq!(pipeline.frames_processed(), 3);
    }

    #[test]
    fn transient_read_failure_skips_the_iteration() {
        let drops = Rc::new(RefCell::new(0));
        let mut opener = FlakyOpener {
            // Read 1 is the probing confirmation; reads 2..=5 are iterations
            // 1..=4, so iteration 5 is read 6.
            fail_on: vec![6],
            drops: drops.clone(),
        };
        let display = HeadlessDisplay::with_keys(vec![None; 10]);
        let mut pipeline = start_pipeline(&mut opener, display, PipelineConfig::default());

        for _ in 0..4 {
            assert!(matches!(
                pipeline.step().unwrap(),
                StepOutcome::Processed { .. }
            ));
        }
        assert_eq!(pipeline.step().unwrap(), StepOutcome::SkippedRead);
        // Still running; the next iteration proceeds normally.
        assert_eq!(pipeline.state(), PipelineState::Running);
        assert!(matches!(
            pipeline.step().unwrap(),
            StepOutcome::Processed { .. }
        ));
    }

    #[test]
    fn cancellation_releases_the_stream_exactly_once() {
        let drops = Rc::new(RefCell::new(0));
        let mut opener = FlakyOpener {
            fail_on: vec![],
            drops: drops.clone(),
        };
        let display = HeadlessDisplay::with_keys(vec![None, Some(CANCEL_KEY)]);
        let mut pipeline = start_pipeline(&mut opener, display, PipelineConfig::default());

        pipeline.run().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert_eq!(*drops.borrow(), 1);
        drop(pipeline);
        assert_eq!(*drops.borrow(), 1);
    }

    #[test]
    fn read_failure_budget_turns_persistent_failures_fatal() {
        let drops = Rc::new(RefCell::new(0));
        let mut opener = FlakyOpener {
            fail_on: (2..100).collect(),
            drops: drops.clone(),
        };
        let display = HeadlessDisplay::with_keys(vec![None; 100]);
        let config = PipelineConfig {
            read_failure_budget: Some(3),
            ..PipelineConfig::default()
        };
        let mut pipeline = start_pipeline(&mut opener, display, config);

        let err = pipeline.run().unwrap_err();
        assert!(err.to_string().contains("3 consecutive reads"));
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert_eq!(*drops.borrow(), 1);
    }

    #[test]
    fn without_budget_failures_never_terminate() {
        let drops = Rc::new(RefCell::new(0));
        let mut opener = FlakyOpener {
            fail_on: (2..50).collect(),
            drops,
        };
        let display = HeadlessDisplay::with_keys(vec![None; 50]);
        let mut pipeline = start_pipeline(&mut opener, display, PipelineConfig::default());

        for _ in 0..20 {
            assert_eq!(pipeline.step().unwrap(), StepOutcome::SkippedRead);
        }
        assert_eq!(pipeline.state(), PipelineState::Running);
    }

    #[test]
    fn ctrl_c_flag_cancels_at_the_iteration_boundary() {
        let mut camera = SyntheticCamera::always_available(64, 48);
        let display = HeadlessDisplay::with_keys(vec![None; 10]);
        let flag = Arc::new(AtomicBool::new(false));
        let mut pipeline = start_pipeline(&mut camera, display, PipelineConfig::default())
            .with_cancel_flag(flag.clone());

        assert!(matches!(
            pipeline.step().unwrap(),
            StepOutcome::Processed { .. }
        ));
        flag.store(true, Ordering::Relaxed);
        assert_eq!(pipeline.step().unwrap(), StepOutcome::CancelRequested);
    }
}
