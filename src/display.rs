//! Display surfaces.
//!
//! One named window shows the latest composited frame each iteration. The
//! per-iteration key poll doubles as the frame pacing point: it is the only
//! place the loop yields.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;

use crate::frame::Frame;

/// The key that requests termination.
pub const CANCEL_KEY: char = 'q';

/// A window showing composited frames, polled for keyboard input once per
/// iteration.
pub trait DisplaySurface {
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// Wait up to `timeout` for a key press. `None` when no key arrived.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>>;
}

/// Headless display for tests and synthetic runs.
///
/// Shows nothing; `poll_key` pops a scripted key sequence (entries are
/// per-iteration, `None` meaning "no key this round") and paces the loop by
/// sleeping the poll timeout once the script runs dry.
pub struct HeadlessDisplay {
    keys: VecDeque<Option<char>>,
    frames_shown: u64,
    pace: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            keys: VecDeque::new(),
            frames_shown: 0,
            pace: true,
        }
    }

    /// Script the poll results for the coming iterations.
    pub fn with_keys(keys: Vec<Option<char>>) -> Self {
        Self {
            keys: keys.into(),
            frames_shown: 0,
            pace: false,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.frames_shown += 1;
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>> {
        if let Some(key) = self.keys.pop_front() {
            return Ok(key);
        }
        if self.pace {
            std::thread::sleep(timeout);
        }
        Ok(None)
    }
}

#[cfg(feature = "opencv-runtime")]
pub use self::highgui_display::HighguiDisplay;

#[cfg(feature = "opencv-runtime")]
mod highgui_display {
    use std::time::Duration;

    use anyhow::{anyhow, Context, Result};
    use opencv::core::Mat;
    use opencv::highgui;
    use opencv::prelude::*;

    use crate::frame::{Frame, PixelLayout};

    use super::DisplaySurface;

    /// A highgui window. Destroyed on drop.
    pub struct HighguiDisplay {
        window: String,
    }

    impl HighguiDisplay {
        pub fn open(window: &str) -> Result<Self> {
            highgui::named_window(window, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("create window '{}'", window))?;
            Ok(Self {
                window: window.to_string(),
            })
        }
    }

    impl DisplaySurface for HighguiDisplay {
        fn show(&mut self, frame: &Frame) -> Result<()> {
            if frame.layout != PixelLayout::Bgr {
                return Err(anyhow!("display requires a BGR frame"));
            }
            let mat = Mat::from_slice(&frame.data)
                .context("wrap display frame")?
                .reshape(3, frame.height as i32)
                .context("reshape display frame")?
                .try_clone()
                .context("clone display frame")?;
            highgui::imshow(&self.window, &mat).context("show frame")
        }

        fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>> {
            let millis = timeout.as_millis().max(1) as i32;
            let code = highgui::wait_key(millis).context("poll key")?;
            if code < 0 {
                return Ok(None);
            }
            Ok(char::from_u32((code & 0xff) as u32))
        }
    }

    impl Drop for HighguiDisplay {
        fn drop(&mut self) {
            let _ = highgui::destroy_window(&self.window);
        }
    }
}
