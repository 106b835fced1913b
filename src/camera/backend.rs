//! Capture backend identifiers and probing order.

use super::MAX_DEVICE_INDEX;

/// A platform-specific camera-access implementation selectable at open time.
///
/// Identifiers are capability handles; beyond their per-platform preference
/// order they carry no further semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    DirectShow,
    MediaFoundation,
    AvFoundation,
    V4l2,
    Any,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::DirectShow => "dshow",
            BackendKind::MediaFoundation => "msmf",
            BackendKind::AvFoundation => "avfoundation",
            BackendKind::V4l2 => "v4l2",
            BackendKind::Any => "any",
        }
    }
}

/// Recognized host platform classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

/// Detect the host platform class. Anything that is not Windows or macOS
/// probes like Linux.
pub fn host_platform() -> Platform {
    if cfg!(target_os = "windows") {
        Platform::Windows
    } else if cfg!(target_os = "macos") {
        Platform::MacOs
    } else {
        Platform::Linux
    }
}

/// Backend preference order for a platform class. Probing tries a backend
/// exhaustively across all device indices before falling back to the next.
pub fn preferred_backends(platform: Platform) -> &'static [BackendKind] {
    match platform {
        Platform::Windows => &[
            BackendKind::DirectShow,
            BackendKind::MediaFoundation,
            BackendKind::Any,
        ],
        Platform::MacOs => &[BackendKind::AvFoundation, BackendKind::Any],
        Platform::Linux => &[BackendKind::V4l2, BackendKind::Any],
    }
}

/// Candidate device indices `[0..=5]`. An in-range preferred index moves to
/// the front; the remaining order is preserved. Out-of-range preferences are
/// ignored.
pub fn candidate_indices(preferred: Option<u32>) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..=MAX_DEVICE_INDEX).collect();
    if let Some(idx) = preferred {
        if idx <= MAX_DEVICE_INDEX {
            indices.retain(|&i| i != idx);
            indices.insert(0, idx);
        }
    }
    indices
}
