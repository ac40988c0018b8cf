//! Capture backends.
//!
//! This module acquires still images for analysis:
//! - Native capture capability (OS camera / photo library) behind the
//!   [`CameraDevice`] trait
//! - Web media capture stays an external collaborator; callers fall back to
//!   it whenever the selector returns nothing
//!
//! The capture layer is responsible for:
//! - Reporting whether a native capability exists on this runtime
//! - A single, non-repeating interactive permission request
//! - Bounding capture resolution and normalizing the encoded payload
//!
//! The capture layer MUST NOT:
//! - Raise acquisition failures to the caller (they become `None`)
//! - Retry internally (retry is a caller-level decision)
//! - Write to the pending-result store

mod native;
mod selector;

pub use native::{CameraDevice, PermissionState, RawShot, ShotRequest, ShotSource};
pub use selector::{CaptureSelector, CAPTURE_MAX_HEIGHT, CAPTURE_MAX_WIDTH};

/// Which backend produced a capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureBackendKind {
    Native,
    Web,
}

/// A normalized still image, ready for the analysis step.
///
/// Created by the selector, consumed once by analysis, not retained after
/// handoff.
#[derive(Clone, Debug)]
pub struct CaptureResult {
    /// Encoded image bytes (format given by `format`).
    pub image_data: Vec<u8>,
    /// Encoding tag, e.g. "jpeg".
    pub format: String,
    pub backend: CaptureBackendKind,
}
