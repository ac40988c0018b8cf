//! Native capture capability.
//!
//! The platform camera plugin is modeled as the [`CameraDevice`] trait. A
//! runtime with no native capability simply has no device, and the selector
//! reports everything as unavailable. The trait surface mirrors the platform
//! call contract: a shot request carrying quality/resolution/orientation
//! options, a tri-state permission grant, and a one-shot interactive request.

use anyhow::Result;

/// Tri-state permission grant, matching platform semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not yet decided; an interactive request may be issued once.
    Prompt,
}

/// Where a shot comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShotSource {
    Camera,
    Gallery,
}

/// Options for one acquisition.
#[derive(Clone, Debug)]
pub struct ShotRequest {
    pub source: ShotSource,
    /// Encoder quality hint, 0..=100.
    pub quality: u8,
    /// Resolution ceiling. `None` leaves the platform default unconstrained.
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Ask the platform to apply the sensor orientation before returning.
    pub correct_orientation: bool,
}

/// What the platform hands back: encoded bytes plus a format tag.
#[derive(Clone, Debug)]
pub struct RawShot {
    pub bytes: Vec<u8>,
    pub format: String,
}

/// Platform camera collaborator.
///
/// Implementations bridge to the actual OS plugin. Errors from `acquire`
/// cover permission denial mid-flow, hardware failure, and user cancellation;
/// the selector converts all of them to `None`.
pub trait CameraDevice: Send {
    /// Current grant state, without prompting.
    fn permission_state(&self) -> PermissionState;

    /// Issue one interactive permission request and report the outcome.
    ///
    /// Called only from the `Prompt` state. Implementations must not loop.
    fn request_permission(&mut self) -> PermissionState;

    /// Acquire one still image.
    fn acquire(&mut self, request: &ShotRequest) -> Result<RawShot>;
}
