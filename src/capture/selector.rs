//! Capture backend selector.
//!
//! Chooses the native capture capability when one exists and exposes a
//! uniform [`CaptureResult`] to the rest of the pipeline. On runtimes without
//! a native device every call degrades to `None`/`false` immediately, and the
//! caller falls back to the web backend.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;

use super::native::{CameraDevice, PermissionState, ShotRequest, ShotSource};
use super::{CaptureBackendKind, CaptureResult};

/// Resolution ceiling for the capture-from-camera path.
pub const CAPTURE_MAX_WIDTH: u32 = 1280;
pub const CAPTURE_MAX_HEIGHT: u32 = 960;

const CAPTURE_QUALITY: u8 = 90;

/// Selects between the native capture capability and the (external) web
/// backend.
pub struct CaptureSelector {
    device: Option<Box<dyn CameraDevice>>,
    max_width: u32,
    max_height: u32,
    quality: u8,
}

impl CaptureSelector {
    /// Selector for a runtime with a native capture capability.
    pub fn with_device(device: Box<dyn CameraDevice>) -> Self {
        Self {
            device: Some(device),
            max_width: CAPTURE_MAX_WIDTH,
            max_height: CAPTURE_MAX_HEIGHT,
            quality: CAPTURE_QUALITY,
        }
    }

    /// Selector for a runtime without one (web-only hosts).
    pub fn unavailable() -> Self {
        Self {
            device: None,
            max_width: CAPTURE_MAX_WIDTH,
            max_height: CAPTURE_MAX_HEIGHT,
            quality: CAPTURE_QUALITY,
        }
    }

    /// Override the camera resolution ceiling and encoder quality.
    pub fn with_limits(mut self, max_width: u32, max_height: u32, quality: u8) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self.quality = quality;
        self
    }

    /// Whether a native capture capability exists in this runtime.
    pub fn is_available(&self) -> bool {
        self.device.is_some()
    }

    /// Capture a photo with the device camera, bounded to the configured
    /// ceiling (default [`CAPTURE_MAX_WIDTH`]x[`CAPTURE_MAX_HEIGHT`]).
    ///
    /// Returns `None` when no native capability exists or on any acquisition
    /// failure (permission denial, hardware error, user cancellation). The
    /// cause is logged; nothing is raised.
    pub fn take_photo(&mut self) -> Option<CaptureResult> {
        let request = ShotRequest {
            source: ShotSource::Camera,
            quality: self.quality,
            max_width: Some(self.max_width),
            max_height: Some(self.max_height),
            correct_orientation: true,
        };
        self.capture_with(&request, true)
    }

    /// Pick an image from the photo library. Resolution is unconstrained.
    pub fn pick_from_gallery(&mut self) -> Option<CaptureResult> {
        let request = ShotRequest {
            source: ShotSource::Gallery,
            quality: self.quality,
            max_width: None,
            max_height: None,
            correct_orientation: true,
        };
        self.capture_with(&request, false)
    }

    /// Inspect (and at most once request) the camera permission.
    ///
    /// `false` outright on runtimes without a native capability. An already
    /// denied grant is returned as-is, never re-prompted.
    pub fn check_permissions(&mut self) -> bool {
        let Some(device) = self.device.as_mut() else {
            return false;
        };
        match device.permission_state() {
            PermissionState::Granted => true,
            PermissionState::Denied => false,
            PermissionState::Prompt => device.request_permission() == PermissionState::Granted,
        }
    }

    fn capture_with(&mut self, request: &ShotRequest, bounded: bool) -> Option<CaptureResult> {
        let device = self.device.as_mut()?;
        let shot = match device.acquire(request) {
            Ok(shot) => shot,
            Err(e) => {
                log::warn!("capture failed ({:?}): {:#}", request.source, e);
                return None;
            }
        };
        match normalize(&shot.bytes, request, bounded) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!(
                    "capture normalization failed ({:?}, reported format {}): {:#}",
                    request.source,
                    shot.format,
                    e
                );
                None
            }
        }
    }
}

/// Decode, enforce the resolution ceiling, and re-encode as JPEG.
///
/// Platforms do not reliably honor the requested ceiling, so the camera path
/// is clamped again here. Gallery picks pass through at their native size.
fn normalize(bytes: &[u8], request: &ShotRequest, bounded: bool) -> Result<CaptureResult> {
    let mut img = image::load_from_memory(bytes).context("decode captured image")?;

    if bounded {
        let (max_w, max_h) = (
            request.max_width.unwrap_or(CAPTURE_MAX_WIDTH),
            request.max_height.unwrap_or(CAPTURE_MAX_HEIGHT),
        );
        if img.width() > max_w || img.height() > max_h {
            img = img.resize(max_w, max_h, image::imageops::FilterType::Triangle);
        }
    }

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, request.quality);
    img.write_with_encoder(encoder)
        .context("encode capture payload")?;

    Ok(CaptureResult {
        image_data: encoded,
        format: "jpeg".to_string(),
        backend: CaptureBackendKind::Native,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RawShot;
    use anyhow::anyhow;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FakeDevice {
        permission: PermissionState,
        prompts: Arc<AtomicU32>,
        shot: Option<RawShot>,
    }

    impl FakeDevice {
        fn with_image(width: u32, height: u32) -> Self {
            let img = image::RgbImage::from_pixel(width, height, image::Rgb([180, 40, 40]));
            let mut bytes = Vec::new();
            image::DynamicImage::ImageRgb8(img)
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .expect("encode fixture");
            Self {
                permission: PermissionState::Granted,
                prompts: Arc::new(AtomicU32::new(0)),
                shot: Some(RawShot {
                    bytes,
                    format: "png".to_string(),
                }),
            }
        }

        fn failing(permission: PermissionState) -> Self {
            Self {
                permission,
                prompts: Arc::new(AtomicU32::new(0)),
                shot: None,
            }
        }
    }

    impl CameraDevice for FakeDevice {
        fn permission_state(&self) -> PermissionState {
            self.permission
        }

        fn request_permission(&mut self) -> PermissionState {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            self.permission = PermissionState::Granted;
            self.permission
        }

        fn acquire(&mut self, _request: &ShotRequest) -> Result<RawShot> {
            self.shot
                .clone()
                .ok_or_else(|| anyhow!("user cancelled capture"))
        }
    }

    #[test]
    fn unavailable_runtime_returns_nothing() {
        let mut selector = CaptureSelector::unavailable();
        assert!(!selector.is_available());
        assert!(selector.take_photo().is_none());
        assert!(selector.pick_from_gallery().is_none());
        assert!(!selector.check_permissions());
    }

    #[test]
    fn camera_path_is_bounded_to_the_ceiling() {
        let device = FakeDevice::with_image(2560, 1920);
        let mut selector = CaptureSelector::with_device(Box::new(device));

        let result = selector.take_photo().expect("capture");
        assert_eq!(result.format, "jpeg");
        assert_eq!(result.backend, CaptureBackendKind::Native);

        let img = image::load_from_memory(&result.image_data).expect("decode");
        assert!(img.width() <= CAPTURE_MAX_WIDTH);
        assert!(img.height() <= CAPTURE_MAX_HEIGHT);
    }

    #[test]
    fn gallery_path_keeps_native_resolution() {
        let device = FakeDevice::with_image(1600, 1200);
        let mut selector = CaptureSelector::with_device(Box::new(device));

        let result = selector.pick_from_gallery().expect("pick");
        let img = image::load_from_memory(&result.image_data).expect("decode");
        assert_eq!((img.width(), img.height()), (1600, 1200));
    }

    #[test]
    fn acquisition_failure_becomes_none() {
        let device = FakeDevice::failing(PermissionState::Granted);
        let mut selector = CaptureSelector::with_device(Box::new(device));
        assert!(selector.take_photo().is_none());
    }

    #[test]
    fn denied_permission_is_never_reprompted() {
        let device = FakeDevice::failing(PermissionState::Denied);
        let prompts = device.prompts.clone();
        let mut selector = CaptureSelector::with_device(Box::new(device));
        assert!(!selector.check_permissions());
        assert!(!selector.check_permissions());
        assert_eq!(prompts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prompt_state_requests_exactly_once() {
        let device = FakeDevice {
            permission: PermissionState::Prompt,
            prompts: Arc::new(AtomicU32::new(0)),
            shot: None,
        };
        let prompts = device.prompts.clone();
        let mut selector = CaptureSelector::with_device(Box::new(device));
        assert!(selector.check_permissions());
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        // Grant sticks; the next check reads state without prompting again.
        assert!(selector.check_permissions());
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }
}
