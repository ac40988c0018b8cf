use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Result;
use diecast_scanner::{
    shared_memory_uri, AnalysisClient, AnalysisRecord, AnalysisResponse, CameraDevice,
    CaptureResult, CaptureSelector, DetectedType, Enricher, PendingStore, PermissionState,
    PhotoLookup, RawShot, ScannerPipeline, ShotRequest, SqliteSlotStore,
};

struct TestCamera {
    permission: PermissionState,
    acquisitions: Arc<AtomicU32>,
}

impl TestCamera {
    fn granted() -> Self {
        Self {
            permission: PermissionState::Granted,
            acquisitions: Arc::new(AtomicU32::new(0)),
        }
    }

    fn denied() -> Self {
        Self {
            permission: PermissionState::Denied,
            acquisitions: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl CameraDevice for TestCamera {
    fn permission_state(&self) -> PermissionState {
        self.permission
    }

    fn request_permission(&mut self) -> PermissionState {
        self.permission
    }

    fn acquire(&mut self, _request: &ShotRequest) -> Result<RawShot> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let img = image::RgbImage::from_pixel(320, 240, image::Rgb([200, 120, 40]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)?;
        Ok(RawShot {
            bytes,
            format: "jpeg".to_string(),
        })
    }
}

/// Analysis stub: one record, no reference photos attached.
struct BareRecordAnalysis;

impl AnalysisClient for BareRecordAnalysis {
    fn analyze(&self, capture: &CaptureResult) -> Result<AnalysisResponse> {
        assert!(!capture.image_data.is_empty());
        assert_eq!(capture.format, "jpeg");
        Ok(AnalysisResponse {
            detected_type: DetectedType::Collectible,
            records: vec![AnalysisRecord::new("Lamborghini", "Miura", Some(1969))],
        })
    }
}

struct ThreePhotoLookup;

impl PhotoLookup for ThreePhotoLookup {
    fn fetch_photos(&self, brand: &str, model: &str, _year: Option<u32>) -> Result<Vec<String>> {
        Ok((1..=3)
            .map(|i| format!("https://photos.example/{}/{}/{}.jpg", brand, model, i))
            .collect())
    }
}

fn pipeline_over(uri: &str, camera: TestCamera) -> ScannerPipeline {
    let selector = CaptureSelector::with_device(Box::new(camera));
    let store =
        PendingStore::with_system_clock(Box::new(SqliteSlotStore::open(uri).expect("open slot")));
    ScannerPipeline::new(
        selector,
        Arc::new(BareRecordAnalysis),
        Enricher::new(Arc::new(ThreePhotoLookup)),
        store,
    )
}

#[test]
fn capture_analyze_enrich_persist_and_resume_after_restart() {
    let uri = shared_memory_uri();
    let mut pipeline = pipeline_over(&uri, TestCamera::granted());

    assert!(pipeline.check_capture_permissions());
    let outcome = pipeline
        .scan_from_camera()
        .expect("analysis succeeds")
        .expect("capture succeeds");

    assert_eq!(outcome.detected_type, DetectedType::Collectible);
    assert_eq!(outcome.results.len(), 1);
    let photos = &outcome.results[0].real_car_photos;
    assert_eq!(photos.len(), 3);
    assert!(photos[0].starts_with("https://photos.example/Lamborghini/Miura/"));
    assert!(pipeline.has_pending());

    // Fresh store over the same slot stands in for a process restart. The
    // original pipeline stays alive so the shared in-memory database does.
    let slot = SqliteSlotStore::open(&uri).expect("reopen slot");
    let mut restarted = PendingStore::with_system_clock(Box::new(slot));
    let record = restarted.load().expect("pending record within TTL");

    assert_eq!(record.result.detected_type, DetectedType::Collectible);
    assert_eq!(record.result.captured_image_ref, outcome.captured_image_ref);
    assert_eq!(record.result.analysis_results.len(), 1);
    // The persisted record is the enriched one.
    assert_eq!(
        record.result.analysis_results[0].real_car_photos.as_deref(),
        Some(photos.as_slice())
    );
}

#[test]
fn dismissing_the_pending_result_clears_the_slot() {
    let uri = shared_memory_uri();
    let mut pipeline = pipeline_over(&uri, TestCamera::granted());

    pipeline.scan_from_camera().expect("scan").expect("capture");
    assert!(pipeline.resume_pending().is_some());

    pipeline.dismiss_pending();
    assert!(!pipeline.has_pending());
    assert!(pipeline.resume_pending().is_none());
}

#[test]
fn denied_permission_gates_the_scan_flow() {
    let camera = TestCamera::denied();
    let acquisitions = camera.acquisitions.clone();
    let uri = shared_memory_uri();
    let mut pipeline = pipeline_over(&uri, camera);

    // The flow checks permissions first and does not attempt a photo-taking
    // call afterward without a fresh explicit re-request.
    assert!(!pipeline.check_capture_permissions());
    assert_eq!(acquisitions.load(Ordering::SeqCst), 0);
    assert!(!pipeline.has_pending());
}
