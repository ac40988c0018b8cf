//! Scanner capture and detection pipeline.
//!
//! This crate implements the scanning core of the diecast collectibles app:
//!
//! - `capture`: acquires a still image from the native capture capability and
//!   normalizes it into a uniform [`CaptureResult`], falling back to the web
//!   backend (an external collaborator) by returning nothing.
//! - `detect`: a throttled live detection loop that samples preview frames,
//!   classifies them, and publishes a running vehicle count as a pre-capture
//!   readiness signal.
//! - `store`: a durable single-slot record of one in-flight analysis outcome,
//!   surviving process restarts, expired 24 hours after write.
//! - `enrich`: attaches real-world reference photos to analysis records with
//!   a validate-or-refetch policy, one independent fetch per record.
//! - `pipeline`: wires capture, analysis, enrichment, and persistence into
//!   the scan flow the UI drives.
//!
//! Everything below the pipeline surface degrades gracefully: unavailable
//! capabilities become `None`, denied permissions become `false`, transient
//! fetch failures become empty results, and corrupt persisted state is
//! cleared. Only the external analysis collaborator's failures propagate to
//! the caller.

use anyhow::Result;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod analysis;
pub mod capture;
pub mod config;
pub mod detect;
pub mod enrich;
pub mod pipeline;
pub mod store;

pub use analysis::{AnalysisClient, AnalysisRecord, AnalysisResponse, DetectedType, RealCarRef};
pub use capture::{
    CameraDevice, CaptureBackendKind, CaptureResult, CaptureSelector, PermissionState, RawShot,
    ShotRequest, ShotSource,
};
pub use detect::{
    vehicle_count, vehicle_count_at, Classifier, ClassifierProvider, DetectionState, FrameSource,
    LiveDetection, Prediction, StubClassifier, StubClassifierProvider, SyntheticFrameSource,
    CONFIDENCE_THRESHOLD, TICK_INTERVAL, VEHICLE_CLASSES,
};
pub use enrich::{EnrichedResult, Enricher, HttpPhotoLookup, PhotoLookup, PhotoLookupConfig};
pub use pipeline::{ScanOutcome, ScannerPipeline};
pub use store::{
    Clock, InMemorySlotStore, PendingScanResult, PendingStore, SlotStore, SqliteSlotStore,
    StoredScannerRecord, SystemClock, PENDING_RESULT_TTL,
};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> Result<u64> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(now.as_millis() as u64)
}

/// A shareable in-memory SQLite URI, unique per call.
///
/// Two connections opened with the same URI see the same database, which is
/// how the restart tests simulate an app kill without touching disk.
pub fn shared_memory_uri() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!(
        "file:diecast_scanner_{:x}?mode=memory&cache=shared",
        u64::from_le_bytes(bytes)
    )
}
