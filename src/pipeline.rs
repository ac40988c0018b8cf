//! Scan flow orchestration.
//!
//! Capture produces a still image, the external analysis collaborator turns
//! it into records, the enricher attaches reference photos, and the enriched
//! outcome is persisted to the pending slot so an interrupted session can be
//! resumed. The live detection loop runs independently of this flow and never
//! feeds it.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::analysis::{AnalysisClient, DetectedType};
use crate::capture::{CaptureResult, CaptureSelector};
use crate::enrich::{EnrichedResult, Enricher};
use crate::store::{PendingScanResult, PendingStore};

/// What one completed scan hands to the UI.
#[derive(Clone, Debug)]
pub struct ScanOutcome {
    pub detected_type: DetectedType,
    pub results: Vec<EnrichedResult>,
    /// Content reference of the analyzed image, also used in the pending slot.
    pub captured_image_ref: String,
}

/// The scan flow: capture → analysis → enrichment → pending slot.
pub struct ScannerPipeline {
    selector: CaptureSelector,
    analysis: Arc<dyn AnalysisClient>,
    enricher: Enricher,
    store: PendingStore,
}

impl ScannerPipeline {
    pub fn new(
        selector: CaptureSelector,
        analysis: Arc<dyn AnalysisClient>,
        enricher: Enricher,
        store: PendingStore,
    ) -> Self {
        Self {
            selector,
            analysis,
            enricher,
            store,
        }
    }

    /// Capture from the device camera and run the full flow.
    ///
    /// `Ok(None)` when capture yields nothing (no native capability, denied
    /// permission, cancellation); retrying is the caller's decision. Analysis
    /// failures propagate.
    pub fn scan_from_camera(&mut self) -> Result<Option<ScanOutcome>> {
        let Some(capture) = self.selector.take_photo() else {
            return Ok(None);
        };
        self.process_capture(capture).map(Some)
    }

    /// Same flow over a gallery pick.
    pub fn scan_from_gallery(&mut self) -> Result<Option<ScanOutcome>> {
        let Some(capture) = self.selector.pick_from_gallery() else {
            return Ok(None);
        };
        self.process_capture(capture).map(Some)
    }

    /// Analyze an already-captured image (native or web backend), enrich the
    /// records, and persist the enriched outcome.
    pub fn process_capture(&mut self, capture: CaptureResult) -> Result<ScanOutcome> {
        let captured_image_ref = content_ref(&capture.image_data);
        let captured_at_epoch_ms = crate::now_ms()?;

        // The one boundary whose failures belong to our caller.
        let response = self.analysis.analyze(&capture)?;
        drop(capture); // consumed once, not retained after handoff

        let results = self.enricher.enrich(response.records);

        let pending = PendingScanResult {
            captured_image_ref: captured_image_ref.clone(),
            analysis_results: results.iter().cloned().map(EnrichedResult::into_record).collect(),
            detected_type: response.detected_type,
            captured_at_epoch_ms,
        };
        self.store.save(&pending);

        log::info!(
            "scan complete: {:?}, {} record(s), ref {}",
            response.detected_type,
            results.len(),
            captured_image_ref
        );
        Ok(ScanOutcome {
            detected_type: response.detected_type,
            results,
            captured_image_ref,
        })
    }

    /// Load the pending result saved by an interrupted session, if any
    /// unexpired one exists. The record stays in the slot until dismissed.
    pub fn resume_pending(&mut self) -> Option<PendingScanResult> {
        self.store.load().map(|record| record.result)
    }

    /// Drop the pending result (user resumed or dismissed it).
    pub fn dismiss_pending(&mut self) {
        self.store.clear();
    }

    pub fn has_pending(&self) -> bool {
        self.store.has_pending()
    }

    /// Capture permission check, surfaced for the UI's scan button.
    pub fn check_capture_permissions(&mut self) -> bool {
        self.selector.check_permissions()
    }
}

/// Stable content reference for a captured image.
fn content_ref(image_data: &[u8]) -> String {
    let digest: [u8; 32] = Sha256::digest(image_data).into();
    let mut hex = String::with_capacity(32);
    for byte in &digest[..16] {
        hex.push_str(&format!("{:02x}", byte));
    }
    format!("capture:{}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_ref_is_stable_and_prefixed() {
        let a = content_ref(b"image bytes");
        let b = content_ref(b"image bytes");
        let c = content_ref(b"other bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("capture:"));
        assert_eq!(a.len(), "capture:".len() + 32);
    }
}
