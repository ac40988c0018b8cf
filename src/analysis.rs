//! Analysis collaborator interface.
//!
//! The external AI analysis endpoint is consumed as an opaque call behind
//! [`AnalysisClient`]. This module defines only the record shapes the rest of
//! the pipeline needs: the real-car reference used for photo lookup and the
//! optional photo list the enrichment resolver validates. Everything else an
//! analysis record carries is preserved verbatim through `extra`, so records
//! round-trip without losing fields this crate does not interpret.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureResult;

/// What the analysis step decided it was looking at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedType {
    Collectible,
    RealCar,
}

/// The real-world vehicle an analysis record refers to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealCarRef {
    pub brand: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

/// One opaque analysis record.
///
/// Only `real_car` and `real_car_photos` are interpreted here; unknown fields
/// flow through `extra` untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub real_car: RealCarRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_car_photos: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AnalysisRecord {
    pub fn new(brand: &str, model: &str, year: Option<u32>) -> Self {
        Self {
            real_car: RealCarRef {
                brand: brand.to_string(),
                model: model.to_string(),
                year,
            },
            real_car_photos: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Everything one analysis call returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub detected_type: DetectedType,
    pub records: Vec<AnalysisRecord>,
}

/// External analysis collaborator.
///
/// The call may be slow and may fail; failures propagate to the pipeline's
/// caller. This is the one boundary whose error handling belongs outside this
/// crate.
pub trait AnalysisClient: Send + Sync {
    fn analyze(&self, capture: &CaptureResult) -> Result<AnalysisResponse>;
}
