use anyhow::Result;

use super::{CONFIDENCE_THRESHOLD, VEHICLE_CLASSES};

/// One prediction from the classifier.
#[derive(Clone, Debug)]
pub struct Prediction {
    /// Object class label, e.g. "car".
    pub class: String,
    /// Confidence score, 0..1.
    pub score: f32,
    /// Bounding box `[x, y, w, h]` in source pixel coordinates.
    pub bbox: [f32; 4],
}

/// Object classifier run on sampled preview frames.
///
/// Implementations must treat the pixel slice as read-only and ephemeral. The
/// instance is exclusively owned by the live loop and dropped when the loop's
/// session ends; classifiers hold a sizeable footprint and must not be cached
/// elsewhere.
pub trait Classifier: Send {
    /// Classifier identifier.
    fn name(&self) -> &'static str;

    /// Classify one RGB frame.
    fn classify(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Prediction>>;
}

/// Classifier initialization, possibly slow (network/compute fetch) and
/// possibly failing.
///
/// The live loop calls `load` once per enable, on its own worker; a failure
/// is logged and returns the loop to idle.
pub trait ClassifierProvider: Send + Sync {
    fn load(&self) -> Result<Box<dyn Classifier>>;
}

/// Count predictions that pass the vehicle allow-list at the default
/// confidence threshold.
pub fn vehicle_count(predictions: &[Prediction]) -> usize {
    vehicle_count_at(predictions, CONFIDENCE_THRESHOLD)
}

/// [`vehicle_count`] at an explicit threshold. The threshold is inclusive.
pub fn vehicle_count_at(predictions: &[Prediction], threshold: f32) -> usize {
    predictions
        .iter()
        .filter(|p| p.score >= threshold)
        .filter(|p| VEHICLE_CLASSES.contains(&p.class.as_str()))
        .count()
}
