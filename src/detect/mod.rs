//! Live detection loop.
//!
//! While a camera preview is active, this module samples frames on a fixed
//! cadence, runs an object classifier, and publishes a running count of
//! relevant vehicles. The count is a pre-capture UX signal only; it never
//! feeds the analysis pipeline.
//!
//! The loop is responsible for:
//! - Loading the classifier exactly once per session (re-entrant enables are
//!   no-ops while loading)
//! - Reusing one sampling buffer across ticks
//! - Filtering predictions to the vehicle allow-list at the confidence
//!   threshold
//! - Suppressing results of ticks that started before a disable
//!
//! The loop MUST NOT:
//! - Let a single tick's failure stop subsequent ticks
//! - Hold the classifier or the sampling buffer beyond the session
//! - Surface any error to the host UI

mod classifier;
mod live;
mod stub;

pub use classifier::{vehicle_count, vehicle_count_at, Classifier, ClassifierProvider, Prediction};
pub use live::{DetectionState, FrameSource, LiveDetection};
pub use stub::{StubClassifier, StubClassifierProvider, SyntheticFrameSource};

use std::time::Duration;

/// Fixed cadence between detection ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1500);

/// Minimum score for a prediction to count.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Object classes that count as vehicles.
pub const VEHICLE_CLASSES: [&str; 3] = ["car", "truck", "bus"];
