//! Synthetic source and stub classifier for tests and the demo daemon.

use anyhow::Result;
use std::thread;
use std::time::{Duration, Instant};

use super::classifier::{Classifier, ClassifierProvider, Prediction};
use super::live::FrameSource;

/// Deterministic classifier over synthetic frames.
///
/// Reads the number of "model cars on the table" back out of the synthetic
/// pixel pattern, and pads the result with predictions the live loop must
/// filter out (an off-list class above threshold, an allowed class below it).
pub struct StubClassifier;

impl StubClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&mut self, pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Prediction>> {
        let cars = SyntheticFrameSource::encoded_car_count(pixels);
        let mut predictions = Vec::with_capacity(cars + 2);
        for i in 0..cars {
            predictions.push(Prediction {
                class: "car".to_string(),
                score: 0.85,
                bbox: [20.0 * i as f32, 10.0, 18.0, 12.0],
            });
        }
        predictions.push(Prediction {
            class: "person".to_string(),
            score: 0.9,
            bbox: [0.0, 0.0, 30.0, 80.0],
        });
        predictions.push(Prediction {
            class: "truck".to_string(),
            score: 0.2,
            bbox: [5.0, 5.0, 40.0, 20.0],
        });
        Ok(predictions)
    }
}

/// Provider for [`StubClassifier`], with an optional artificial load delay so
/// the loading state is observable.
pub struct StubClassifierProvider {
    pub load_delay: Duration,
}

impl StubClassifierProvider {
    pub fn new() -> Self {
        Self {
            load_delay: Duration::ZERO,
        }
    }

    pub fn with_load_delay(load_delay: Duration) -> Self {
        Self { load_delay }
    }
}

impl Default for StubClassifierProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierProvider for StubClassifierProvider {
    fn load(&self) -> Result<Box<dyn Classifier>> {
        if !self.load_delay.is_zero() {
            thread::sleep(self.load_delay);
        }
        Ok(Box::new(StubClassifier::new()))
    }
}

/// Synthetic preview source.
///
/// Generates RGB frames of a simulated tabletop scene. The number of model
/// cars in the scene changes every few frames, and is encoded into the pixel
/// pattern so [`StubClassifier`] can recover it deterministically.
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    frame_count: u64,
    /// Instant the source starts "producing frames".
    ready_at: Instant,
}

const SCENE_CHANGE_EVERY: u64 = 5;
const MAX_SCENE_CARS: u64 = 4;

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
            ready_at: Instant::now(),
        }
    }

    /// Report `(0, 0)` dimensions for `warmup` after creation, simulating a
    /// preview that has not started producing frames yet.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.ready_at = Instant::now() + warmup;
        self
    }

    fn scene_cars(&self) -> u64 {
        (self.frame_count / SCENE_CHANGE_EVERY) % MAX_SCENE_CARS
    }

    /// Recover the car count a synthetic frame encodes.
    pub fn encoded_car_count(pixels: &[u8]) -> usize {
        pixels.first().map(|&b| (b as usize / 40) % 4).unwrap_or(0)
    }
}

impl FrameSource for SyntheticFrameSource {
    fn dimensions(&self) -> (u32, u32) {
        if Instant::now() < self.ready_at {
            (0, 0)
        } else {
            (self.width, self.height)
        }
    }

    fn sample_into(&mut self, buf: &mut Vec<u8>) -> Result<(u32, u32)> {
        let cars = self.scene_cars();
        self.frame_count += 1;

        let len = (self.width * self.height * 3) as usize;
        buf.clear();
        buf.resize(len, 0);

        // First byte encodes the car count; the rest is a flat background
        // with a little per-frame variation so consecutive frames differ.
        let base = 40 * cars as u8 + 10;
        buf[0] = base;
        for (i, px) in buf.iter_mut().enumerate().skip(1) {
            *px = base.wrapping_add((i as u8).wrapping_mul(3)).wrapping_add(self.frame_count as u8);
        }

        Ok((self.width, self.height))
    }
}
