//! The detection loop itself.
//!
//! Three observable states: idle (not enabled), loading (classifier being
//! initialized), ready (ticking on a fixed cadence). Ticks are scheduled
//! strictly one interval after the previous scheduled time, except the first,
//! which fires immediately on entering ready.
//!
//! Disable is cooperative: it bumps a generation counter, zeroes the
//! published count, and returns. The worker observes the stale generation at
//! its next publication or deadline check, stops, and drops the classifier.
//! A tick that started before the disable can therefore never publish after
//! it.

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::classifier::{vehicle_count_at, Classifier, ClassifierProvider};
use super::{CONFIDENCE_THRESHOLD, TICK_INTERVAL};

/// Readiness signal published by the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectionState {
    /// Vehicles seen by the latest completed tick. Zero while not ready.
    pub detected_count: usize,
    pub model_loading: bool,
    pub model_ready: bool,
}

/// Live video source the loop samples from.
pub trait FrameSource: Send {
    /// Current frame dimensions. `(0, 0)` while the source is not yet
    /// producing frames; the loop skips those ticks.
    fn dimensions(&self) -> (u32, u32);

    /// Sample the current frame as RGB into `buf`, reusing its allocation,
    /// and return the sampled dimensions.
    fn sample_into(&mut self, buf: &mut Vec<u8>) -> Result<(u32, u32)>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading,
    Ready,
}

struct Inner {
    phase: Phase,
    detected_count: usize,
}

struct Shared {
    /// Bumped on every disable. Workers hold the generation they were
    /// spawned with and go silent once it is stale.
    generation: AtomicU64,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A worker never panics while holding the lock; recover anyway.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Continuous, throttled detection over a live preview.
pub struct LiveDetection {
    provider: Arc<dyn ClassifierProvider>,
    interval: Duration,
    threshold: f32,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl LiveDetection {
    pub fn new(provider: Arc<dyn ClassifierProvider>) -> Self {
        Self {
            provider,
            interval: TICK_INTERVAL,
            threshold: CONFIDENCE_THRESHOLD,
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                inner: Mutex::new(Inner {
                    phase: Phase::Idle,
                    detected_count: 0,
                }),
            }),
            worker: None,
        }
    }

    /// Override the tick cadence (default [`TICK_INTERVAL`]).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the confidence threshold (default [`CONFIDENCE_THRESHOLD`]).
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enable the loop over `source`.
    ///
    /// No-op while loading or ready: only one initialization may be in
    /// flight, and an active session keeps its source.
    pub fn enable(&mut self, source: Box<dyn FrameSource>) {
        {
            let mut inner = self.shared.lock();
            if inner.phase != Phase::Idle {
                return;
            }
            inner.phase = Phase::Loading;
        }

        // The previous worker (if any) saw its generation go stale and has
        // exited or will exit without publishing; its handle is detached.
        drop(self.worker.take());

        let generation = self.shared.generation.load(Ordering::SeqCst);
        let shared = self.shared.clone();
        let provider = self.provider.clone();
        let interval = self.interval;
        let threshold = self.threshold;
        self.worker = Some(thread::spawn(move || {
            run_session(shared, provider, source, interval, threshold, generation)
        }));
    }

    /// Disable the loop and reset the published count to zero.
    ///
    /// Returns immediately; the worker stops at its next generation check
    /// and releases the classifier. In-flight tick results become no-ops.
    pub fn disable(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.shared.lock();
        inner.phase = Phase::Idle;
        inner.detected_count = 0;
    }

    /// Snapshot of the current readiness signal.
    pub fn state(&self) -> DetectionState {
        let inner = self.shared.lock();
        DetectionState {
            detected_count: inner.detected_count,
            model_loading: inner.phase == Phase::Loading,
            model_ready: inner.phase == Phase::Ready,
        }
    }

    /// Block until the current worker has fully stopped. Test hook.
    pub fn join_session(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LiveDetection {
    fn drop(&mut self) {
        self.disable();
    }
}

fn run_session(
    shared: Arc<Shared>,
    provider: Arc<dyn ClassifierProvider>,
    mut source: Box<dyn FrameSource>,
    interval: Duration,
    threshold: f32,
    generation: u64,
) {
    let mut classifier = match provider.load() {
        Ok(classifier) => classifier,
        Err(e) => {
            log::warn!("classifier load failed: {:#}", e);
            let mut inner = shared.lock();
            if shared.generation.load(Ordering::SeqCst) == generation
                && inner.phase == Phase::Loading
            {
                inner.phase = Phase::Idle;
            }
            return;
        }
    };

    {
        let mut inner = shared.lock();
        if shared.generation.load(Ordering::SeqCst) != generation {
            // Disabled while loading; drop the classifier without ticking.
            return;
        }
        inner.phase = Phase::Ready;
    }
    log::debug!("classifier '{}' ready, ticking", classifier.name());

    // Sampling buffer reused across ticks.
    let mut buf = Vec::new();
    // First tick fires immediately; later deadlines advance by the fixed
    // interval from the previous deadline, not from tick completion.
    let mut deadline = Instant::now();
    loop {
        if shared.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        tick(
            &shared,
            classifier.as_mut(),
            source.as_mut(),
            &mut buf,
            threshold,
            generation,
        );

        deadline += interval;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}

/// One sample → classify → publish cycle. Best-effort: every failure is
/// swallowed and the next tick proceeds.
fn tick(
    shared: &Shared,
    classifier: &mut dyn Classifier,
    source: &mut dyn FrameSource,
    buf: &mut Vec<u8>,
    threshold: f32,
    generation: u64,
) {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let (width, height) = match source.sample_into(buf) {
        Ok(dims) => dims,
        Err(e) => {
            log::debug!("frame sample skipped: {:#}", e);
            return;
        }
    };

    let count = match classifier.classify(buf, width, height) {
        Ok(predictions) => vehicle_count_at(&predictions, threshold),
        Err(e) => {
            log::debug!("detection tick failed: {:#}", e);
            return;
        }
    };

    let mut inner = shared.lock();
    if shared.generation.load(Ordering::SeqCst) != generation || inner.phase != Phase::Ready {
        // Stale tick: the loop was disabled after this tick started.
        return;
    }
    inner.detected_count = count;
}
