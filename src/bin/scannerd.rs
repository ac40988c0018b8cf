//! scannerd - synthetic end-to-end run of the scanner pipeline
//!
//! Runs the live detection loop over a synthetic preview source, then
//! demonstrates one full scan: capture → (stubbed) analysis → enrichment →
//! pending slot → resume after a simulated restart.

use anyhow::Result;
use clap::Parser;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use diecast_scanner::config::ScannerConfig;
use diecast_scanner::{
    AnalysisClient, AnalysisRecord, AnalysisResponse, CameraDevice, CaptureResult,
    CaptureSelector, DetectedType, Enricher, HttpPhotoLookup, LiveDetection, PendingStore,
    PermissionState, PhotoLookup, RawShot, ShotRequest, SqliteSlotStore, StubClassifierProvider,
    SyntheticFrameSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Seconds to run the live detection loop; 0 runs until Ctrl-C.
    #[arg(long, default_value_t = 8)]
    seconds: u64,
    /// Preview width for the synthetic source.
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Preview height for the synthetic source.
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Skip the end-to-end scan demonstration.
    #[arg(long)]
    live_only: bool,
    /// Fetch reference photos from the configured photo API instead of the
    /// built-in stub.
    #[arg(long)]
    live_photos: bool,
}

struct DemoCamera;

impl CameraDevice for DemoCamera {
    fn permission_state(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn request_permission(&mut self) -> PermissionState {
        PermissionState::Granted
    }

    fn acquire(&mut self, request: &ShotRequest) -> Result<RawShot> {
        let width = request.max_width.unwrap_or(640);
        let height = request.max_height.unwrap_or(480);
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)?;
        Ok(RawShot {
            bytes,
            format: "jpeg".to_string(),
        })
    }
}

struct DemoAnalysis;

impl AnalysisClient for DemoAnalysis {
    fn analyze(&self, capture: &CaptureResult) -> Result<AnalysisResponse> {
        log::info!(
            "analysis stub received {} bytes ({})",
            capture.image_data.len(),
            capture.format
        );
        Ok(AnalysisResponse {
            detected_type: DetectedType::Collectible,
            records: vec![AnalysisRecord::new("Porsche", "911 Carrera RS", Some(1973))],
        })
    }
}

struct DemoPhotoLookup;

impl PhotoLookup for DemoPhotoLookup {
    fn fetch_photos(&self, brand: &str, model: &str, _year: Option<u32>) -> Result<Vec<String>> {
        let slug = format!("{}-{}", brand, model).to_lowercase().replace(' ', "-");
        Ok((1..=3)
            .map(|i| format!("https://photos.example/{}/{}.jpg", slug, i))
            .collect())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = ScannerConfig::load()?;

    run_live_loop(&args, &cfg)?;
    if !args.live_only {
        run_scan_demo(&args, &cfg)?;
    }
    Ok(())
}

fn run_live_loop(args: &Args, cfg: &ScannerConfig) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let provider = Arc::new(StubClassifierProvider::with_load_delay(Duration::from_millis(
        300,
    )));
    let mut live = LiveDetection::new(provider)
        .with_interval(cfg.detection.interval)
        .with_threshold(cfg.detection.confidence_threshold);
    let source = SyntheticFrameSource::new(args.width, args.height)
        .with_warmup(Duration::from_millis(200));
    live.enable(Box::new(source));
    log::info!(
        "live loop enabled ({}x{}, tick every {:?})",
        args.width,
        args.height,
        cfg.detection.interval
    );

    let deadline = (args.seconds > 0).then(|| Instant::now() + Duration::from_secs(args.seconds));
    loop {
        if stop.load(Ordering::SeqCst) {
            log::info!("interrupted, disabling live loop");
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        let state = live.state();
        log::info!(
            "detection state: count={} loading={} ready={}",
            state.detected_count,
            state.model_loading,
            state.model_ready
        );
        std::thread::sleep(Duration::from_millis(500));
    }

    live.disable();
    let state = live.state();
    log::info!("live loop disabled, count reset to {}", state.detected_count);
    Ok(())
}

fn run_scan_demo(args: &Args, cfg: &ScannerConfig) -> Result<()> {
    let selector = CaptureSelector::with_device(Box::new(DemoCamera)).with_limits(
        cfg.capture.max_width,
        cfg.capture.max_height,
        cfg.capture.quality,
    );
    let store = PendingStore::with_system_clock(Box::new(SqliteSlotStore::open(&cfg.db_path)?))
        .with_ttl(cfg.pending_ttl);
    let lookup: Arc<dyn PhotoLookup> = if args.live_photos {
        Arc::new(HttpPhotoLookup::new(cfg.photo_api.lookup_config()))
    } else {
        Arc::new(DemoPhotoLookup)
    };
    let mut pipeline = diecast_scanner::ScannerPipeline::new(
        selector,
        Arc::new(DemoAnalysis),
        Enricher::new(lookup),
        store,
    );

    if !pipeline.check_capture_permissions() {
        log::warn!("capture permission not granted, skipping scan demo");
        return Ok(());
    }

    let Some(outcome) = pipeline.scan_from_camera()? else {
        log::warn!("capture yielded nothing, skipping scan demo");
        return Ok(());
    };
    for result in &outcome.results {
        log::info!(
            "{} {} -> {} reference photo(s)",
            result.record.real_car.brand,
            result.record.real_car.model,
            result.real_car_photos.len()
        );
    }

    // Fresh store over the same database stands in for an app restart.
    let mut resumed_store =
        PendingStore::with_system_clock(Box::new(SqliteSlotStore::open(&cfg.db_path)?));
    match resumed_store.load() {
        Some(record) => log::info!(
            "pending scan survives restart: {:?}, ref {}",
            record.result.detected_type,
            record.result.captured_image_ref
        ),
        None => log::warn!("no pending scan found after restart"),
    }
    resumed_store.clear();
    Ok(())
}
