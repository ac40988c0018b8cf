use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "scanner.db";
const DEFAULT_PHOTO_ENDPOINT: &str = "http://127.0.0.1:8077/photos";
const DEFAULT_PHOTO_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DETECT_INTERVAL_MS: u64 = 1500;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_CAPTURE_MAX_WIDTH: u32 = 1280;
const DEFAULT_CAPTURE_MAX_HEIGHT: u32 = 960;
const DEFAULT_CAPTURE_QUALITY: u8 = 90;
const DEFAULT_PENDING_TTL_SECS: u64 = 60 * 60 * 24;

#[derive(Debug, Deserialize, Default)]
struct ScannerConfigFile {
    db_path: Option<String>,
    photo_api: Option<PhotoApiConfigFile>,
    detection: Option<DetectionConfigFile>,
    capture: Option<CaptureConfigFile>,
    pending: Option<PendingConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct PhotoApiConfigFile {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    interval_ms: Option<u64>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    max_width: Option<u32>,
    max_height: Option<u32>,
    quality: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct PendingConfigFile {
    ttl_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub db_path: String,
    pub photo_api: PhotoApiSettings,
    pub detection: DetectionSettings,
    pub capture: CaptureSettings,
    pub pending_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct PhotoApiSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl PhotoApiSettings {
    /// Client configuration for the photo-lookup collaborator.
    pub fn lookup_config(&self) -> crate::enrich::PhotoLookupConfig {
        crate::enrich::PhotoLookupConfig {
            endpoint: self.endpoint.clone(),
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub interval: Duration,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
}

impl ScannerConfig {
    /// Load from the JSON file named by `SCANNER_CONFIG` (when set), then
    /// apply env overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SCANNER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScannerConfigFile) -> Self {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let photo_api = PhotoApiSettings {
            endpoint: file
                .photo_api
                .as_ref()
                .and_then(|api| api.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_PHOTO_ENDPOINT.to_string()),
            timeout: Duration::from_secs(
                file.photo_api
                    .as_ref()
                    .and_then(|api| api.timeout_secs)
                    .unwrap_or(DEFAULT_PHOTO_TIMEOUT_SECS),
            ),
        };
        let detection = DetectionSettings {
            interval: Duration::from_millis(
                file.detection
                    .as_ref()
                    .and_then(|d| d.interval_ms)
                    .unwrap_or(DEFAULT_DETECT_INTERVAL_MS),
            ),
            confidence_threshold: file
                .detection
                .as_ref()
                .and_then(|d| d.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
        };
        let capture = CaptureSettings {
            max_width: file
                .capture
                .as_ref()
                .and_then(|c| c.max_width)
                .unwrap_or(DEFAULT_CAPTURE_MAX_WIDTH),
            max_height: file
                .capture
                .as_ref()
                .and_then(|c| c.max_height)
                .unwrap_or(DEFAULT_CAPTURE_MAX_HEIGHT),
            quality: file
                .capture
                .as_ref()
                .and_then(|c| c.quality)
                .unwrap_or(DEFAULT_CAPTURE_QUALITY),
        };
        let pending_ttl = Duration::from_secs(
            file.pending
                .and_then(|p| p.ttl_secs)
                .unwrap_or(DEFAULT_PENDING_TTL_SECS),
        );
        Self {
            db_path,
            photo_api,
            detection,
            capture,
            pending_ttl,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("SCANNER_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(endpoint) = std::env::var("SCANNER_PHOTO_API_URL") {
            if !endpoint.trim().is_empty() {
                self.photo_api.endpoint = endpoint;
            }
        }
        if let Ok(interval) = std::env::var("SCANNER_DETECT_INTERVAL_MS") {
            let ms: u64 = interval.parse().map_err(|_| {
                anyhow!("SCANNER_DETECT_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.detection.interval = Duration::from_millis(ms);
        }
        if let Ok(ttl) = std::env::var("SCANNER_PENDING_TTL_SECS") {
            let seconds: u64 = ttl.parse().map_err(|_| {
                anyhow!("SCANNER_PENDING_TTL_SECS must be an integer number of seconds")
            })?;
            self.pending_ttl = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.detection.interval.is_zero() {
            return Err(anyhow!("detection interval must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(anyhow!("confidence threshold must be within 0..=1"));
        }
        if self.capture.max_width == 0 || self.capture.max_height == 0 {
            return Err(anyhow!("capture ceiling must be greater than zero"));
        }
        if self.capture.quality > 100 {
            return Err(anyhow!("capture quality must be within 0..=100"));
        }
        if self.pending_ttl.is_zero() {
            return Err(anyhow!("pending TTL must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScannerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
