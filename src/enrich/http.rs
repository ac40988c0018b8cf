//! HTTP photo-lookup collaborator.
//!
//! Wire format: `GET {endpoint}?brand=..&model=..[&year=..]` returning
//! `{ "photos": [url...], "source": str, "count": n, "error": str? }`.
//! Transport failures and an `error` field both surface as errors here; the
//! enricher converts them to empty results.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::PhotoLookup;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8077/photos";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the photo-lookup client.
#[derive(Clone, Debug)]
pub struct PhotoLookupConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for PhotoLookupConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PhotoLookupResponse {
    #[serde(default)]
    photos: Vec<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    count: u32,
    #[serde(default)]
    error: Option<String>,
}

/// `ureq`-based [`PhotoLookup`] implementation.
pub struct HttpPhotoLookup {
    config: PhotoLookupConfig,
}

impl HttpPhotoLookup {
    pub fn new(config: PhotoLookupConfig) -> Self {
        Self { config }
    }
}

impl PhotoLookup for HttpPhotoLookup {
    fn fetch_photos(&self, brand: &str, model: &str, year: Option<u32>) -> Result<Vec<String>> {
        let mut request = ureq::get(&self.config.endpoint)
            .timeout(self.config.timeout)
            .query("brand", brand)
            .query("model", model);
        if let Some(year) = year {
            request = request.query("year", &year.to_string());
        }

        let body = request
            .call()
            .with_context(|| format!("photo lookup request for {} {}", brand, model))?
            .into_string()
            .context("read photo lookup response")?;

        let response: PhotoLookupResponse =
            serde_json::from_str(&body).context("parse photo lookup response")?;

        if let Some(error) = response.error {
            return Err(anyhow!("photo lookup rejected request: {}", error));
        }

        log::debug!(
            "photo lookup returned {} photos ({} reported) from '{}'",
            response.photos.len(),
            response.count,
            response.source
        );
        Ok(response.photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_tolerates_missing_fields() {
        let response: PhotoLookupResponse =
            serde_json::from_str(r#"{"photos": ["https://p.example/1.jpg"]}"#).unwrap();
        assert_eq!(response.photos.len(), 1);
        assert_eq!(response.count, 0);
        assert!(response.error.is_none());
    }

    #[test]
    fn error_field_is_detected() {
        let response: PhotoLookupResponse =
            serde_json::from_str(r#"{"photos": [], "error": "quota exceeded"}"#).unwrap();
        assert_eq!(response.error.as_deref(), Some("quota exceeded"));
    }
}
