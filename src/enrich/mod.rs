//! Enrichment resolver.
//!
//! Analysis records may arrive with real-world reference photos already
//! attached. This module validates them cheaply (the first URL must parse as
//! an absolute URL) and fetches replacements from the photo-lookup
//! collaborator when they are missing or invalid.
//!
//! Per-record operations run independently: one record's fetch failure or
//! latency never blocks or fails the others. The aggregate resolves only once
//! every record has settled, preserving the input order. An empty photo list
//! is an acceptable terminal outcome; a raised error is not.

mod http;

pub use http::{HttpPhotoLookup, PhotoLookupConfig};

use anyhow::Result;
use std::sync::Arc;
use std::thread;
use url::Url;

use crate::analysis::AnalysisRecord;

/// External photo-lookup collaborator.
pub trait PhotoLookup: Send + Sync {
    /// Look up reference photo URLs for a vehicle.
    fn fetch_photos(&self, brand: &str, model: &str, year: Option<u32>) -> Result<Vec<String>>;
}

/// An analysis record with its resolved reference photos.
///
/// Owned by the caller once enrichment resolves; no shared state remains.
#[derive(Clone, Debug, PartialEq)]
pub struct EnrichedResult {
    pub record: AnalysisRecord,
    pub real_car_photos: Vec<String>,
}

impl EnrichedResult {
    /// Fold the resolved photos back into the record, e.g. for persistence.
    pub fn into_record(self) -> AnalysisRecord {
        let mut record = self.record;
        record.real_car_photos = if self.real_car_photos.is_empty() {
            None
        } else {
            Some(self.real_car_photos)
        };
        record
    }
}

/// Applies the validate-or-refetch policy across a result set.
pub struct Enricher {
    lookup: Arc<dyn PhotoLookup>,
}

impl Enricher {
    pub fn new(lookup: Arc<dyn PhotoLookup>) -> Self {
        Self { lookup }
    }

    /// Fetch photos for one vehicle, converting every failure into an empty
    /// list. The cause is logged; nothing propagates.
    pub fn fetch_photos(&self, brand: &str, model: &str, year: Option<u32>) -> Vec<String> {
        match self.lookup.fetch_photos(brand, model, year) {
            Ok(photos) => photos,
            Err(e) => {
                log::warn!("photo lookup failed for {} {}: {:#}", brand, model, e);
                Vec::new()
            }
        }
    }

    /// Enrich every record, concurrently and independently.
    ///
    /// Output order matches input order. A record whose fetch fails (or whose
    /// worker panics) comes back with an empty photo list; the output never
    /// shrinks and never errors.
    pub fn enrich(&self, records: Vec<AnalysisRecord>) -> Vec<EnrichedResult> {
        let photo_lists: Vec<Vec<String>> = thread::scope(|s| {
            let handles: Vec<_> = records
                .iter()
                .map(|record| s.spawn(move || self.resolve(record)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        log::warn!("enrichment worker panicked; attaching no photos");
                        Vec::new()
                    })
                })
                .collect()
        });

        records
            .into_iter()
            .zip(photo_lists)
            .map(|(record, real_car_photos)| EnrichedResult {
                record,
                real_car_photos,
            })
            .collect()
    }

    /// Validate-or-refetch for one record.
    ///
    /// Prior photo data is trusted when its first entry parses as an absolute
    /// URL; only that first entry is checked, as a cheap health check, and
    /// reachability is deliberately not probed.
    fn resolve(&self, record: &AnalysisRecord) -> Vec<String> {
        if let Some(photos) = &record.real_car_photos {
            if let Some(first) = photos.first() {
                if Url::parse(first).is_ok() {
                    return photos.clone();
                }
            }
        }
        self.fetch_photos(
            &record.real_car.brand,
            &record.real_car.model,
            record.real_car.year,
        )
    }
}
