//! Pending-result store.
//!
//! A durable, expiring local record of one in-flight analysis outcome. The
//! slot survives app restarts so a scan interrupted by navigation or an app
//! kill can be resumed; records older than 24 hours are discarded on read.
//!
//! Single-slot, not a queue: a new save unconditionally overwrites any prior
//! record (last-writer-wins, idempotent whole-record replacement). Storage
//! failures never raise to the caller; they degrade to "absent"/no-op.
//! Malformed persisted data is cleared on read, never left to wedge the
//! store.

mod sqlite;

pub use sqlite::{InMemorySlotStore, SqliteSlotStore};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::{AnalysisRecord, DetectedType};

/// Maximum age of a pending record before `load` treats it as absent.
pub const PENDING_RESULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Analysis outcome waiting to be resumed or dismissed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingScanResult {
    /// Reference to the captured image (content hash or caller-defined URI).
    pub captured_image_ref: String,
    pub analysis_results: Vec<AnalysisRecord>,
    pub detected_type: DetectedType,
    pub captured_at_epoch_ms: u64,
}

/// Persistence wrapper: the result plus its write time, for TTL enforcement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredScannerRecord {
    pub result: PendingScanResult,
    pub stored_at_epoch_ms: u64,
}

/// Injected time source so tests control the TTL clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        crate::now_ms().unwrap_or(0)
    }
}

/// One named persistence slot holding a JSON payload.
pub trait SlotStore: Send {
    fn read(&mut self) -> Result<Option<String>>;
    fn write(&mut self, payload: &str) -> Result<()>;
    fn delete(&mut self) -> Result<()>;
}

/// The pending-result store: TTL and defensive parsing over a [`SlotStore`].
pub struct PendingStore {
    slot: Box<dyn SlotStore>,
    clock: Box<dyn Clock>,
    ttl: Duration,
    has_pending: bool,
}

impl PendingStore {
    pub fn new(slot: Box<dyn SlotStore>, clock: Box<dyn Clock>) -> Self {
        Self {
            slot,
            clock,
            ttl: PENDING_RESULT_TTL,
            has_pending: false,
        }
    }

    /// Store with the wall clock.
    pub fn with_system_clock(slot: Box<dyn SlotStore>) -> Self {
        Self::new(slot, Box::new(SystemClock))
    }

    /// Override the record TTL (default [`PENDING_RESULT_TTL`]).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Persist `result`, overwriting any existing record.
    ///
    /// Storage errors are logged and treated as no-ops.
    pub fn save(&mut self, result: &PendingScanResult) {
        let record = StoredScannerRecord {
            result: result.clone(),
            stored_at_epoch_ms: self.clock.now_ms(),
        };
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("pending result not saved (serialize): {}", e);
                return;
            }
        };
        match self.slot.write(&payload) {
            Ok(()) => self.has_pending = true,
            Err(e) => log::warn!("pending result not saved (storage): {:#}", e),
        }
    }

    /// Read the slot, expiring or clearing it as needed.
    ///
    /// Absent, expired (older than the configured TTL), and malformed records
    /// all come back as `None`; the latter two also delete the slot.
    pub fn load(&mut self) -> Option<StoredScannerRecord> {
        let payload = match self.slot.read() {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.has_pending = false;
                return None;
            }
            Err(e) => {
                log::warn!("pending result unreadable: {:#}", e);
                self.has_pending = false;
                return None;
            }
        };

        let record: StoredScannerRecord = match serde_json::from_str(&payload) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("pending result corrupt, clearing: {}", e);
                self.delete_slot();
                self.has_pending = false;
                return None;
            }
        };

        let age_ms = self.clock.now_ms().saturating_sub(record.stored_at_epoch_ms);
        if age_ms > self.ttl.as_millis() as u64 {
            log::info!("pending result expired after {}ms, clearing", age_ms);
            self.delete_slot();
            self.has_pending = false;
            return None;
        }

        self.has_pending = true;
        Some(record)
    }

    /// Delete the slot unconditionally.
    pub fn clear(&mut self) {
        self.delete_slot();
        self.has_pending = false;
    }

    pub fn has_pending(&self) -> bool {
        self.has_pending
    }

    fn delete_slot(&mut self) {
        if let Err(e) = self.slot.delete() {
            log::warn!("pending slot not deleted: {:#}", e);
        }
    }
}
