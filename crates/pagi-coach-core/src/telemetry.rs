//! Diagnostics telemetry: a bounded, in-memory FIFO of per-request entries.
//!
//! Sinks are injected; nothing here is process-global. The ring buffer appends
//! and evicts under one lock so concurrent writers never push it past capacity.

use crate::intent::Intent;
use crate::tools::ToolName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const TELEMETRY_CAPACITY: usize = 100;

/// Which pipeline produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePath {
    Legacy,
    Modern,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryLogEntry {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub intent: Intent,
    #[serde(default)]
    pub tools_used: Vec<ToolName>,
    #[serde(default)]
    pub has_navigate_to: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<ResponsePath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl TelemetryLogEntry {
    pub fn new(user_id: impl Into<String>, intent: Intent) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: user_id.into(),
            intent,
            tools_used: Vec::new(),
            has_navigate_to: false,
            error: None,
            path: None,
            request_id: None,
        }
    }
}

pub trait TelemetrySink: Send + Sync {
    fn record(&self, entry: TelemetryLogEntry);

    /// Up to `limit` most recent entries, oldest first.
    fn recent(&self, limit: usize) -> Vec<TelemetryLogEntry>;
}

/// Bounded FIFO; the oldest entry is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct RingBufferTelemetry {
    capacity: usize,
    entries: Mutex<VecDeque<TelemetryLogEntry>>,
}

impl RingBufferTelemetry {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TelemetryLogEntry>> {
        // A panicking writer cannot leave the deque inconsistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RingBufferTelemetry {
    fn default() -> Self {
        Self::new(TELEMETRY_CAPACITY)
    }
}

impl TelemetrySink for RingBufferTelemetry {
    fn record(&self, entry: TelemetryLogEntry) {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn recent(&self, limit: usize) -> Vec<TelemetryLogEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _entry: TelemetryLogEntry) {}

    fn recent(&self, _limit: usize) -> Vec<TelemetryLogEntry> {
        Vec::new()
    }
}
