// src/lifecycle/stats.rs
//! Download counters
//!
//! Atomic counters bumped by background downloads and read by the stats
//! endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct DownloadCounters {
    scheduled: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl DownloadCounters {
    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, in_flight: usize) -> DownloadStats {
        DownloadStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            in_flight,
        }
    }
}

/// Snapshot of download activity since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    /// Download tasks spawned
    pub scheduled: u64,
    /// Tasks that moved a package to `downloaded`
    pub succeeded: u64,
    /// Tasks whose fetch failed or timed out
    pub failed: u64,
    /// Tasks that found the package no longer `created`
    pub skipped: u64,
    /// Packages with a download currently running
    pub in_flight: usize,
}
