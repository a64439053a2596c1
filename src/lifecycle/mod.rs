// src/lifecycle/mod.rs
//! Package lifecycle engine
//!
//! Packages move `created` -> `downloaded` -> `activated`. The first step is
//! taken by a background download; the second by an explicit activate call.
//! Every status change is a guarded transition against the record store, so
//! concurrent callers can never both apply the same step.
//!
//! At most one download per package runs at a time. Requests that arrive
//! while one is running return the current status and schedule nothing.

mod inflight;
mod stats;

pub use inflight::{InFlight, InFlightGuard};
pub use stats::DownloadStats;

use crate::db::Database;
use crate::db::models::{Package, PackageStatus};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use stats::DownloadCounters;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// How often `wait_for_downloads` checks for running tasks
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tuning knobs for background downloads
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single fetch
    pub fetch_timeout: Duration,
    /// Fetches allowed to run at once across all packages
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30 * 60),
            max_concurrent: 2,
        }
    }
}

/// How a single download task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Package moved to `downloaded`
    Downloaded,
    /// Package was no longer `created`; nothing changed
    Skipped,
    /// Fetch failed or timed out; package left as it was
    Failed,
}

/// Cloneable handle to the lifecycle engine
#[derive(Clone)]
pub struct PackageEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    db: Database,
    fetcher: Arc<dyn Fetcher>,
    in_flight: InFlight,
    permits: Semaphore,
    tracker: TaskTracker,
    fetch_timeout: Duration,
    counters: DownloadCounters,
    accepting: AtomicBool,
}

impl PackageEngine {
    pub fn new(db: Database, fetcher: Arc<dyn Fetcher>, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                db,
                fetcher,
                in_flight: InFlight::new(),
                permits: Semaphore::new(config.max_concurrent.max(1)),
                tracker: TaskTracker::new(),
                fetch_timeout: config.fetch_timeout,
                counters: DownloadCounters::default(),
                accepting: AtomicBool::new(true),
            }),
        }
    }

    /// Register a new package in the `created` state
    ///
    /// Does not start a download.
    pub async fn register(&self, name: String, version: String) -> Result<Package> {
        let package = self
            .inner
            .db
            .run(move |conn| {
                let mut package = Package::new(name, version);
                package.insert(conn)?;
                Ok(package)
            })
            .await?;

        info!(
            "Registered package {} {} as id {}",
            package.name,
            package.version,
            package.id.unwrap_or_default()
        );
        Ok(package)
    }

    pub async fn get(&self, id: i64) -> Result<Package> {
        self.inner
            .db
            .run(move |conn| Package::find_by_id(conn, id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("package {id}")))
    }

    /// All packages in registration order
    pub async fn list(&self) -> Result<Vec<Package>> {
        self.inner.db.run(Package::list_all).await
    }

    /// Schedule a download for a `created` package and return its status
    ///
    /// Returns immediately. Calling this again while a download for the same
    /// package is running schedules nothing.
    pub async fn request_download(&self, id: i64) -> Result<PackageStatus> {
        let package = self.get(id).await?;
        if package.status != PackageStatus::Created {
            debug!("Package {} is {}, not scheduling download", id, package.status);
            return Ok(package.status);
        }

        if !self.inner.accepting.load(Ordering::Acquire) {
            warn!("Shutting down, not scheduling download for package {}", id);
            return Ok(package.status);
        }

        let Some(guard) = self.inner.in_flight.try_claim(id) else {
            debug!("Download for package {} already in flight", id);
            return Ok(package.status);
        };

        self.inner.counters.record_scheduled();
        info!(
            package_id = id,
            name = %package.name,
            version = %package.version,
            "Scheduling download"
        );

        let engine = self.clone();
        self.inner.tracker.spawn(async move {
            let _guard = guard;
            engine.download_task(id).await;
        });

        Ok(package.status)
    }

    /// Body of a background download
    ///
    /// Re-reads the package, fetches it, and moves it `created` ->
    /// `downloaded`. Failures are logged and counted, never returned.
    /// `request_download` is the normal entry point; calling this directly
    /// bypasses the in-flight set.
    pub async fn download_task(&self, id: i64) -> DownloadOutcome {
        let outcome = match self.inner.permits.acquire().await {
            Ok(_permit) => match self.try_download(id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(package_id = id, "Download failed: {}", e);
                    DownloadOutcome::Failed
                }
            },
            Err(e) => {
                error!(package_id = id, "Download permit unavailable: {}", e);
                DownloadOutcome::Failed
            }
        };

        match outcome {
            DownloadOutcome::Downloaded => self.inner.counters.record_succeeded(),
            DownloadOutcome::Skipped => self.inner.counters.record_skipped(),
            DownloadOutcome::Failed => self.inner.counters.record_failed(),
        }
        outcome
    }

    async fn try_download(&self, id: i64) -> Result<DownloadOutcome> {
        let package = self.get(id).await?;
        if package.status != PackageStatus::Created {
            debug!("Package {} already {}, skipping fetch", id, package.status);
            return Ok(DownloadOutcome::Skipped);
        }

        info!(
            "Downloading {}~{} via {}...",
            package.name,
            package.version,
            self.inner.fetcher.name()
        );
        let fetch = self.inner.fetcher.fetch(&package.name, &package.version);
        let report = tokio::time::timeout(self.inner.fetch_timeout, fetch)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "{}~{} after {} seconds",
                    package.name,
                    package.version,
                    self.inner.fetch_timeout.as_secs()
                ))
            })??;
        if let Some(path) = &report.store_path {
            debug!("Package {} built at {}", id, path);
        }

        let moved = self
            .inner
            .db
            .run(move |conn| {
                Package::transition(conn, id, PackageStatus::Created, PackageStatus::Downloaded)
            })
            .await?;

        if moved {
            info!("Package {} downloaded", id);
            Ok(DownloadOutcome::Downloaded)
        } else {
            debug!("Package {} changed state during fetch, leaving it", id);
            Ok(DownloadOutcome::Skipped)
        }
    }

    /// Move a `downloaded` package to `activated`
    ///
    /// Fails with [`Error::Precondition`] from any other state, including
    /// `activated`, and when the package does not exist.
    pub async fn activate(&self, id: i64) -> Result<PackageStatus> {
        let moved = self
            .inner
            .db
            .run(move |conn| {
                Package::transition(conn, id, PackageStatus::Downloaded, PackageStatus::Activated)
            })
            .await?;

        if moved {
            info!("Package {} activated", id);
            Ok(PackageStatus::Activated)
        } else {
            Err(Error::Precondition(format!(
                "package {id} does not exist or is not in the downloaded state"
            )))
        }
    }

    /// Whether a download for `id` is running right now
    pub fn is_downloading(&self, id: i64) -> bool {
        self.inner.in_flight.contains(id)
    }

    pub fn stats(&self) -> DownloadStats {
        self.inner.counters.snapshot(self.inner.in_flight.len())
    }

    /// Wait until no download is running
    ///
    /// Leaves the tracker open, so it never races [`PackageEngine::shutdown`].
    pub async fn wait_for_downloads(&self) {
        while !self.inner.tracker.is_empty() {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    /// Stop scheduling downloads and wait for running ones
    pub async fn shutdown(&self) {
        self.inner.accepting.store(false, Ordering::Release);
        let running = self.inner.tracker.len();
        if running > 0 {
            info!("Waiting for {} download(s) to finish", running);
        }
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}
