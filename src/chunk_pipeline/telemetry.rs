//! Populate-stage counters.
//!
//! Each chunk that passes through populate bumps `total` and exactly one of the
//! three source counters. The counters only ever grow and can be read from any
//! thread while the worker runs.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Where a chunk's blocks came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PopulateSource {
    /// Taken from the in-memory chunk cache.
    Cache,
    /// Read from the region file.
    Disk,
    /// Produced by the terrain generator.
    Generated,
}

/// Lock-free populate counters shared between the host and the worker.
#[derive(Debug, Default)]
pub struct PipelineTelemetry {
    total: AtomicU64,
    from_cache: AtomicU64,
    from_disk: AtomicU64,
    generated: AtomicU64,
}

impl PipelineTelemetry {
    /// Counts one populated chunk.
    pub fn record(&self, source: PopulateSource) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match source {
            PopulateSource::Cache => &self.from_cache,
            PopulateSource::Disk => &self.from_disk,
            PopulateSource::Generated => &self.generated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters at once.
    ///
    /// Taken while the worker runs, `total` may briefly lead the sum of the
    /// source counters by the chunk being recorded.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            total: self.total.load(Ordering::Relaxed),
            from_cache: self.from_cache.load(Ordering::Relaxed),
            from_disk: self.from_disk.load(Ordering::Relaxed),
            generated: self.generated.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`PipelineTelemetry`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    /// Chunks populated so far.
    pub total: u64,
    /// Of those, served by the cache.
    pub from_cache: u64,
    /// Of those, read from the region file.
    pub from_disk: u64,
    /// Of those, freshly generated.
    pub generated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_record_counts_once_in_total() {
        let telemetry = PipelineTelemetry::default();
        telemetry.record(PopulateSource::Generated);
        telemetry.record(PopulateSource::Generated);
        telemetry.record(PopulateSource::Cache);
        telemetry.record(PopulateSource::Disk);

        let snapshot = telemetry.snapshot();
        assert_eq!(
            snapshot,
            TelemetrySnapshot {
                total: 4,
                from_cache: 1,
                from_disk: 1,
                generated: 2,
            }
        );
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"total":4,"from_cache":1,"from_disk":1,"generated":2}"#
        );
    }
}
