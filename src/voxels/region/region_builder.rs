//! # Region Pre-fill
//!
//! Generates terrain for every chunk position of a region box and writes it to
//! a fresh region file, so a world can start with its whole neighborhood
//! already on disk instead of generating on demand.
//!
//! [`spawn_region_build`] runs the same work on a background thread and exposes
//! progress counters the host can poll.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cgmath::Point3;
use log::{debug, info};
use web_time::Instant;

use super::{RegionBounds, RegionStore};
use crate::error::{Result, StreamError};
use crate::voxels::terrain::TerrainGenerator;

/// Progress of a region build, shared with the thread doing the work.
#[derive(Debug, Default)]
pub struct RegionBuildProgress {
    created: AtomicUsize,
    total: AtomicUsize,
}

impl RegionBuildProgress {
    /// Number of chunk records written so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of chunk records the build will write; zero until the file exists.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Fraction of the build that is done, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.created() as f32 / total as f32,
        }
    }
}

/// Creates a region file at `path` covering `[min, max]` and fills every record
/// with generated terrain.
///
/// # Returns
/// The number of chunk records written.
pub fn build_region(
    path: impl AsRef<Path>,
    min: Point3<i32>,
    max: Point3<i32>,
    generator: &TerrainGenerator,
) -> Result<usize> {
    build_region_with_progress(path.as_ref(), min, max, generator, &RegionBuildProgress::default())
}

fn build_region_with_progress(
    path: &Path,
    min: Point3<i32>,
    max: Point3<i32>,
    generator: &TerrainGenerator,
    progress: &RegionBuildProgress,
) -> Result<usize> {
    let start = Instant::now();
    let mut store = RegionStore::new();
    store.create(path, min, max)?;

    let bounds = RegionBounds { min, max };
    progress
        .total
        .store(bounds.volume() as usize, Ordering::Relaxed);

    for position in bounds.positions() {
        let grid = generator.generate(position);
        store.write_chunk(position, &grid)?;
        let created = progress.created.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Pre-filled chunk {position:?} ({created}/{})", progress.total());
    }

    store.sync()?;
    store.close();

    info!(
        "Pre-filled region {} with {} chunks in {:?}",
        path.display(),
        progress.created(),
        start.elapsed()
    );
    Ok(progress.created())
}

/// A region build running on its own thread.
pub struct RegionBuild {
    progress: Arc<RegionBuildProgress>,
    worker: JoinHandle<Result<usize>>,
}

impl RegionBuild {
    /// Live progress counters of the build.
    pub fn progress(&self) -> &RegionBuildProgress {
        &self.progress
    }

    /// Returns true once the build thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the build and returns the number of records written.
    pub fn join(self) -> Result<usize> {
        self.worker.join().map_err(|_| StreamError::WorkerPanicked)?
    }
}

/// Starts [`build_region`] on a background thread.
pub fn spawn_region_build(
    path: impl Into<PathBuf>,
    min: Point3<i32>,
    max: Point3<i32>,
    generator: TerrainGenerator,
) -> RegionBuild {
    let path = path.into();
    let progress = Arc::new(RegionBuildProgress::default());
    let shared = progress.clone();

    let worker = thread::spawn(move || {
        build_region_with_progress(&path, min, max, &generator, &shared)
    });

    RegionBuild { progress, worker }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_record_matches_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefill.region");
        let generator = TerrainGenerator::new(4);
        let min = Point3::new(-1, 0, 0);
        let max = Point3::new(0, 1, 1);

        let written = build_region(&path, min, max, &generator).unwrap();
        assert_eq!(written, 8);

        let mut store = RegionStore::new();
        store.open(&path).unwrap();
        for position in (RegionBounds { min, max }).positions() {
            let stored = store.read_chunk(position).unwrap();
            assert!(stored.iter().eq(generator.generate(position).iter()));
        }
    }

    #[test]
    fn background_build_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let build = spawn_region_build(
            dir.path().join("prefill.region"),
            Point3::new(0, 0, 0),
            Point3::new(1, 0, 1),
            TerrainGenerator::new(0),
        );
        let progress = build.progress.clone();

        assert_eq!(build.join().unwrap(), 4);
        assert_eq!(progress.created(), 4);
        assert_eq!(progress.total(), 4);
        assert_eq!(progress.fraction(), 1.0);
    }
}
