//! # Error Module
//!
//! Every fallible operation in the crate reports a [`StreamError`]. The variants
//! fall into three families:
//!
//! * **Addressing** (`OutOfRegion`, `BlockOutOfGrid`) - the caller asked for a
//!   position that cannot exist. These are bugs and are never retried.
//! * **Not found** (`RegionNotFound`) - the region file is missing; the caller
//!   decides whether to create a fresh region.
//! * **I/O** (`Io`) - a transient read or write failure, surfaced as-is.
//!
//! The remaining variants cover misuse of a component's lifecycle.

use std::path::PathBuf;

use cgmath::Point3;
use thiserror::Error;

/// Errors produced by the chunk streaming core.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A chunk position lies outside the inclusive bounds of the region store.
    #[error("chunk {pos:?} lies outside region bounds {min:?}..={max:?}")]
    OutOfRegion {
        /// The offending chunk position.
        pos: Point3<i32>,
        /// Inclusive lower corner of the region.
        min: Point3<i32>,
        /// Inclusive upper corner of the region.
        max: Point3<i32>,
    },

    /// A local block position lies outside the chunk grid.
    #[error("block position {0:?} is outside the chunk grid")]
    BlockOutOfGrid(Point3<i32>),

    /// The region file does not exist.
    #[error("region file {} does not exist", .0.display())]
    RegionNotFound(PathBuf),

    /// A read or write was attempted while no region file is open.
    #[error("region store is not open")]
    RegionClosed,

    /// An LRU cache was requested with zero capacity.
    #[error("cache capacity must be at least one entry")]
    ZeroCapacity,

    /// The chunk has no block grid yet.
    #[error("chunk {0:?} is not populated")]
    Unpopulated(Point3<i32>),

    /// No live chunk exists at the position.
    #[error("no chunk is loaded at {0:?}")]
    ChunkNotLoaded(Point3<i32>),

    /// The operation needs exclusive access to the pipeline stages while the
    /// background worker owns them.
    #[error("pipeline worker is running")]
    PipelineRunning,

    /// The background worker panicked before it could be joined.
    #[error("pipeline worker panicked")]
    WorkerPanicked,

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Underlying file I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Returns true for errors that indicate a caller bug rather than a runtime condition.
    pub fn is_addressing(&self) -> bool {
        matches!(
            self,
            StreamError::OutOfRegion { .. } | StreamError::BlockOutOfGrid(_)
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StreamError>;
