//! # Chunk Pipeline
//!
//! Moves chunks through three stages fed by FIFO queues:
//!
//! ```text
//!  enqueue ──► populate ──► build ──► completed-mesh ──► host
//!                 ▲
//!  request_persist ──► persist ──► LRU cache ──(evict)──► region store
//! ```
//!
//! - **persist** copies a chunk's grid into the LRU cache. It is the only stage
//!   that inserts into the cache, so it is the only one that can trigger
//!   write-back to the region store.
//! - **populate** fills an unpopulated chunk from the cache, the region store
//!   or the terrain generator, in that order, then forwards it to build.
//! - **build** meshes the chunk and publishes the result on the completed-mesh
//!   queue, which the host drains at its own pace.
//!
//! ## Execution modes
//!
//! The stage state ([`StageContext`]) plus the consuming ends of the queues live
//! in one `PipelineCore`. [`ChunkPipeline::start`] moves the core into a worker
//! thread; [`ChunkPipeline::stop`] joins the thread and takes the core back.
//! While the core is home, [`ChunkPipeline::pump_once`] runs one drain pass on
//! the calling thread. Since only one side ever owns the core, the synchronous
//! and asynchronous modes cannot race.
//!
//! A drain pass works through the populate items queued when it began, then
//! the build items, and empties the persist queue before each item. An idle
//! worker blocks on a wake channel rather than spinning.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cgmath::Point3;
use log::{error, info, trace, warn};

use crate::core::MtResource;
use crate::error::{Result, StreamError};
use crate::meshing::{ChunkMesh, MeshBuilder, TextureAtlas};
use crate::voxels::chunk::Chunk;
use crate::voxels::region::RegionStore;
use crate::voxels::terrain::TerrainGenerator;

pub mod stages;
pub mod telemetry;

pub use stages::StageContext;
pub use telemetry::{PipelineTelemetry, PopulateSource, TelemetrySnapshot};

/// How long an idle worker waits for a wake-up before polling the queues anyway.
const IDLE_WAIT: Duration = Duration::from_millis(50);

type ChunkQueue = Receiver<MtResource<Chunk>>;

/// The consuming ends of the queues and the stage state.
struct PipelineCore {
    persist_rx: ChunkQueue,
    populate_rx: ChunkQueue,
    build_rx: ChunkQueue,
    build_tx: Sender<MtResource<Chunk>>,
    completed_tx: Sender<ChunkMesh>,
    wake_rx: Receiver<()>,
    stages: StageContext,
}

impl PipelineCore {
    /// Runs one full drain pass.
    ///
    /// Populate works through the items queued when the pass began; build
    /// through the items queued once populate is done, including those it
    /// just forwarded. The persist queue is emptied before every single item,
    /// so a grid persisted ahead of a reload of the same position is always
    /// cached before that reload looks it up.
    ///
    /// # Returns
    /// `true` if any queue had work.
    fn drain_pass(&mut self) -> bool {
        let mut worked = self.drain_persist();

        let populate: Vec<MtResource<Chunk>> = self.populate_rx.try_iter().collect();
        for chunk in populate {
            worked = true;
            self.drain_persist();
            let stages = &mut self.stages;
            guarded("populate", &chunk, || {
                stages.populate(&chunk);
            });
            if self.build_tx.send(chunk).is_err() {
                error!("Build queue closed; dropping populated chunk");
            }
        }

        let build: Vec<MtResource<Chunk>> = self.build_rx.try_iter().collect();
        for chunk in build {
            worked = true;
            self.drain_persist();
            let stages = &self.stages;
            let completed_tx = &self.completed_tx;
            guarded("build", &chunk, || match stages.build(&chunk) {
                Ok(mesh) => {
                    // The host may have dropped the pipeline's receiving end.
                    let _ = completed_tx.send(mesh);
                }
                Err(err) => error!("Failed to build chunk {:?}: {err}", position_of(&chunk)),
            });
        }

        worked |= self.drain_persist();
        if worked {
            trace!("Drain pass done ({} chunks cached)", self.stages.cached_len());
        }
        worked
    }

    fn drain_persist(&mut self) -> bool {
        let mut worked = false;
        while let Ok(chunk) = self.persist_rx.try_recv() {
            worked = true;
            let stages = &mut self.stages;
            guarded("persist", &chunk, || stages.persist(&chunk));
        }
        worked
    }

    /// Blocks until something is enqueued, the pipeline is stopped or
    /// `IDLE_WAIT` passes.
    fn wait_for_work(&self) {
        match self.wake_rx.recv_timeout(IDLE_WAIT) {
            Ok(()) => while self.wake_rx.try_recv().is_ok() {},
            Err(RecvTimeoutError::Timeout) => {}
            // Every sender is gone; the stop flag ends the loop shortly.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(IDLE_WAIT),
        }
    }

    fn run(mut self: Box<Self>, running: Arc<AtomicBool>) -> Box<Self> {
        info!("Chunk pipeline worker started");
        while running.load(Ordering::Acquire) {
            if !self.drain_pass() {
                self.wait_for_work();
            }
        }
        info!("Chunk pipeline worker stopped");
        self
    }
}

fn position_of(chunk: &MtResource<Chunk>) -> Point3<i32> {
    chunk.get().position
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Runs one stage item, containing a panic to that item.
fn guarded(stage: &str, chunk: &MtResource<Chunk>, work: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(work)) {
        error!(
            "{stage} stage panicked on chunk {:?}: {}",
            position_of(chunk),
            panic_message(payload.as_ref())
        );
    }
}

/// The host-facing side of the pipeline.
pub struct ChunkPipeline {
    persist_tx: Sender<MtResource<Chunk>>,
    populate_tx: Sender<MtResource<Chunk>>,
    build_tx: Sender<MtResource<Chunk>>,
    completed_rx: Receiver<ChunkMesh>,
    wake_tx: Sender<()>,
    running: Arc<AtomicBool>,
    telemetry: Arc<PipelineTelemetry>,
    /// Present while stopped.
    core: Option<Box<PipelineCore>>,
    /// Present while started.
    worker: Option<JoinHandle<Box<PipelineCore>>>,
}

impl ChunkPipeline {
    /// Creates a stopped pipeline.
    ///
    /// # Arguments
    /// * `cache_capacity` - Number of chunk grids the LRU cache holds
    /// * `region` - Region store for disk reads and write-back, if persistence is enabled
    /// * `generator` - Terrain source for chunks found nowhere else
    /// * `atlas` - UV lookup used by the build stage
    ///
    /// # Errors
    /// `ZeroCapacity` when `cache_capacity` is zero.
    pub fn new(
        cache_capacity: usize,
        region: Option<MtResource<RegionStore>>,
        generator: Arc<TerrainGenerator>,
        atlas: Arc<dyn TextureAtlas>,
    ) -> Result<Self> {
        let telemetry = Arc::new(PipelineTelemetry::default());
        let stages = StageContext::new(
            cache_capacity,
            region,
            generator,
            MeshBuilder::new(atlas),
            telemetry.clone(),
        )?;

        let (persist_tx, persist_rx) = channel();
        let (populate_tx, populate_rx) = channel();
        let (build_tx, build_rx) = channel();
        let (completed_tx, completed_rx) = channel();
        let (wake_tx, wake_rx) = channel();

        let core = PipelineCore {
            persist_rx,
            populate_rx,
            build_rx,
            build_tx: build_tx.clone(),
            completed_tx,
            wake_rx,
            stages,
        };

        Ok(ChunkPipeline {
            persist_tx,
            populate_tx,
            build_tx,
            completed_rx,
            wake_tx,
            running: Arc::new(AtomicBool::new(false)),
            telemetry,
            core: Some(Box::new(core)),
            worker: None,
        })
    }

    fn wake(&self) {
        // Fails only once the core is gone, which `stop` already reports.
        let _ = self.wake_tx.send(());
    }

    /// Hands a chunk to the pipeline: to populate if it has no blocks yet,
    /// straight to build otherwise.
    pub fn enqueue(&self, chunk: MtResource<Chunk>) {
        let populated = chunk.get().is_populated();
        let queue = if populated {
            &self.build_tx
        } else {
            &self.populate_tx
        };
        if queue.send(chunk).is_err() {
            error!("Pipeline queues are closed; chunk dropped");
        }
        self.wake();
    }

    /// Hands a chunk to the persist stage, which copies its grid into the cache.
    pub fn request_persist(&self, chunk: MtResource<Chunk>) {
        if self.persist_tx.send(chunk).is_err() {
            error!("Pipeline queues are closed; chunk not persisted");
        }
        self.wake();
    }

    /// Starts the background worker. Does nothing if it is already running.
    pub fn start(&mut self) {
        let Some(core) = self.core.take() else {
            if self.worker.is_none() {
                error!("Cannot start pipeline: its stages were lost to a worker panic");
            }
            return;
        };

        self.running.store(true, Ordering::Release);
        let running = self.running.clone();
        self.worker = Some(thread::spawn(move || core.run(running)));
    }

    /// Stops the background worker and waits for it to finish its current pass.
    ///
    /// No queue is consumed after this returns. Does nothing if the worker is
    /// not running.
    ///
    /// # Errors
    /// `WorkerPanicked` if the worker thread died; the pipeline cannot run
    /// again afterwards.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.running.store(false, Ordering::Release);
        self.wake();
        match worker.join() {
            Ok(core) => {
                self.core = Some(core);
                Ok(())
            }
            Err(_) => Err(StreamError::WorkerPanicked),
        }
    }

    /// Whether the background worker owns the stages right now.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Pops the next finished mesh, if any, without blocking.
    pub fn try_take_completed_mesh(&self) -> Option<ChunkMesh> {
        self.completed_rx.try_recv().ok()
    }

    /// Runs one drain pass on the calling thread.
    ///
    /// # Returns
    /// `true` if any work was done. Always `false` while the worker runs.
    pub fn pump_once(&mut self) -> bool {
        match self.core.as_mut() {
            Some(core) => core.drain_pass(),
            None => {
                warn!("pump_once called while the pipeline worker owns the stages");
                false
            }
        }
    }

    /// Pumps until every queue is empty.
    ///
    /// # Returns
    /// The number of passes that did work.
    pub fn pump_until_idle(&mut self) -> usize {
        let mut passes = 0;
        while self.pump_once() {
            passes += 1;
        }
        passes
    }

    /// Drains pending work, then writes every cached grid to the region store.
    ///
    /// # Errors
    /// `PipelineRunning` while the worker runs; stop it first.
    pub fn flush(&mut self) -> Result<()> {
        let core = self.core.as_mut().ok_or(StreamError::PipelineRunning)?;
        while core.drain_pass() {}
        core.stages.flush()
    }

    /// Current populate counters.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }
}

impl Drop for ChunkPipeline {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            error!("Chunk pipeline shut down uncleanly: {err}");
        }
    }
}
