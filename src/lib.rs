#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Stream
//!
//! The chunk streaming core of a voxel world: it generates, caches, persists
//! and meshes cube-shaped chunks of blocks on demand, and hands finished
//! geometry to a host renderer.
//!
//! ## Key Modules
//!
//! * `core` - Shared handles and the write-back LRU cache
//! * `voxels` - Blocks, chunks, terrain generation, region files and the `World`
//! * `meshing` - Face-culling mesh construction
//! * `chunk_pipeline` - The persist/populate/build queues and their worker
//! * `config` - Static world settings
//!
//! ## Data Flow
//!
//! 1. The host asks the `World` to load around a chunk position
//! 2. New chunks go to the pipeline, which fills them from the cache, the
//!    region file or the terrain generator
//! 3. Populated chunks are meshed and queued for the host
//! 4. Edits mark chunks dirty; the host rebuilds those meshes itself
//! 5. Pruned chunks go back through the cache, whose evictions land on disk
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Point3;
//! use voxel_stream::config::WorldConfig;
//! use voxel_stream::voxels::world::World;
//!
//! let mut world = World::new(WorldConfig::default()).unwrap();
//! world.cold_start(Point3::new(0, 4, 0)).unwrap();
//! world.start();
//!
//! // Once per frame:
//! world.load_around(Point3::new(0, 4, 0));
//! world.prune(Point3::new(0, 4, 0));
//! while let Some(mesh) = world.take_completed_mesh() {
//!     // attach mesh.opaque / mesh.translucent to the scene
//! #   let _ = mesh;
//! }
//! for mesh in world.rebuild_dirty_meshes() {
//!     // replace the chunk's geometry
//! #   let _ = mesh;
//! }
//! ```

use std::thread;
use std::time::Duration;

use cgmath::Point3;
use log::{error, info};
use web_time::Instant;

use config::WorldConfig;
use voxels::chunk::{chunk_pos_of, CHUNK_DIMENSION};
use voxels::world::World;

pub mod chunk_pipeline;
pub mod config;
pub mod core;
pub mod error;
pub mod meshing;
pub mod voxels;

pub use error::{Result, StreamError};

/// Number of chunks the headless demo walks along +x.
const DEMO_WALK_STEPS: i32 = 6;

/// Runs the headless streaming demo.
///
/// Reads a JSON [`WorldConfig`] from the path given as the first argument, or
/// uses the defaults, then cold-starts a world at the spawn column, walks the
/// load centre along +x with the background worker running, digs a few blocks
/// and saves.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match WorldConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("Failed to load config {path}: {err}");
                std::process::exit(1);
            }
        },
        None => WorldConfig::default(),
    };

    if let Err(err) = run_demo(config) {
        error!("Demo failed: {err}");
        std::process::exit(1);
    }
}

fn run_demo(config: WorldConfig) -> Result<()> {
    let stopwatch = Instant::now();
    let mut world = World::new(config)?;

    let surface = world.generator().surface_height(0, 0);
    let spawn = chunk_pos_of(Point3::new(0, surface, 0));
    let loaded = world.cold_start(spawn)?;
    let meshes = world.drain_completed_meshes();
    info!(
        "Cold start: {loaded} chunks, {} meshes, {} opaque faces in {:?}",
        meshes.len(),
        meshes.iter().map(|mesh| mesh.opaque.face_count()).sum::<usize>(),
        stopwatch.elapsed()
    );

    world.start();
    for step in 1..=DEMO_WALK_STEPS {
        let center = spawn + cgmath::Vector3::new(step, 0, 0);
        let enqueued = world.load_around(center);
        let pruned = world.prune(center);

        let mut received = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        while received < enqueued && Instant::now() < deadline {
            match world.take_completed_mesh() {
                Some(_) => received += 1,
                None => thread::sleep(Duration::from_millis(2)),
            }
        }
        info!("Step {step}: +{enqueued} chunks, -{pruned} chunks, {received} meshes received");
    }

    let dig_site = spawn + cgmath::Vector3::new(DEMO_WALK_STEPS, 0, 0);
    let local = Point3::new(
        CHUNK_DIMENSION / 2,
        surface.rem_euclid(CHUNK_DIMENSION),
        CHUNK_DIMENSION / 2,
    );
    for _ in 0..4 {
        match world.damage_block(dig_site, local) {
            Ok(outcome) => info!("Hit block {local:?} in chunk {dig_site:?}: {outcome:?}"),
            Err(err) => error!("Could not hit block {local:?} in chunk {dig_site:?}: {err}"),
        }
    }
    info!("Rebuilt {} dirty meshes", world.rebuild_dirty_meshes().len());

    world.stop()?;
    let telemetry = world.telemetry();
    match serde_json::to_string(&telemetry) {
        Ok(json) => info!("Pipeline telemetry: {json}"),
        Err(err) => error!("Failed to encode telemetry: {err}"),
    }

    world.shutdown()?;
    info!("Demo finished in {:?}", stopwatch.elapsed());
    Ok(())
}
