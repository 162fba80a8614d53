//! # World Module
//!
//! This module provides the `World` struct, the host's single entry point into
//! chunk streaming. It owns the live chunk map, the dirty set and the chunk
//! pipeline, and exposes the edit API used by gameplay.
//!
//! ## Ownership
//!
//! The live map ([`WorldData`]) is an arena keyed by chunk position. Chunks
//! point back at it through a weak [`WorldHandle`] only, so dropping the world
//! frees every chunk even while chunks still reference it.
//!
//! ## Locking
//!
//! A chunk lock may be held while the world lock is taken (edits mark dirty
//! chunks that way), never the reverse. Code that needs a chunk out of the map
//! clones its handle under the world lock and locks the chunk afterwards.
//!
//! ## Streaming
//!
//! Each frame the host typically calls [`World::load_around`] and
//! [`World::prune`] with the player's chunk, then drains
//! [`World::take_completed_mesh`] and [`World::rebuild_dirty_meshes`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use cgmath::{MetricSpace, Point3};
use log::{debug, info, trace, warn};

use crate::chunk_pipeline::{ChunkPipeline, TelemetrySnapshot};
use crate::config::WorldConfig;
use crate::core::{MtHandle, MtResource};
use crate::error::{Result, StreamError};
use crate::meshing::{ChunkMesh, MeshBuilder, TextureAtlas, TileAtlas};
use crate::voxels::block::block_overlay::BlockOverlay;
use crate::voxels::block::block_side::BlockSide;
use crate::voxels::block::block_type::BlockType;
use crate::voxels::block::Block;
use crate::voxels::chunk::{resolve_local, Chunk, CHUNK_DIMENSION};
use crate::voxels::region::RegionStore;
use crate::voxels::terrain::{TerrainGenerator, MAX_HEIGHT};

/// Highest chunk layer the streaming flood reaches.
pub const MAX_CHUNK_Y: i32 = MAX_HEIGHT / CHUNK_DIMENSION + 1;

/// The live chunks of a world and which of them need a new mesh.
#[derive(Default)]
pub struct WorldData {
    chunks: HashMap<Point3<i32>, MtResource<Chunk>>,
    dirty: HashSet<Point3<i32>>,
}

impl WorldData {
    /// A handle to the live chunk at `position`.
    pub fn chunk_at(&self, position: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.chunks.get(&position).cloned()
    }

    /// Returns true if a chunk is live at `position`.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        self.chunks.contains_key(&position)
    }

    /// Number of live chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if no chunk is live.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Positions of all live chunks, in no particular order.
    pub fn positions(&self) -> impl Iterator<Item = Point3<i32>> + '_ {
        self.chunks.keys().copied()
    }

    /// Inserts `chunk` unless its position is already live.
    ///
    /// # Returns
    /// `false` if another chunk already holds the position.
    fn insert(&mut self, position: Point3<i32>, chunk: MtResource<Chunk>) -> bool {
        if self.chunks.contains_key(&position) {
            return false;
        }
        self.chunks.insert(position, chunk);
        true
    }

    /// Removes a chunk and forgets that it was dirty.
    fn remove(&mut self, position: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.dirty.remove(&position);
        self.chunks.remove(&position)
    }

    /// Marks the live chunks among `positions` dirty; the rest are ignored.
    pub fn mark_dirty(&mut self, positions: &[Point3<i32>]) {
        for position in positions {
            if self.chunks.contains_key(position) {
                self.dirty.insert(*position);
            }
        }
    }

    /// Returns true if the chunk at `position` awaits a mesh rebuild.
    pub fn is_dirty(&self, position: Point3<i32>) -> bool {
        self.dirty.contains(&position)
    }

    /// Empties the dirty set, returning what it held.
    pub fn take_dirty(&mut self) -> Vec<Point3<i32>> {
        self.dirty.drain().collect()
    }
}

/// A chunk's weak link back to the world that owns it.
pub type WorldHandle = MtHandle<WorldData>;

impl MtHandle<WorldData> {
    /// Marks chunks dirty in the world behind this handle, if it still exists.
    pub fn mark_dirty(&self, positions: &[Point3<i32>]) {
        if let Some(world) = self.upgrade() {
            world.get_mut().mark_dirty(positions);
        }
    }
}

/// What a hit did to a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockDamage {
    /// The block cannot be damaged (air, water, bedrock).
    Unaffected,
    /// The block took a crack and now shows this stage.
    Cracked(BlockOverlay),
    /// The block broke and is now air.
    Destroyed,
}

/// The crack stage at which a hit destroys a block, if it can be destroyed.
fn breaking_stage(block_type: BlockType) -> Option<BlockOverlay> {
    match block_type {
        BlockType::DIRT | BlockType::GRASS => Some(BlockOverlay::CRACK2),
        BlockType::STONE | BlockType::REDSTONE | BlockType::DIAMOND => Some(BlockOverlay::CRACK3),
        BlockType::AIR | BlockType::WATER | BlockType::BEDROCK => None,
    }
}

/// A streamed voxel world.
pub struct World {
    config: WorldConfig,
    generator: Arc<TerrainGenerator>,
    region: Option<MtResource<RegionStore>>,
    pipeline: ChunkPipeline,
    mesh_builder: MeshBuilder,
    data: MtResource<WorldData>,
}

impl World {
    /// Creates a world with the default tile atlas.
    pub fn new(config: WorldConfig) -> Result<Self> {
        Self::with_atlas(config, Arc::new(TileAtlas))
    }

    /// Creates a world whose meshes use `atlas` for UVs.
    ///
    /// Opens the configured region file, creating it with the configured bounds
    /// if it does not exist yet. The pipeline starts stopped.
    ///
    /// # Errors
    /// Region I/O failures and `ZeroCapacity` (never produced by
    /// [`WorldConfig::cache_capacity`]).
    pub fn with_atlas(config: WorldConfig, atlas: Arc<dyn TextureAtlas>) -> Result<Self> {
        let region = match config.region_path.as_ref() {
            Some(path) => {
                let mut store = RegionStore::new();
                store.open_or_create(path, config.region_min(), config.region_max())?;
                Some(MtResource::new(store))
            }
            None => None,
        };

        let generator = Arc::new(TerrainGenerator::new(config.seed));
        let pipeline = ChunkPipeline::new(
            config.cache_capacity(),
            region.clone(),
            generator.clone(),
            atlas.clone(),
        )?;

        info!(
            "Created world (seed {}, build radius {}, unload radius {}, cache {} chunks)",
            config.seed,
            config.build_radius,
            config.unload_radius,
            config.cache_capacity()
        );

        Ok(World {
            config,
            generator,
            region,
            pipeline,
            mesh_builder: MeshBuilder::new(atlas),
            data: MtResource::new(WorldData::default()),
        })
    }

    /// The settings the world was created with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The terrain generator shared with the pipeline.
    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// A weak handle to the live map, as held by every chunk.
    pub fn handle(&self) -> WorldHandle {
        self.data.downgrade()
    }

    /// A handle to the live chunk at `position`.
    pub fn chunk_at(&self, position: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.data.get().chunk_at(position)
    }

    /// Number of live chunks.
    pub fn chunk_count(&self) -> usize {
        self.data.get().len()
    }

    /// Returns true if the chunk at `position` awaits a mesh rebuild.
    pub fn is_dirty(&self, position: Point3<i32>) -> bool {
        self.data.get().is_dirty(position)
    }

    /// Populate counters of the pipeline.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.pipeline.telemetry()
    }

    /// Creates a chunk at `position` if none is live there and hands it to
    /// the pipeline.
    ///
    /// # Returns
    /// `false` if the position was already live.
    pub fn enqueue_position(&self, position: Point3<i32>) -> bool {
        let chunk = MtResource::new(Chunk::new(position, self.handle()));
        if !self.data.get_mut().insert(position, chunk.clone()) {
            return false;
        }
        self.pipeline.enqueue(chunk);
        true
    }

    /// Enqueues every missing chunk within `build_radius` axis steps of
    /// `center`, nearest first.
    ///
    /// The flood never goes below chunk layer 0 nor above [`MAX_CHUNK_Y`].
    ///
    /// # Returns
    /// The number of chunks enqueued.
    pub fn load_around(&self, center: Point3<i32>) -> usize {
        let radius = self.config.build_radius.max(0);
        let in_band = |position: Point3<i32>| (0..=MAX_CHUNK_Y).contains(&position.y);

        let mut fresh = Vec::new();
        {
            let mut data = self.data.get_mut();
            let mut visited = HashSet::new();
            let mut frontier = VecDeque::new();
            if in_band(center) {
                visited.insert(center);
                frontier.push_back((center, radius));
            }

            while let Some((position, depth)) = frontier.pop_front() {
                if !data.contains(position) {
                    let chunk = MtResource::new(Chunk::new(position, self.handle()));
                    data.insert(position, chunk.clone());
                    fresh.push(chunk);
                }

                if depth == 0 {
                    continue;
                }
                for side in BlockSide::all() {
                    let next = position + side.offset();
                    if in_band(next) && visited.insert(next) {
                        frontier.push_back((next, depth - 1));
                    }
                }
            }
        }

        let count = fresh.len();
        for chunk in fresh {
            self.pipeline.enqueue(chunk);
        }
        if count > 0 {
            debug!("Enqueued {count} chunks around {center:?}");
        }
        count
    }

    /// Unloads every chunk whose Euclidean chunk distance from `center` is at
    /// least `unload_radius`. Populated ones are handed to the persist stage.
    ///
    /// # Returns
    /// The number of chunks unloaded.
    pub fn prune(&self, center: Point3<i32>) -> usize {
        let unload_radius = self.config.unload_radius as f64;
        let center = center.cast::<f64>().unwrap_or_else(|| Point3::new(0.0, 0.0, 0.0));

        let removed: Vec<MtResource<Chunk>> = {
            let mut data = self.data.get_mut();
            let far: Vec<Point3<i32>> = data
                .positions()
                .filter(|position| {
                    let position = Point3::new(position.x as f64, position.y as f64, position.z as f64);
                    position.distance(center) >= unload_radius
                })
                .collect();
            far.into_iter().filter_map(|position| data.remove(position)).collect()
        };

        let count = removed.len();
        for chunk in removed {
            if chunk.get().is_populated() {
                self.pipeline.request_persist(chunk);
            }
        }
        if count > 0 {
            debug!("Pruned {count} chunks");
        }
        count
    }

    /// The next finished mesh whose chunk instance is still live.
    ///
    /// Meshes of chunks pruned since they were enqueued are discarded, even
    /// when the position has been reloaded by a newer instance since.
    pub fn take_completed_mesh(&self) -> Option<ChunkMesh> {
        while let Some(mesh) = self.pipeline.try_take_completed_mesh() {
            let live = self
                .chunk_at(mesh.position)
                .map_or(false, |chunk| chunk.get().id() == mesh.chunk_id);
            if live {
                return Some(mesh);
            }
            trace!("Discarded mesh of pruned chunk {:?}", mesh.position);
        }
        None
    }

    /// Takes every mesh [`World::take_completed_mesh`] would return right now.
    pub fn drain_completed_meshes(&self) -> Vec<ChunkMesh> {
        std::iter::from_fn(|| self.take_completed_mesh()).collect()
    }

    /// Rebuilds the mesh of every dirty chunk on the calling thread and clears
    /// the dirty set.
    ///
    /// A chunk that fails to mesh is skipped with a warning; it does not stop
    /// the others.
    pub fn rebuild_dirty_meshes(&self) -> Vec<ChunkMesh> {
        let dirty = self.data.get_mut().take_dirty();
        let mut meshes = Vec::with_capacity(dirty.len());

        for position in dirty {
            let Some(chunk) = self.chunk_at(position) else {
                continue;
            };
            match self.mesh_builder.build_shared(&chunk) {
                Ok(mesh) => meshes.push(mesh),
                Err(err) => warn!("Skipped rebuilding chunk {position:?}: {err}"),
            }
        }

        meshes
    }

    /// Loads the neighborhood of `center` and pumps the pipeline on this
    /// thread until all of it is populated and meshed.
    ///
    /// # Errors
    /// `PipelineRunning` while the background worker runs.
    pub fn cold_start(&mut self, center: Point3<i32>) -> Result<usize> {
        if self.pipeline.is_running() {
            return Err(StreamError::PipelineRunning);
        }
        let loaded = self.load_around(center);
        let passes = self.pipeline.pump_until_idle();
        info!("Cold start around {center:?}: {loaded} chunks in {passes} passes");
        Ok(loaded)
    }

    /// Runs one synchronous pipeline pass; see [`ChunkPipeline::pump_once`].
    pub fn pump_once(&mut self) -> bool {
        self.pipeline.pump_once()
    }

    /// Hands the pipeline to its background worker.
    pub fn start(&mut self) {
        self.pipeline.start();
    }

    /// Stops the background worker and waits for it.
    pub fn stop(&mut self) -> Result<()> {
        self.pipeline.stop()
    }

    /// Whether the background worker runs.
    pub fn is_running(&self) -> bool {
        self.pipeline.is_running()
    }

    fn loaded_chunk(&self, position: Point3<i32>) -> Result<MtResource<Chunk>> {
        self.chunk_at(position)
            .ok_or(StreamError::ChunkNotLoaded(position))
    }

    /// The block at `local` in the live chunk at `chunk_position`.
    pub fn block_at(&self, chunk_position: Point3<i32>, local: Point3<i32>) -> Result<Block> {
        self.loaded_chunk(chunk_position)?.get().block_at(local)
    }

    /// Sets a block's type, resetting its overlay. Marks the chunk dirty, plus
    /// each live neighbor across a chunk face the block touches.
    pub fn set_block_type(
        &self,
        chunk_position: Point3<i32>,
        local: Point3<i32>,
        block_type: BlockType,
    ) -> Result<()> {
        self.loaded_chunk(chunk_position)?
            .get_mut()
            .set_block_type(local, block_type)
    }

    /// Sets a block's overlay. Marks only the owning chunk dirty.
    pub fn set_block_overlay(
        &self,
        chunk_position: Point3<i32>,
        local: Point3<i32>,
        overlay: BlockOverlay,
    ) -> Result<()> {
        self.loaded_chunk(chunk_position)?
            .get_mut()
            .set_block_overlay(local, overlay)
    }

    /// Hits a block once. Dirt and grass break when hit at the second crack
    /// stage; stone and ores at the third. Anything else is unaffected.
    pub fn damage_block(&self, chunk_position: Point3<i32>, local: Point3<i32>) -> Result<BlockDamage> {
        let chunk = self.loaded_chunk(chunk_position)?;
        let mut chunk = chunk.get_mut();
        let block = chunk.block_at(local)?;

        let Some(breaking) = breaking_stage(block.block_type) else {
            return Ok(BlockDamage::Unaffected);
        };

        if block.overlay >= breaking {
            chunk.set_block_type(local, BlockType::AIR)?;
            return Ok(BlockDamage::Destroyed);
        }

        let overlay = block.overlay.next();
        chunk.set_block_overlay(local, overlay)?;
        Ok(BlockDamage::Cracked(overlay))
    }

    /// Places a block next to a chunk-local position that may lie one step
    /// outside the chunk, as when building against a face at the chunk edge.
    ///
    /// # Returns
    /// The position of the chunk that received the block.
    pub fn place_block(
        &self,
        chunk_position: Point3<i32>,
        local: Point3<i32>,
        block_type: BlockType,
    ) -> Result<Point3<i32>> {
        let reach = -1..=CHUNK_DIMENSION;
        if !(reach.contains(&local.x) && reach.contains(&local.y) && reach.contains(&local.z)) {
            return Err(StreamError::BlockOutOfGrid(local));
        }

        let (offset, wrapped) = resolve_local(local);
        let owner = chunk_position + offset;
        self.set_block_type(owner, wrapped, block_type)?;
        Ok(owner)
    }

    /// Writes every live chunk and every cached grid to the region store.
    ///
    /// Stops the worker for the duration if it is running and restarts it
    /// afterwards. Without a region store this only empties the cache.
    pub fn save(&mut self) -> Result<()> {
        let was_running = self.pipeline.is_running();
        self.pipeline.stop()?;

        let live: Vec<MtResource<Chunk>> = self.data.get().chunks.values().cloned().collect();
        for chunk in live {
            if chunk.get().is_populated() {
                self.pipeline.request_persist(chunk);
            }
        }
        self.pipeline.flush()?;

        if was_running {
            self.pipeline.start();
        }
        info!("Saved world ({} live chunks)", self.chunk_count());
        Ok(())
    }

    /// Saves, stops the pipeline and closes the region file.
    pub fn shutdown(mut self) -> Result<()> {
        self.save()?;
        self.pipeline.stop()?;
        if let Some(region) = self.region.as_ref() {
            region.get_mut().close();
        }
        Ok(())
    }
}
