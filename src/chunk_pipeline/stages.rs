//! Stage logic shared by both execution modes.
//!
//! [`StageContext`] owns everything only the pipeline thread may touch: the
//! chunk cache, the region store handle used for disk reads and write-back,
//! the terrain generator and the mesh builder.

use std::sync::Arc;

use cgmath::Point3;
use log::{debug, error, warn};

use super::telemetry::{PipelineTelemetry, PopulateSource};
use crate::core::{LruCache, MtResource};
use crate::error::Result;
use crate::meshing::{ChunkMesh, MeshBuilder};
use crate::voxels::chunk::{BlockGrid, Chunk};
use crate::voxels::region::RegionStore;
use crate::voxels::terrain::TerrainGenerator;

/// Writes an evicted grid back to the region store.
///
/// Failures are logged and the grid is dropped; the pipeline does not retry.
fn write_back(region: Option<&MtResource<RegionStore>>, position: Point3<i32>, grid: &BlockGrid) {
    let Some(region) = region else {
        debug!("Dropped evicted chunk {position:?}: no region store");
        return;
    };

    let mut store = region.get_mut();
    if !store.contains(position) {
        warn!("Dropped evicted chunk {position:?}: outside region bounds");
        return;
    }

    match store.write_chunk(position, grid) {
        Ok(()) => debug!("Wrote back evicted chunk {position:?}"),
        Err(err) => error!("Failed to write back chunk {position:?}: {err}"),
    }
}

/// The state the three stages work on: the write-back cache, the optional
/// region store, the terrain generator and the mesher.
pub struct StageContext {
    cache: LruCache<Point3<i32>, Box<BlockGrid>>,
    region: Option<MtResource<RegionStore>>,
    generator: Arc<TerrainGenerator>,
    mesh_builder: MeshBuilder,
    telemetry: Arc<PipelineTelemetry>,
}

impl StageContext {
    /// # Arguments
    /// * `cache_capacity` - Number of chunk grids the cache holds
    /// * `region` - Store used for disk reads and eviction write-back, if any
    /// * `generator` - Fallback source of blocks
    /// * `mesh_builder` - Builder for the build stage
    /// * `telemetry` - Counters bumped by the populate stage
    ///
    /// # Errors
    /// `ZeroCapacity` when `cache_capacity` is zero.
    pub fn new(
        cache_capacity: usize,
        region: Option<MtResource<RegionStore>>,
        generator: Arc<TerrainGenerator>,
        mesh_builder: MeshBuilder,
        telemetry: Arc<PipelineTelemetry>,
    ) -> Result<Self> {
        let evict_to = region.clone();
        let cache = LruCache::with_eviction(
            cache_capacity,
            Box::new(move |position, grid: Box<BlockGrid>| {
                write_back(evict_to.as_ref(), position, &grid)
            }),
        )?;

        Ok(StageContext {
            cache,
            region,
            generator,
            mesh_builder,
            telemetry,
        })
    }

    /// Copies a populated chunk's grid into the cache, possibly evicting an
    /// older grid to disk. Unpopulated chunks have nothing to keep.
    pub fn persist(&mut self, chunk: &MtResource<Chunk>) {
        let (position, grid) = {
            let chunk = chunk.get();
            match chunk.blocks() {
                Some(blocks) => (chunk.position, Box::new(*blocks)),
                None => {
                    debug!("Skipped persisting unpopulated chunk {:?}", chunk.position);
                    return;
                }
            }
        };
        self.cache.put(position, grid);
        debug!("Cached chunk {position:?} ({} cached)", self.cache.len());
    }

    /// Fills an unpopulated chunk from the cache, else the region store, else
    /// the terrain generator.
    ///
    /// # Returns
    /// The source used, or `None` if the chunk was already populated.
    pub fn populate(&mut self, chunk: &MtResource<Chunk>) -> Option<PopulateSource> {
        let position = {
            let chunk = chunk.get();
            if chunk.is_populated() {
                return None;
            }
            chunk.position
        };

        let (grid, source) = match self.cache.get(&position) {
            Some(cached) => (Box::new(**cached), PopulateSource::Cache),
            None => match self.read_from_disk(position) {
                Some(stored) => (stored, PopulateSource::Disk),
                None => (self.generator.generate(position), PopulateSource::Generated),
            },
        };

        if !chunk.get_mut().adopt(grid) {
            // Populated by someone else between the check and now.
            return None;
        }

        self.telemetry.record(source);
        debug!("Populated chunk {position:?} from {source:?}");
        Some(source)
    }

    fn read_from_disk(&self, position: Point3<i32>) -> Option<Box<BlockGrid>> {
        let region = self.region.as_ref()?;
        let mut store = region.get_mut();
        if !store.contains(position) {
            return None;
        }

        match store.read_chunk_if_written(position) {
            Ok(grid) => grid,
            Err(err) => {
                error!("Failed to read chunk {position:?}, generating instead: {err}");
                None
            }
        }
    }

    /// Meshes a populated chunk against its live neighbors.
    pub fn build(&self, chunk: &MtResource<Chunk>) -> Result<ChunkMesh> {
        self.mesh_builder.build_shared(chunk)
    }

    /// Writes every cached grid back to the region store and syncs it.
    pub fn flush(&mut self) -> Result<()> {
        let flushed = self.cache.evict_all();
        if let Some(region) = self.region.as_ref() {
            let mut store = region.get_mut();
            if store.is_open() {
                store.sync()?;
            }
        }
        debug!("Flushed {flushed} cached chunks");
        Ok(())
    }

    /// Number of grids currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the grid of `position` is in the cache.
    pub fn is_cached(&self, position: Point3<i32>) -> bool {
        self.cache.contains(&position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::TileAtlas;
    use crate::voxels::block::block_type::BlockType;
    use crate::voxels::block::Block;
    use crate::voxels::chunk::chunk_iteration::ChunkPositionIterator;

    fn context(capacity: usize, region: Option<MtResource<RegionStore>>) -> StageContext {
        StageContext::new(
            capacity,
            region,
            Arc::new(TerrainGenerator::new(0)),
            MeshBuilder::new(Arc::new(TileAtlas)),
            Arc::new(PipelineTelemetry::default()),
        )
        .unwrap()
    }

    fn shared(position: Point3<i32>) -> MtResource<Chunk> {
        MtResource::new(Chunk::detached(position))
    }

    #[test]
    fn cache_wins_over_generation() {
        let mut stages = context(4, None);
        let original = shared(Point3::new(0, 0, 0));
        assert_eq!(stages.populate(&original), Some(PopulateSource::Generated));
        original
            .get_mut()
            .set_block_at(Point3::new(3, 3, 3), Block::new(BlockType::DIAMOND))
            .unwrap();
        stages.persist(&original);

        let reloaded = shared(Point3::new(0, 0, 0));
        assert_eq!(stages.populate(&reloaded), Some(PopulateSource::Cache));
        assert_eq!(
            reloaded.get().block_at(Point3::new(3, 3, 3)).unwrap().block_type,
            BlockType::DIAMOND
        );
        assert_eq!(stages.populate(&reloaded), None);
    }

    #[test]
    fn eviction_reaches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RegionStore::new();
        store
            .create(dir.path().join("stages.region"), Point3::new(0, 0, 0), Point3::new(3, 0, 0))
            .unwrap();
        let region = MtResource::new(store);
        let mut stages = context(1, Some(region.clone()));

        let first = shared(Point3::new(0, 0, 0));
        stages.populate(&first);
        first
            .get_mut()
            .set_block_at(Point3::new(0, 5, 0), Block::new(BlockType::REDSTONE))
            .unwrap();
        stages.persist(&first);
        assert!(region
            .get_mut()
            .read_chunk_if_written(Point3::new(0, 0, 0))
            .unwrap()
            .is_none());

        let second = shared(Point3::new(1, 0, 0));
        stages.populate(&second);
        stages.persist(&second);
        assert!(!stages.is_cached(Point3::new(0, 0, 0)));

        let reloaded = shared(Point3::new(0, 0, 0));
        assert_eq!(stages.populate(&reloaded), Some(PopulateSource::Disk));
        assert_eq!(
            reloaded.get().block_at(Point3::new(0, 5, 0)).unwrap().block_type,
            BlockType::REDSTONE
        );
    }

    #[test]
    fn dug_out_chunk_reloads_as_air() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RegionStore::new();
        store
            .create(dir.path().join("stages.region"), Point3::new(0, 0, 0), Point3::new(1, 0, 0))
            .unwrap();
        let mut stages = context(1, Some(MtResource::new(store)));

        let dug = shared(Point3::new(0, 0, 0));
        stages.populate(&dug);
        {
            let mut chunk = dug.get_mut();
            for local in ChunkPositionIterator::new() {
                chunk.set_block_at(local.cast::<i32>().unwrap(), Block::AIR).unwrap();
            }
        }
        stages.persist(&dug);

        let other = shared(Point3::new(1, 0, 0));
        stages.populate(&other);
        stages.persist(&other);
        assert!(!stages.is_cached(Point3::new(0, 0, 0)));

        let reloaded = shared(Point3::new(0, 0, 0));
        assert_eq!(stages.populate(&reloaded), Some(PopulateSource::Disk));
        assert_eq!(reloaded.get().block_at(Point3::new(4, 0, 4)).unwrap(), Block::AIR);
        assert!(reloaded.get().blocks().unwrap().iter().all(|block| *block == Block::AIR));
    }

    #[test]
    fn out_of_region_positions_skip_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RegionStore::new();
        store
            .create(dir.path().join("stages.region"), Point3::new(0, 0, 0), Point3::new(0, 0, 0))
            .unwrap();
        let mut stages = context(1, Some(MtResource::new(store)));

        let outside = shared(Point3::new(9, 0, 0));
        assert_eq!(stages.populate(&outside), Some(PopulateSource::Generated));
        stages.persist(&outside);

        // Evicting a chunk that has no record slot only logs.
        let inside = shared(Point3::new(0, 0, 0));
        stages.populate(&inside);
        stages.persist(&inside);
        assert!(!stages.is_cached(Point3::new(9, 0, 0)));
        assert_eq!(stages.cached_len(), 1);
    }
}
