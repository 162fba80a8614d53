use std::path::Path;

use cgmath::Point3;
use voxel_stream::config::WorldConfig;
use voxel_stream::voxels::block::block_type::BlockType;
use voxel_stream::voxels::chunk::CHUNK_DIMENSION;
use voxel_stream::voxels::region::region_builder::build_region;
use voxel_stream::voxels::region::{RegionStore, CHUNK_RECORD_SIZE};
use voxel_stream::voxels::terrain::TerrainGenerator;
use voxel_stream::voxels::world::World;

const SEED: u32 = 5;

fn region_config(path: &Path, cache_bytes: usize) -> WorldConfig {
    WorldConfig {
        seed: SEED,
        build_radius: 1,
        unload_radius: 1,
        cache_bytes,
        region_path: Some(path.to_path_buf()),
        region_min: [-4, 0, -4],
        region_max: [4, 2, 4],
    }
}

#[test]
fn saved_edits_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.region");
    let origin = Point3::new(0, 0, 0);
    let local = Point3::new(5, 5, 5);

    let mut world = World::new(region_config(&path, 1024 * 1024)).unwrap();
    world.cold_start(origin).unwrap();
    world.set_block_type(origin, local, BlockType::DIAMOND).unwrap();
    world.shutdown().unwrap();

    let mut world = World::new(region_config(&path, 1024 * 1024)).unwrap();
    let loaded = world.cold_start(origin).unwrap();
    assert_eq!(
        world.block_at(origin, local).unwrap().block_type,
        BlockType::DIAMOND
    );

    let telemetry = world.telemetry();
    assert_eq!(telemetry.from_disk, loaded as u64);
    assert_eq!(telemetry.generated, 0);
    assert_eq!(telemetry.from_cache, 0);
}

#[test]
fn cache_evictions_reach_the_region_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.region");
    let origin = Point3::new(0, 0, 0);
    let east = Point3::new(1, 0, 0);
    let local = Point3::new(3, 3, 3);

    let mut world = World::new(region_config(&path, CHUNK_RECORD_SIZE)).unwrap();
    world.cold_start(origin).unwrap();
    world.set_block_type(east, local, BlockType::REDSTONE).unwrap();

    // Everything but the centre lies at distance one.
    assert_eq!(world.prune(origin), 5);
    world.pump_once();
    assert_eq!(world.chunk_count(), 1);

    assert_eq!(world.load_around(origin), 5);
    world.pump_once();
    assert_eq!(
        world.block_at(east, local).unwrap().block_type,
        BlockType::REDSTONE
    );

    let telemetry = world.telemetry();
    assert_eq!(telemetry.from_cache, 1);
    assert_eq!(telemetry.from_disk, 4);
    assert_eq!(telemetry.total, 11);
}

#[test]
fn dug_out_chunk_stays_dug_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.region");
    let origin = Point3::new(0, 0, 0);
    let east = Point3::new(1, 0, 0);

    let mut world = World::new(region_config(&path, CHUNK_RECORD_SIZE)).unwrap();
    world.cold_start(origin).unwrap();
    for x in 0..CHUNK_DIMENSION {
        for y in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                world
                    .set_block_type(east, Point3::new(x, y, z), BlockType::AIR)
                    .unwrap();
            }
        }
    }
    world.shutdown().unwrap();

    let mut world = World::new(region_config(&path, CHUNK_RECORD_SIZE)).unwrap();
    world.cold_start(origin).unwrap();
    assert_eq!(
        world.block_at(east, Point3::new(7, 0, 7)).unwrap().block_type,
        BlockType::AIR
    );
    assert_eq!(world.telemetry().generated, 0);
}

#[test]
fn prefilled_region_serves_the_cold_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefilled.region");
    let generator = TerrainGenerator::new(SEED);

    let written = build_region(&path, Point3::new(-1, 0, -1), Point3::new(1, 0, 1), &generator).unwrap();
    assert_eq!(written, 9);

    let mut world = World::new(region_config(&path, 1024 * 1024)).unwrap();
    let loaded = world.cold_start(Point3::new(0, 0, 0)).unwrap();
    assert_eq!(loaded, 6);

    let telemetry = world.telemetry();
    assert_eq!(telemetry.from_disk, 5);
    // The chunk above the prefilled layer lies outside the file's bounds.
    assert_eq!(telemetry.generated, 1);

    let position = Point3::new(1, 0, 0);
    let chunk = world.chunk_at(position).unwrap();
    assert_eq!(chunk.get().blocks().unwrap(), &*generator.generate(position));
}

#[test]
fn existing_region_keeps_its_own_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.region");

    let mut store = RegionStore::new();
    store.create(&path, Point3::new(0, 0, 0), Point3::new(0, 0, 0)).unwrap();
    store.close();

    let world = World::new(region_config(&path, 1024 * 1024)).unwrap();
    world.shutdown().unwrap();

    let mut store = RegionStore::new();
    store.open(&path).unwrap();
    let bounds = store.bounds().unwrap();
    assert_eq!(bounds.min, Point3::new(0, 0, 0));
    assert_eq!(bounds.max, Point3::new(0, 0, 0));
}
