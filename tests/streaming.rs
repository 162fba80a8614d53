use std::thread;
use std::time::Duration;

use cgmath::Point3;
use voxel_stream::config::WorldConfig;
use voxel_stream::voxels::block::block_type::BlockType;
use voxel_stream::voxels::world::World;
use web_time::Instant;

fn streaming_config(build_radius: i32, unload_radius: i32) -> WorldConfig {
    WorldConfig {
        seed: 11,
        build_radius,
        unload_radius,
        ..WorldConfig::default()
    }
}

#[test]
fn cold_start_meshes_every_loaded_chunk() {
    let mut world = World::new(streaming_config(2, 5)).unwrap();
    let center = Point3::new(0, 3, 0);

    let loaded = world.cold_start(center).unwrap();
    assert_eq!(loaded, 25);

    let meshes = world.drain_completed_meshes();
    assert_eq!(meshes.len(), loaded);
    for mesh in &meshes {
        let chunk = world.chunk_at(mesh.position).unwrap();
        assert!(chunk.get().is_populated());
    }

    let telemetry = world.telemetry();
    assert_eq!(telemetry.total, loaded as u64);
    assert_eq!(telemetry.generated, loaded as u64);
}

fn all_populated(world: &World) -> bool {
    let Some(data) = world.handle().upgrade() else {
        return false;
    };
    let positions: Vec<Point3<i32>> = data.get().positions().collect();
    positions
        .into_iter()
        .filter_map(|position| world.chunk_at(position))
        .all(|chunk| chunk.get().is_populated())
}

#[test]
fn background_worker_streams_a_moving_centre() {
    let mut world = World::new(streaming_config(1, 2)).unwrap();
    world.start();

    let mut expected = 0;
    let mut received = 0;
    for step in 0..3 {
        let center = Point3::new(step, 2, 0);
        expected += world.load_around(center);
        world.prune(center);

        let deadline = Instant::now() + Duration::from_secs(10);
        while !all_populated(&world) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(all_populated(&world), "step {step} did not finish streaming");
        received += world.drain_completed_meshes().len();
    }

    world.stop().unwrap();
    received += world.drain_completed_meshes().len();

    assert!(received > 0);
    assert!(received <= expected);
    assert!(world.chunk_at(Point3::new(2, 2, 0)).unwrap().get().is_populated());
    assert!(world.chunk_at(Point3::new(0, 2, 0)).is_none());
}

#[test]
fn edits_become_dirty_meshes() {
    let mut world = World::new(streaming_config(1, 5)).unwrap();
    let center = Point3::new(0, 2, 0);
    world.cold_start(center).unwrap();
    world.drain_completed_meshes();
    world.rebuild_dirty_meshes();

    world
        .set_block_type(center, Point3::new(8, 0, 8), BlockType::STONE)
        .unwrap();
    let mut rebuilt: Vec<_> = world
        .rebuild_dirty_meshes()
        .into_iter()
        .map(|mesh| mesh.position)
        .collect();
    rebuilt.sort_by_key(|p| (p.x, p.y, p.z));

    assert_eq!(rebuilt, vec![Point3::new(0, 1, 0), center]);
    assert!(world.rebuild_dirty_meshes().is_empty());
}
