//! # World Configuration
//!
//! Static settings read once when a [`World`](crate::voxels::world::World) is
//! created. Every field has a default, so a JSON file only needs to name the
//! fields it changes:
//!
//! ```json
//! { "seed": 42, "region_path": "world.region" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use cgmath::Point3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::voxels::region::CHUNK_RECORD_SIZE;

/// Settings of one world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed of the terrain noise permutation.
    pub seed: u32,
    /// Chunks within this many axis steps of the centre are loaded.
    pub build_radius: i32,
    /// Chunks at or beyond this Euclidean chunk distance are unloaded.
    pub unload_radius: i32,
    /// Memory budget of the chunk cache in bytes.
    pub cache_bytes: usize,
    /// Region file backing the world; `None` keeps everything in memory.
    pub region_path: Option<PathBuf>,
    /// Inclusive lower corner used when the region file has to be created.
    pub region_min: [i32; 3],
    /// Inclusive upper corner used when the region file has to be created.
    pub region_max: [i32; 3],
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            seed: 0,
            build_radius: 4,
            unload_radius: 5,
            cache_bytes: 1024 * 1024,
            region_path: None,
            region_min: [-16, 0, -16],
            region_max: [16, 10, 16],
        }
    }
}

impl WorldConfig {
    /// Parses a config from JSON, filling absent fields with defaults.
    ///
    /// # Errors
    /// `Json` if the text is not a valid config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of chunk grids that fit into `cache_bytes`, never less than one.
    pub fn cache_capacity(&self) -> usize {
        (self.cache_bytes / CHUNK_RECORD_SIZE).max(1)
    }

    /// `region_min` as a chunk position.
    pub fn region_min(&self) -> Point3<i32> {
        self.region_min.into()
    }

    /// `region_max` as a chunk position.
    pub fn region_max(&self) -> Point3<i32> {
        self.region_max.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;

    #[test]
    fn missing_fields_take_defaults() {
        let config = WorldConfig::from_json_str(r#"{ "seed": 9, "build_radius": 2 }"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.build_radius, 2);
        assert_eq!(config.unload_radius, 5);
        assert!(config.region_path.is_none());
    }

    #[test]
    fn default_cache_holds_sixty_four_chunks() {
        assert_eq!(WorldConfig::default().cache_capacity(), 64);
        let tiny = WorldConfig {
            cache_bytes: 10,
            ..WorldConfig::default()
        };
        assert_eq!(tiny.cache_capacity(), 1);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            WorldConfig::from_json_str("{ seed: }"),
            Err(StreamError::Config(_))
        ));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, r#"{ "region_path": "w.region", "region_max": [1, 2, 3] }"#).unwrap();
        let config = WorldConfig::from_json_file(&path).unwrap();
        assert_eq!(config.region_path, Some(PathBuf::from("w.region")));
        assert_eq!(config.region_max(), Point3::new(1, 2, 3));
    }
}
