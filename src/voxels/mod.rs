//! # Voxel World
//!
//! This module contains the world model and everything that produces or
//! stores its contents.
//!
//! ## Architecture
//!
//! * **Block**: A material plus a damage overlay
//! * **Chunk**: A 16³ grid of blocks with neighbor addressing
//! * **Terrain**: Noise fields and the deterministic terrain classifier
//! * **Region**: The fixed-layout file chunks are written back to
//! * **World**: The live chunk map, dirty tracking, streaming and edits
//!
//! ## Data Flow
//!
//! 1. The world creates empty chunks around a centre and hands them to the pipeline
//! 2. The pipeline fills them from cache, region file or terrain and meshes them
//! 3. Edits go through the world, which tracks the chunks needing new meshes
//! 4. Chunks leaving the retention radius are persisted and dropped

pub mod block;
pub mod chunk;
pub mod region;
pub mod terrain;
pub mod world;
