//! # Core Module
//!
//! Shared building blocks used throughout the streaming core.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `MtHandle`: Weak, non-owning counterpart of `MtResource`
//! - `LruCache`: Bounded cache with a synchronous eviction callback

pub mod lru_cache;
/// Strong and weak shared handles with poison recovery.
pub mod mt_resource;

pub use lru_cache::{EvictionCallback, LruCache};
pub use mt_resource::{MtHandle, MtResource};
