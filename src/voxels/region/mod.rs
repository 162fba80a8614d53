//! # Region Store
//!
//! A region file holds every chunk inside an inclusive box `[min, max]` of
//! chunk positions at fixed, computable offsets.
//!
//! ## File layout
//!
//! ```text
//! header : min.x min.y min.z max.x max.y max.z      (6 x i32, little-endian)
//! body   : one record per chunk position in the box
//! record : CHUNK_SIZE x (type: i16, overlay: i16)  (little-endian, x/y/z nested)
//! ```
//!
//! Records are ordered row-major with `z` fastest: for a position normalized
//! against `min` as `(x', y', z')` and `size = max - min + 1`, the record index
//! is `x' * size.y * size.z + y' * size.z + z'`.
//!
//! The file is pre-allocated on creation and the first entry of every record
//! is stamped with [`UNWRITTEN_CODE`], a type code no block uses. A record
//! still carrying the stamp was never written; any real write replaces it, so
//! a chunk dug out down to air is still told apart from an empty slot.
//!
//! Writes go through one `write_all` per record; there is no journal, so a
//! crash mid-write can only corrupt that one record.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytemuck::Zeroable;
use cgmath::Point3;
use log::{debug, info};

use super::block::block_overlay::BlockOverlay;
use super::block::block_type::BlockType;
use super::block::{Block, BlockTypeSize};
use super::chunk::{empty_grid, BlockGrid, CHUNK_SIZE};
use crate::error::{Result, StreamError};

pub mod region_builder;

/// Size of the bounds header in bytes.
pub const HEADER_SIZE: u64 = 6 * std::mem::size_of::<i32>() as u64;
/// Size of one stored block in bytes.
pub const BLOCK_RECORD_SIZE: usize = std::mem::size_of::<BlockRecord>();
/// Size of one chunk record in bytes.
pub const CHUNK_RECORD_SIZE: usize = CHUNK_SIZE as usize * BLOCK_RECORD_SIZE;
/// Type code stamped into the first entry of every record at creation.
pub const UNWRITTEN_CODE: BlockTypeSize = -1;

/// One block as it sits on disk. Both fields hold little-endian values.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlockRecord {
    block_type: BlockTypeSize,
    overlay: BlockTypeSize,
}

impl BlockRecord {
    fn encode(block: &Block) -> Self {
        BlockRecord {
            block_type: block.block_type.code().to_le(),
            overlay: block.overlay.code().to_le(),
        }
    }

    /// The stamp marking a record slot that was never written.
    fn unwritten() -> Self {
        BlockRecord {
            block_type: UNWRITTEN_CODE.to_le(),
            overlay: 0,
        }
    }

    fn is_unwritten(self) -> bool {
        BlockTypeSize::from_le(self.block_type) == UNWRITTEN_CODE
    }

    fn decode(self) -> io::Result<Block> {
        let type_code = BlockTypeSize::from_le(self.block_type);
        let overlay_code = BlockTypeSize::from_le(self.overlay);
        let block_type = BlockType::from_code(type_code).ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidData, format!("unknown block type code {type_code}"))
        })?;
        let overlay = BlockOverlay::from_code(overlay_code).ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidData, format!("unknown overlay code {overlay_code}"))
        })?;
        Ok(Block { block_type, overlay })
    }
}

/// The inclusive chunk box a region file covers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegionBounds {
    /// Lowest chunk position covered, inclusive.
    pub min: Point3<i32>,
    /// Highest chunk position covered, inclusive.
    pub max: Point3<i32>,
}

impl RegionBounds {
    /// Number of chunks along each axis.
    pub fn size(&self) -> [u64; 3] {
        [
            (self.max.x as i64 - self.min.x as i64 + 1) as u64,
            (self.max.y as i64 - self.min.y as i64 + 1) as u64,
            (self.max.z as i64 - self.min.z as i64 + 1) as u64,
        ]
    }

    /// Number of chunk records in the box.
    pub fn volume(&self) -> u64 {
        let [x, y, z] = self.size();
        x * y * z
    }

    /// Returns true if `pos` lies inside the box.
    pub fn contains(&self, pos: Point3<i32>) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Record index of `pos`, or an addressing error outside the box.
    pub fn record_index(&self, pos: Point3<i32>) -> Result<u64> {
        if !self.contains(pos) {
            return Err(StreamError::OutOfRegion {
                pos,
                min: self.min,
                max: self.max,
            });
        }

        let [_, size_y, size_z] = self.size();
        let x = (pos.x as i64 - self.min.x as i64) as u64;
        let y = (pos.y as i64 - self.min.y as i64) as u64;
        let z = (pos.z as i64 - self.min.z as i64) as u64;
        Ok(x * size_y * size_z + y * size_z + z)
    }

    /// Byte offset of the record for `pos`.
    pub fn record_offset(&self, pos: Point3<i32>) -> Result<u64> {
        Ok(HEADER_SIZE + self.record_index(pos)? * CHUNK_RECORD_SIZE as u64)
    }

    /// Every position in the box in record order.
    pub fn positions(&self) -> impl Iterator<Item = Point3<i32>> + '_ {
        (self.min.x..=self.max.x).flat_map(move |x| {
            (self.min.y..=self.max.y)
                .flat_map(move |y| (self.min.z..=self.max.z).map(move |z| Point3::new(x, y, z)))
        })
    }
}

/// An open (or closed) region file.
#[derive(Default)]
pub struct RegionStore {
    file: Option<File>,
    path: Option<PathBuf>,
    bounds: Option<RegionBounds>,
}

impl RegionStore {
    /// A closed store. Call [`open`](Self::open) or [`create`](Self::create).
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path` and recovers its bounds from the header.
    ///
    /// # Errors
    /// `RegionNotFound` if the file does not exist.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.close();
        let path = path.as_ref();

        let mut file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StreamError::RegionNotFound(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let values: Vec<i32> = header
            .chunks_exact(4)
            .map(|bytes| i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();
        let bounds = RegionBounds {
            min: Point3::new(values[0], values[1], values[2]),
            max: Point3::new(values[3], values[4], values[5]),
        };

        info!(
            "Opened region {} covering {:?}..={:?}",
            path.display(),
            bounds.min,
            bounds.max
        );

        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        self.bounds = Some(bounds);
        Ok(())
    }

    /// Creates (or truncates) `path`, pre-allocates every record and writes the header.
    pub fn create(&mut self, path: impl AsRef<Path>, min: Point3<i32>, max: Point3<i32>) -> Result<()> {
        self.close();
        let path = path.as_ref();

        if min.x > max.x || min.y > max.y || min.z > max.z {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("region min {min:?} exceeds max {max:?}"),
            )
            .into());
        }

        let bounds = RegionBounds { min, max };
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(HEADER_SIZE + bounds.volume() * CHUNK_RECORD_SIZE as u64)?;

        let mut header = Vec::with_capacity(HEADER_SIZE as usize);
        for value in [min.x, min.y, min.z, max.x, max.y, max.z] {
            header.extend_from_slice(&value.to_le_bytes());
        }
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header)?;

        let stamp = BlockRecord::unwritten();
        for index in 0..bounds.volume() {
            file.seek(SeekFrom::Start(HEADER_SIZE + index * CHUNK_RECORD_SIZE as u64))?;
            file.write_all(bytemuck::bytes_of(&stamp))?;
        }

        info!(
            "Created region {} covering {:?}..={:?} ({} records)",
            path.display(),
            min,
            max,
            bounds.volume()
        );

        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        self.bounds = Some(bounds);
        Ok(())
    }

    /// Opens `path`, creating it with the given bounds if it does not exist yet.
    pub fn open_or_create(&mut self, path: impl AsRef<Path>, min: Point3<i32>, max: Point3<i32>) -> Result<()> {
        match self.open(path.as_ref()) {
            Err(StreamError::RegionNotFound(_)) => self.create(path, min, max),
            other => other,
        }
    }

    /// Releases the file handle and forgets the bounds.
    pub fn close(&mut self) {
        if let Some(path) = self.path.take() {
            debug!("Closed region {}", path.display());
        }
        self.file = None;
        self.bounds = None;
    }

    /// Returns true while a file is attached.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the attached file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bounds of the attached file.
    pub fn bounds(&self) -> Option<RegionBounds> {
        self.bounds
    }

    /// Returns true if the store is open and `pos` lies inside its box.
    pub fn contains(&self, pos: Point3<i32>) -> bool {
        self.bounds.map_or(false, |bounds| bounds.contains(pos))
    }

    fn seek_to_chunk(&mut self, pos: Point3<i32>) -> Result<&mut File> {
        let bounds = self.bounds.ok_or(StreamError::RegionClosed)?;
        let offset = bounds.record_offset(pos)?;
        let file = self.file.as_mut().ok_or(StreamError::RegionClosed)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(file)
    }

    /// Writes the record of the chunk at `pos`.
    pub fn write_chunk(&mut self, pos: Point3<i32>, blocks: &BlockGrid) -> Result<()> {
        let records: Vec<BlockRecord> = blocks.iter().map(BlockRecord::encode).collect();
        let file = self.seek_to_chunk(pos)?;
        file.write_all(bytemuck::cast_slice(&records))?;
        Ok(())
    }

    /// Reads the record of the chunk at `pos`. A record that was never
    /// written reads as all air.
    pub fn read_chunk(&mut self, pos: Point3<i32>) -> Result<Box<BlockGrid>> {
        Ok(self.read_chunk_if_written(pos)?.unwrap_or_else(empty_grid))
    }

    /// Reads the record of the chunk at `pos`, returning `None` if it was
    /// never written (its first entry still carries [`UNWRITTEN_CODE`]).
    pub fn read_chunk_if_written(&mut self, pos: Point3<i32>) -> Result<Option<Box<BlockGrid>>> {
        let records = self.read_records(pos)?;
        if records[0].is_unwritten() {
            return Ok(None);
        }
        decode_records(&records).map(Some)
    }

    fn read_records(&mut self, pos: Point3<i32>) -> Result<Vec<BlockRecord>> {
        let mut records = vec![BlockRecord::zeroed(); CHUNK_SIZE as usize];
        let file = self.seek_to_chunk(pos)?;
        file.read_exact(bytemuck::cast_slice_mut(&mut records))?;
        Ok(records)
    }

    /// Flushes written records to the device.
    pub fn sync(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(StreamError::RegionClosed)?;
        file.sync_data()?;
        Ok(())
    }
}

fn decode_records(records: &[BlockRecord]) -> Result<Box<BlockGrid>> {
    let mut grid = empty_grid();
    for (slot, record) in grid.iter_mut().zip(records) {
        *slot = record.decode()?;
    }
    Ok(grid)
}
