//! Support for reading Swift shared-cache optimization tables.
//!
//! The version field is a little-endian u32 at offset 0; later versions
//! only append trailing fields, so the accessors for version-gated fields
//! return `Option`. All offsets are returned uninterpreted.

use crate::endian::{LittleEndian, U32};
use crate::pod::Bytes;
use crate::read::{Error, ErrorKind, ReadError, Result};
use crate::swift;

/// A parsed Swift optimization header.
///
/// Versions 1 through 3 are known; every other version value fails with
/// `UnsupportedVersion`.
#[derive(Debug, Clone, Copy)]
pub enum SwiftOptimization<'data> {
    /// Version 1.
    V1(&'data swift::SwiftOptimization1<LittleEndian>),
    /// Version 2.
    V2(&'data swift::SwiftOptimization2<LittleEndian>),
    /// Version 3.
    V3(&'data swift::SwiftOptimization3<LittleEndian>),
}

impl<'data> SwiftOptimization<'data> {
    /// Parse a Swift optimization header at the start of the given data.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let data = Bytes(data);
        let version = data
            .read_at::<U32<LittleEndian>>(0)
            .read_error("Invalid Swift optimization version")?
            .get(LittleEndian);
        match version {
            1 => Ok(SwiftOptimization::V1(
                data.read_at(0)
                    .read_error("Invalid Swift optimization table")?,
            )),
            2 => Ok(SwiftOptimization::V2(
                data.read_at(0)
                    .read_error("Invalid Swift optimization table")?,
            )),
            3 => Ok(SwiftOptimization::V3(
                data.read_at(0)
                    .read_error("Invalid Swift optimization table")?,
            )),
            _ => Err(Error::new(
                ErrorKind::UnsupportedVersion,
                "Unsupported Swift optimization version",
            )),
        }
    }

    /// The table version.
    pub fn version(&self) -> u32 {
        match self {
            SwiftOptimization::V1(table) => table.version.get(LittleEndian),
            SwiftOptimization::V2(table) => table.version.get(LittleEndian),
            SwiftOptimization::V3(table) => table.version.get(LittleEndian),
        }
    }

    /// The offset of the type conformance hash table.
    pub fn type_conformance_hash_table_offset(&self) -> u64 {
        match self {
            SwiftOptimization::V1(table) => {
                table.type_conformance_hash_table_cache_offset.get(LittleEndian)
            }
            SwiftOptimization::V2(table) => {
                table.type_conformance_hash_table_cache_offset.get(LittleEndian)
            }
            SwiftOptimization::V3(table) => {
                table.type_conformance_hash_table_cache_offset.get(LittleEndian)
            }
        }
    }

    /// The offset of the metadata conformance hash table.
    pub fn metadata_conformance_hash_table_offset(&self) -> u64 {
        match self {
            SwiftOptimization::V1(table) => table
                .metadata_conformance_hash_table_cache_offset
                .get(LittleEndian),
            SwiftOptimization::V2(table) => table
                .metadata_conformance_hash_table_cache_offset
                .get(LittleEndian),
            SwiftOptimization::V3(table) => table
                .metadata_conformance_hash_table_cache_offset
                .get(LittleEndian),
        }
    }

    /// The offset of the foreign type conformance hash table.
    pub fn foreign_type_conformance_hash_table_offset(&self) -> u64 {
        match self {
            SwiftOptimization::V1(table) => table
                .foreign_type_conformance_hash_table_cache_offset
                .get(LittleEndian),
            SwiftOptimization::V2(table) => table
                .foreign_type_conformance_hash_table_cache_offset
                .get(LittleEndian),
            SwiftOptimization::V3(table) => table
                .foreign_type_conformance_hash_table_cache_offset
                .get(LittleEndian),
        }
    }

    /// The offset of the prespecialization data, added in version 2.
    pub fn prespecialization_data_offset(&self) -> Option<u64> {
        match self {
            SwiftOptimization::V1(_) => None,
            SwiftOptimization::V2(table) => {
                Some(table.prespecialization_data_cache_offset.get(LittleEndian))
            }
            SwiftOptimization::V3(table) => {
                Some(table.prespecialization_data_cache_offset.get(LittleEndian))
            }
        }
    }

    /// The debug-only prespecialized metadata hash table offsets, added in
    /// version 3.
    pub fn prespecialized_metadata_hash_table_offsets(
        &self,
    ) -> Option<[u64; swift::SWIFT_PRESPECIALIZED_METADATA_TABLE_COUNT]> {
        match self {
            SwiftOptimization::V1(_) | SwiftOptimization::V2(_) => None,
            SwiftOptimization::V3(table) => {
                let mut offsets = [0; swift::SWIFT_PRESPECIALIZED_METADATA_TABLE_COUNT];
                for (offset, raw) in offsets
                    .iter_mut()
                    .zip(table.prespecialized_metadata_hash_table_cache_offsets.iter())
                {
                    *offset = raw.get(LittleEndian);
                }
                Some(offsets)
            }
        }
    }
}
