//! Swift shared-cache optimization table definitions.
//!
//! These definitions are independent of read/write support.
//!
//! The Swift optimization header sits beside the ObjC tables in the shared
//! cache and grows monotonically by version: version 2 added the
//! prespecialization data offset, version 3 a fixed array of debug-only
//! hash table offsets. Offsets are relative to the start of the shared
//! cache and are never dereferenced here.

use crate::endian::{Endian, U32, U64};
use crate::pod::Pod;

/// Number of entries in
/// `SwiftOptimization3::prespecialized_metadata_hash_table_cache_offsets`.
pub const SWIFT_PRESPECIALIZED_METADATA_TABLE_COUNT: usize = 8;

/// Swift optimization header, version 1.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SwiftOptimization1<E: Endian> {
    /// 1
    pub version: U32<E>,
    #[allow(missing_docs)]
    pub padding: U32<E>,
    /// Offset of the type conformance hash table.
    pub type_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the metadata conformance hash table.
    pub metadata_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the foreign type conformance hash table.
    pub foreign_type_conformance_hash_table_cache_offset: U64<E>,
}

/// Swift optimization header, version 2.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SwiftOptimization2<E: Endian> {
    /// 2
    pub version: U32<E>,
    #[allow(missing_docs)]
    pub padding: U32<E>,
    /// Offset of the type conformance hash table.
    pub type_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the metadata conformance hash table.
    pub metadata_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the foreign type conformance hash table.
    pub foreign_type_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the prespecialization data.
    pub prespecialization_data_cache_offset: U64<E>,
}

/// Swift optimization header, version 3.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SwiftOptimization3<E: Endian> {
    /// 3
    pub version: U32<E>,
    #[allow(missing_docs)]
    pub padding: U32<E>,
    /// Offset of the type conformance hash table.
    pub type_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the metadata conformance hash table.
    pub metadata_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the foreign type conformance hash table.
    pub foreign_type_conformance_hash_table_cache_offset: U64<E>,
    /// Offset of the prespecialization data.
    pub prespecialization_data_cache_offset: U64<E>,
    /// Limited space reserved for table offsets, used for debugging only.
    pub prespecialized_metadata_hash_table_cache_offsets:
        [U64<E>; SWIFT_PRESPECIALIZED_METADATA_TABLE_COUNT],
}

unsafe impl<E: Endian> Pod for SwiftOptimization1<E> {}
unsafe impl<E: Endian> Pod for SwiftOptimization2<E> {}
unsafe impl<E: Endian> Pod for SwiftOptimization3<E> {}
