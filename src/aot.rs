//! Rosetta AOT cache definitions.
//!
//! These definitions are independent of read/write support.
//!
//! The AOT cache pairs x86_64 code with its arm64 translation, together with
//! per-fragment branch-data and instruction-map tables. The layouts follow
//! the kernel's `debug.h` and the structures recovered from the Rosetta
//! runtime; several fields have no published meaning and are preserved
//! opaque.

use crate::endian::{Endian, I32, U16Bytes, U32, U32Bytes, U64};
use crate::pod::Pod;

/// The magic value of `AotCacheHeader::magic`.
pub const AOT_CACHE_MAGIC: [u8; 8] = *b"ROSETTA\0";

/// Size of `AotCacheHeader::cambria_version` in bytes.
pub const CAMBRIA_VERSION_INFO_SIZE: usize = 32;

/// Header of an AOT cache file.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotCacheHeader<E: Endian> {
    /// Must equal `AOT_CACHE_MAGIC`.
    pub magic: [u8; 8],
    /// UUID of the translated (arm64) cache.
    pub uuid: [u8; 16],
    /// UUID of the x86_64 cache this was translated from.
    pub x86_uuid: [u8; 16],
    /// NUL padded translator version string.
    pub cambria_version: [u8; CAMBRIA_VERSION_INFO_SIZE],
    /// File offset of the code signature.
    pub code_signature_offset: U64<E>,
    /// Size of the code signature.
    pub code_signature_size: U64<E>,
    /// Number of code fragments in the cache.
    pub num_code_fragments: U32<E>,
    /// Size of this header as written, which may be smaller than the
    /// declared struct for older caches.
    pub header_size: U32<E>,
    // shared_file_mapping_np mappings follow.
}

/// The load command wrapping a single fragment's metadata in a translated
/// Mach-O.
pub const LC_AOT_METADATA: u32 = 0xcacaca01;

/// `LC_AOT_METADATA` load command.
///
/// Offsets are from the start of the linkedit segment.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotMetadataCommand<E: Endian> {
    /// `LC_AOT_METADATA`
    pub cmd: U32<E>,
    /// 0x20
    pub cmdsize: U32<E>,
    /// Offset of the x86 image path string.
    pub x86_image_path_offset: U32<E>,
    /// Size of the x86 image path string.
    pub x86_image_path_size: U32<E>,
    /// Offset of the fragment metadata record.
    pub fragment_offset: U32<E>,
    /// 1
    pub fragment_count: U32<E>,
    /// Address of the start of the x86_64 `__TEXT,__text` section.
    pub x86_code_address: U32<E>,
    /// Meaning unknown.
    pub reserved8: U32<E>,
}

// Values for `AotCacheCodeFragmentMetadata::fragment_type`.

/// A translated image fragment.
pub const AOT_FRAGMENT_TYPE_IMAGE: u32 = 0;
/// The Rosetta runtime routines pseudo-fragment, which has no x86 source
/// image.
pub const AOT_FRAGMENT_TYPE_RUNTIME: u32 = 1;

/// Per-fragment metadata record used by current caches.
///
/// Records are laid out inline in the cache, each followed by its
/// branch-data and instruction-map blobs; the sub-blob offsets are relative
/// to the start of the fragment region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AotCacheCodeFragmentMetadata<E: Endian> {
    /// `AOT_FRAGMENT_TYPE_*`
    pub fragment_type: U32<E>,
    /// Offset of the source image path in the x86 shared cache.
    pub image_path_offset: I32<E>,
    /// Offset of the x86 code this fragment was translated from.
    pub x86_code_offset: I32<E>,
    #[allow(missing_docs)]
    pub x86_code_size: I32<E>,
    /// Offset of the translated arm64 code.
    pub arm_code_offset: I32<E>,
    #[allow(missing_docs)]
    pub arm_code_size: I32<E>,
    /// Offset of the branch-data blob.
    pub branch_data_offset: I32<E>,
    #[allow(missing_docs)]
    pub branch_data_size: I32<E>,
    /// Offset of the instruction-map blob.
    pub instruction_map_offset: I32<E>,
    #[allow(missing_docs)]
    pub instruction_map_size: I32<E>,
}

/// Per-fragment metadata record used by older caches and by
/// `AotMetadataCommand`.
///
/// The sub-blob offsets are relative to the start of the linkedit segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AotCodeFragmentMetadata<E: Endian> {
    /// Offset of the x86 code this fragment was translated from.
    pub x86_code_offset: I32<E>,
    #[allow(missing_docs)]
    pub x86_code_size: I32<E>,
    /// Offset of the translated arm64 code.
    pub arm_code_offset: I32<E>,
    #[allow(missing_docs)]
    pub arm_code_size: I32<E>,
    /// Offset of the branch-data blob.
    pub branch_data_offset: I32<E>,
    #[allow(missing_docs)]
    pub branch_data_size: I32<E>,
    /// Offset of the instruction-map blob.
    pub instruction_map_offset: I32<E>,
    #[allow(missing_docs)]
    pub instruction_map_size: I32<E>,
}

// Values for the branch-data `kind` field in current caches. Older caches
// number the kinds from 0; see `read::aot::AotSchema`.

#[allow(missing_docs)]
pub const AOT_BRANCH_DATA_COMPACT: u32 = 1;
#[allow(missing_docs)]
pub const AOT_BRANCH_DATA_STANDARD: u32 = 2;
#[allow(missing_docs)]
pub const AOT_BRANCH_DATA_EXTENDED: u32 = 3;

/// Header of a fragment's branch-data blob (current layout).
///
/// The source structure is pragma packed, so all fields are unaligned.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotBranchDataHeader<E: Endian> {
    /// Selects the index entry encoding.
    pub kind: U32Bytes<E>,
    /// Meaning unknown.
    pub reserved2: U32Bytes<E>,
    /// Size in bytes of the data following this header.
    pub data_size: U32Bytes<E>,
    /// Number of index entries.
    pub entry_count: U32Bytes<E>,
}

/// Header of a fragment's branch-data blob (pre-`aot_metadata_command`
/// layout), which carries the kind as a trailing 16 bit field.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotBranchDataHeaderV1<E: Endian> {
    /// Size in bytes of the data following this header.
    pub data_size: U32Bytes<E>,
    /// Number of index entries.
    pub entry_count: U32Bytes<E>,
    /// Meaning unknown.
    pub reserved3: U32Bytes<E>,
    /// Meaning unknown.
    pub reserved4: U16Bytes<E>,
    /// Selects the index entry encoding.
    pub kind: U16Bytes<E>,
}

/// Branch-data index entry for `AOT_BRANCH_DATA_STANDARD`. 9 bytes, packed.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotBranchDataIndexEntry<E: Endian> {
    #[allow(missing_docs)]
    pub index: U16Bytes<E>,
    /// Meaning unknown.
    pub reserved2: U16Bytes<E>,
    /// Meaning unknown.
    pub reserved3: u8,
    /// Meaning unknown.
    pub reserved4: U32Bytes<E>,
}

/// Branch-data index entry for `AOT_BRANCH_DATA_COMPACT`. 5 bytes, packed.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotBranchDataIndexEntryCompact<E: Endian> {
    #[allow(missing_docs)]
    pub index: u8,
    /// Meaning unknown.
    pub reserved2: u8,
    /// Meaning unknown.
    pub reserved3: u8,
    /// Meaning unknown.
    pub reserved4: U16Bytes<E>,
}

/// Branch-data index entry for `AOT_BRANCH_DATA_EXTENDED`. 10 bytes, packed.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotBranchDataIndexEntryExtended<E: Endian> {
    #[allow(missing_docs)]
    pub index: U16Bytes<E>,
    /// Meaning unknown.
    pub reserved2: U16Bytes<E>,
    /// Meaning unknown.
    pub reserved3: U16Bytes<E>,
    /// Meaning unknown.
    pub reserved4: u8,
    /// Meaning unknown.
    pub reserved5: U16Bytes<E>,
    /// Meaning unknown.
    pub reserved6: u8,
}

/// Header of a fragment's instruction-map blob.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotInstructionMapHeader<E: Endian> {
    /// Observed fixed value 66052; meaning unknown.
    pub reserved1: U32<E>,
    /// Meaning unknown.
    pub reserved2: U32<E>,
    /// Meaning unknown.
    pub reserved3: U32<E>,
    /// Meaning unknown.
    pub reserved4: U32<E>,
    /// Size in bytes of the whole blob, including this header.
    pub map_size: U32<E>,
    /// Number of index entries.
    pub entry_count: U32<E>,
    /// Offset of the index entries within the blob.
    pub index_offset: U32<E>,
    /// `index_offset + 4 * entry_count`
    pub first_submap_offset: U32<E>,
}

/// Instruction-map index entry, mapping an x86 code offset and its arm64
/// translation to a submap.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AotInstructionMapIndexEntry<E: Endian> {
    /// Offset from the fragment's `x86_code_offset`.
    pub x86_code_offset: U32<E>,
    /// Offset from the fragment's `arm_code_offset`.
    pub arm_code_offset: U32<E>,
    /// Offset from the header's `first_submap_offset`.
    pub submap_offset: U32<E>,
    /// Meaning unknown.
    pub flags: U32<E>,
}

unsafe impl<E: Endian> Pod for AotCacheHeader<E> {}
unsafe impl<E: Endian> Pod for AotMetadataCommand<E> {}
unsafe impl<E: Endian> Pod for AotCacheCodeFragmentMetadata<E> {}
unsafe impl<E: Endian> Pod for AotCodeFragmentMetadata<E> {}
unsafe impl<E: Endian> Pod for AotBranchDataHeader<E> {}
unsafe impl<E: Endian> Pod for AotBranchDataHeaderV1<E> {}
unsafe impl<E: Endian> Pod for AotBranchDataIndexEntry<E> {}
unsafe impl<E: Endian> Pod for AotBranchDataIndexEntryCompact<E> {}
unsafe impl<E: Endian> Pod for AotBranchDataIndexEntryExtended<E> {}
unsafe impl<E: Endian> Pod for AotInstructionMapHeader<E> {}
unsafe impl<E: Endian> Pod for AotInstructionMapIndexEntry<E> {}
