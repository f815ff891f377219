//! Dyld chained fixups definitions.
//!
//! These definitions are independent of read/write support, although this
//! module does provide some sanity checks for the raw bit-field words.
//!
//! The layouts follow `<mach-o/fixup-chains.h>`. The slot encodings are
//! declared there as C bit-field structs, whose packing order is a host
//! compiler property; here each encoding is instead a table of
//! [`Field`](crate::bitfield::Field) constants over an explicitly
//! little-endian word, so the layouts are portable and testable.

use crate::bitfield::Field;
use crate::endian::{Endian, I32, U16, U32, U64};
use crate::pod::Pod;

/// Header of the `LC_DYLD_CHAINED_FIXUPS` payload.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DyldChainedFixupsHeader<E: Endian> {
    /// 0
    pub fixups_version: U32<E>,
    /// Offset of `DyldChainedStartsInImage` in chain data.
    pub starts_offset: U32<E>,
    /// Offset of imports table in chain data.
    pub imports_offset: U32<E>,
    /// Offset of symbol strings in chain data.
    pub symbols_offset: U32<E>,
    /// Number of imported symbol names.
    pub imports_count: U32<E>,
    /// `DYLD_CHAINED_IMPORT*`
    pub imports_format: U32<E>,
    /// 0 => uncompressed, 1 => zlib compressed
    pub symbols_format: U32<E>,
}

/// The only known value for `DyldChainedFixupsHeader::fixups_version`.
pub const DYLD_CHAINED_FIXUPS_VERSION: u32 = 0;

/// `DyldChainedFixupsHeader::symbols_format` value for uncompressed symbol strings.
pub const DYLD_CHAINED_SYMBOL_UNCOMPRESSED: u32 = 0;
/// `DyldChainedFixupsHeader::symbols_format` value for zlib compressed symbol strings.
pub const DYLD_CHAINED_SYMBOL_ZLIB: u32 = 1;

/// This struct is embedded in the `LC_DYLD_CHAINED_FIXUPS` payload.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DyldChainedStartsInImage<E: Endian> {
    /// Number of segments.
    pub seg_count: U32<E>,
    /// Each entry is an offset into this struct for that segment.
    ///
    /// The remaining `seg_count - 1` entries follow. An entry of 0 means
    /// the segment has no fixups.
    pub seg_info_offset: [U32<E>; 1],
}

/// This struct is embedded in `DyldChainedStartsInImage`
/// and passed down to the kernel for page-in linking.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DyldChainedStartsInSegment<E: Endian> {
    /// Size of this (amount kernel needs to copy).
    pub size: U32<E>,
    /// 0x1000 or 0x4000
    pub page_size: U16<E>,
    /// `DYLD_CHAINED_PTR_*`
    pub pointer_format: U16<E>,
    /// Offset in memory to start of segment.
    pub segment_offset: U64<E>,
    /// For 32-bit OS, any value beyond this is not a pointer.
    pub max_valid_pointer: U32<E>,
    /// How many pages are in the array.
    pub page_count: U16<E>,
    /// Each entry is the offset in that page of the first element in the
    /// chain, or `DYLD_CHAINED_PTR_START_NONE` if the page has no fixups.
    ///
    /// The remaining `page_count - 1` entries follow. If an entry has
    /// `DYLD_CHAINED_PTR_START_MULTI` set, it is instead an index into a
    /// trailing list of starts, the last of which has
    /// `DYLD_CHAINED_PTR_START_LAST` set.
    pub page_start: [U16<E>; 1],
}

/// This struct is embedded in the `__TEXT,__chain_starts` section in firmware.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DyldChainedStartsOffsets<E: Endian> {
    /// `DYLD_CHAINED_PTR_32_FIRMWARE`
    pub pointer_format: U32<E>,
    /// Number of starts in the array.
    pub starts_count: U32<E>,
    /// The remaining `starts_count - 1` chain start offsets follow.
    pub chain_starts: [U32<E>; 1],
}

/// Page has no fixups.
pub const DYLD_CHAINED_PTR_START_NONE: u16 = 0xFFFF;
/// Page has a list of chain starts instead of a single start.
pub const DYLD_CHAINED_PTR_START_MULTI: u16 = 0x8000;
/// Last chain start in a multi-start list.
pub const DYLD_CHAINED_PTR_START_LAST: u16 = 0x8000;

// Values for `DyldChainedStartsInSegment::pointer_format`.

/// Stride 8, unauth target is vmaddr.
pub const DYLD_CHAINED_PTR_ARM64E: u16 = 1;
/// Target is vmaddr.
pub const DYLD_CHAINED_PTR_64: u16 = 2;
#[allow(missing_docs)]
pub const DYLD_CHAINED_PTR_32: u16 = 3;
#[allow(missing_docs)]
pub const DYLD_CHAINED_PTR_32_CACHE: u16 = 4;
#[allow(missing_docs)]
pub const DYLD_CHAINED_PTR_32_FIRMWARE: u16 = 5;
/// Target is vm offset.
pub const DYLD_CHAINED_PTR_64_OFFSET: u16 = 6;
/// Stride 4, unauth target is vm offset.
pub const DYLD_CHAINED_PTR_ARM64E_KERNEL: u16 = 7;
#[allow(missing_docs)]
pub const DYLD_CHAINED_PTR_64_KERNEL_CACHE: u16 = 8;
/// Stride 8, unauth target is vm offset.
pub const DYLD_CHAINED_PTR_ARM64E_USERLAND: u16 = 9;
/// Stride 4, unauth target is vmaddr.
pub const DYLD_CHAINED_PTR_ARM64E_FIRMWARE: u16 = 10;
/// Stride 1, x86_64 kernel caches.
pub const DYLD_CHAINED_PTR_X86_64_KERNEL_CACHE: u16 = 11;
/// Stride 8, unauth target is vm offset, 24-bit bind ordinals.
pub const DYLD_CHAINED_PTR_ARM64E_USERLAND24: u16 = 12;

// Values for `DyldChainedFixupsHeader::imports_format`.

#[allow(missing_docs)]
pub const DYLD_CHAINED_IMPORT: u32 = 1;
#[allow(missing_docs)]
pub const DYLD_CHAINED_IMPORT_ADDEND: u32 = 2;
#[allow(missing_docs)]
pub const DYLD_CHAINED_IMPORT_ADDEND64: u32 = 3;

/// `DYLD_CHAINED_IMPORT` import entry.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DyldChainedImport<E: Endian> {
    /// Packed word; see `IMPORT_LIB_ORDINAL`, `IMPORT_WEAK_IMPORT` and
    /// `IMPORT_NAME_OFFSET`.
    pub bits: U32<E>,
}

/// `DYLD_CHAINED_IMPORT_ADDEND` import entry.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DyldChainedImportAddend<E: Endian> {
    /// Packed word with the same layout as `DyldChainedImport`.
    pub bits: U32<E>,
    #[allow(missing_docs)]
    pub addend: I32<E>,
}

/// `DYLD_CHAINED_IMPORT_ADDEND64` import entry.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DyldChainedImportAddend64<E: Endian> {
    /// Packed word; see `IMPORT64_LIB_ORDINAL`, `IMPORT64_WEAK_IMPORT` and
    /// `IMPORT64_NAME_OFFSET`.
    pub bits: U64<E>,
    #[allow(missing_docs)]
    pub addend: U64<E>,
}

// Layout of `DyldChainedImport::bits`.
#[allow(missing_docs)]
pub const IMPORT_LIB_ORDINAL: Field = Field::new(0, 8);
#[allow(missing_docs)]
pub const IMPORT_WEAK_IMPORT: Field = Field::new(8, 1);
#[allow(missing_docs)]
pub const IMPORT_NAME_OFFSET: Field = Field::new(9, 23);

// Layout of `DyldChainedImportAddend64::bits`.
#[allow(missing_docs)]
pub const IMPORT64_LIB_ORDINAL: Field = Field::new(0, 16);
#[allow(missing_docs)]
pub const IMPORT64_WEAK_IMPORT: Field = Field::new(16, 1);
#[allow(missing_docs)]
pub const IMPORT64_RESERVED: Field = Field::new(17, 15);
#[allow(missing_docs)]
pub const IMPORT64_NAME_OFFSET: Field = Field::new(32, 32);

// `DYLD_CHAINED_PTR_ARM64E*` slots.
//
// Every encoding in the family carries `next` at bit 51 and the `bind` and
// `auth` selector bits at 62 and 63; the low 62 bits are interpreted per
// selector.

/// Distance to the next slot, in strides. 0 terminates the chain.
pub const ARM64E_NEXT: Field = Field::new(51, 11);
/// 1 if the slot is a bind, 0 if it is a rebase.
pub const ARM64E_BIND: Field = Field::new(62, 1);
/// 1 if the slot carries pointer authentication data.
pub const ARM64E_AUTH: Field = Field::new(63, 1);

#[allow(missing_docs)]
pub const ARM64E_REBASE_TARGET: Field = Field::new(0, 43);
/// Top 8 bits set to this.
pub const ARM64E_REBASE_HIGH8: Field = Field::new(43, 8);

#[allow(missing_docs)]
pub const ARM64E_BIND_ORDINAL: Field = Field::new(0, 16);
#[allow(missing_docs)]
pub const ARM64E_BIND_ZERO: Field = Field::new(16, 16);
/// +/-256K, sign extended.
pub const ARM64E_BIND_ADDEND: Field = Field::new(32, 19);

/// Runtime offset.
pub const ARM64E_AUTH_REBASE_TARGET: Field = Field::new(0, 32);
#[allow(missing_docs)]
pub const ARM64E_AUTH_REBASE_DIVERSITY: Field = Field::new(32, 16);
#[allow(missing_docs)]
pub const ARM64E_AUTH_REBASE_ADDR_DIV: Field = Field::new(48, 1);
#[allow(missing_docs)]
pub const ARM64E_AUTH_REBASE_KEY: Field = Field::new(49, 2);

#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND_ORDINAL: Field = Field::new(0, 16);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND_ZERO: Field = Field::new(16, 16);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND_DIVERSITY: Field = Field::new(32, 16);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND_ADDR_DIV: Field = Field::new(48, 1);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND_KEY: Field = Field::new(49, 2);

// `DYLD_CHAINED_PTR_ARM64E_USERLAND24` binds widen the ordinal to 24 bits.

#[allow(missing_docs)]
pub const ARM64E_BIND24_ORDINAL: Field = Field::new(0, 24);
#[allow(missing_docs)]
pub const ARM64E_BIND24_ZERO: Field = Field::new(24, 8);
/// +/-256K, sign extended.
pub const ARM64E_BIND24_ADDEND: Field = Field::new(32, 19);

#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND24_ORDINAL: Field = Field::new(0, 24);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND24_ZERO: Field = Field::new(24, 8);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND24_DIVERSITY: Field = Field::new(32, 16);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND24_ADDR_DIV: Field = Field::new(48, 1);
#[allow(missing_docs)]
pub const ARM64E_AUTH_BIND24_KEY: Field = Field::new(49, 2);

// `DYLD_CHAINED_PTR_64`/`DYLD_CHAINED_PTR_64_OFFSET` slots.

/// Distance to the next slot, in 4-byte strides. 0 terminates the chain.
pub const PTR64_NEXT: Field = Field::new(51, 12);
/// 1 if the slot is a bind, 0 if it is a rebase.
pub const PTR64_BIND: Field = Field::new(63, 1);

/// 64GB max image size.
pub const PTR64_REBASE_TARGET: Field = Field::new(0, 36);
/// Top 8 bits set to this.
pub const PTR64_REBASE_HIGH8: Field = Field::new(36, 8);
/// All zeros.
pub const PTR64_REBASE_RESERVED: Field = Field::new(44, 7);

#[allow(missing_docs)]
pub const PTR64_BIND_ORDINAL: Field = Field::new(0, 24);
/// 0 thru 255.
pub const PTR64_BIND_ADDEND: Field = Field::new(24, 8);
/// All zeros.
pub const PTR64_BIND_RESERVED: Field = Field::new(32, 19);

// `DYLD_CHAINED_PTR_64_KERNEL_CACHE`/`DYLD_CHAINED_PTR_X86_64_KERNEL_CACHE` slots.

/// `basePointers[cacheLevel] + target`.
pub const KERNEL_CACHE_REBASE_TARGET: Field = Field::new(0, 30);
/// What level of cache to bind to (indexes a mach_header array).
pub const KERNEL_CACHE_REBASE_CACHE_LEVEL: Field = Field::new(30, 2);
#[allow(missing_docs)]
pub const KERNEL_CACHE_REBASE_DIVERSITY: Field = Field::new(32, 16);
#[allow(missing_docs)]
pub const KERNEL_CACHE_REBASE_ADDR_DIV: Field = Field::new(48, 1);
#[allow(missing_docs)]
pub const KERNEL_CACHE_REBASE_KEY: Field = Field::new(49, 2);
/// Distance to the next slot, in strides. 0 terminates the chain.
pub const KERNEL_CACHE_NEXT: Field = Field::new(51, 12);
/// 1 if the target is authenticated.
pub const KERNEL_CACHE_IS_AUTH: Field = Field::new(63, 1);

// `DYLD_CHAINED_PTR_32` slots.
//
// Some non-pointer values are co-opted into the chain as out of range
// rebases. If an entry in the chain is > max_valid_pointer, then it is
// not a pointer. To restore the value, subtract off the bias, which is
// (64MB + max_valid_pointer) / 2.

/// Distance to the next slot, in 4-byte strides. 0 terminates the chain.
pub const PTR32_NEXT: Field = Field::new(26, 5);
/// 1 if the slot is a bind, 0 if it is a rebase.
pub const PTR32_BIND: Field = Field::new(31, 1);

/// vmaddr, 64MB max image size.
pub const PTR32_REBASE_TARGET: Field = Field::new(0, 26);

#[allow(missing_docs)]
pub const PTR32_BIND_ORDINAL: Field = Field::new(0, 20);
/// 0 thru 63.
pub const PTR32_BIND_ADDEND: Field = Field::new(20, 6);

// `DYLD_CHAINED_PTR_32_CACHE` slots.

/// 1GB max dyld cache TEXT and DATA.
pub const PTR32_CACHE_REBASE_TARGET: Field = Field::new(0, 30);
/// Distance to the next slot, in 4-byte strides. 0 terminates the chain.
pub const PTR32_CACHE_NEXT: Field = Field::new(30, 2);

// `DYLD_CHAINED_PTR_32_FIRMWARE` slots.

/// 64MB max firmware TEXT and DATA.
pub const PTR32_FIRMWARE_REBASE_TARGET: Field = Field::new(0, 26);
/// Distance to the next slot, in 4-byte strides. 0 terminates the chain.
pub const PTR32_FIRMWARE_NEXT: Field = Field::new(26, 6);

impl<E: Endian> DyldChainedImport<E> {
    /// The library ordinal, without the dyld sign convention applied.
    pub fn lib_ordinal(&self, endian: E) -> u32 {
        IMPORT_LIB_ORDINAL.extract(self.bits.get(endian).into()) as u32
    }

    /// The library ordinal with the dyld sign convention applied, so that
    /// special ordinals such as 0xFE become -2.
    pub fn library_ordinal(&self, endian: E) -> i32 {
        IMPORT_LIB_ORDINAL.extract_signed(self.bits.get(endian).into()) as i32
    }

    /// Whether missing weak imports should bind to NULL.
    pub fn weak_import(&self, endian: E) -> bool {
        IMPORT_WEAK_IMPORT.extract(self.bits.get(endian).into()) != 0
    }

    /// Offset of the symbol name in the chain data symbol strings.
    pub fn name_offset(&self, endian: E) -> u32 {
        IMPORT_NAME_OFFSET.extract(self.bits.get(endian).into()) as u32
    }
}

impl<E: Endian> DyldChainedImportAddend<E> {
    /// The library ordinal, without the dyld sign convention applied.
    pub fn lib_ordinal(&self, endian: E) -> u32 {
        IMPORT_LIB_ORDINAL.extract(self.bits.get(endian).into()) as u32
    }

    /// The library ordinal with the dyld sign convention applied.
    pub fn library_ordinal(&self, endian: E) -> i32 {
        IMPORT_LIB_ORDINAL.extract_signed(self.bits.get(endian).into()) as i32
    }

    /// Whether missing weak imports should bind to NULL.
    pub fn weak_import(&self, endian: E) -> bool {
        IMPORT_WEAK_IMPORT.extract(self.bits.get(endian).into()) != 0
    }

    /// Offset of the symbol name in the chain data symbol strings.
    pub fn name_offset(&self, endian: E) -> u32 {
        IMPORT_NAME_OFFSET.extract(self.bits.get(endian).into()) as u32
    }
}

impl<E: Endian> DyldChainedImportAddend64<E> {
    /// The library ordinal, without the dyld sign convention applied.
    pub fn lib_ordinal(&self, endian: E) -> u32 {
        IMPORT64_LIB_ORDINAL.extract(self.bits.get(endian)) as u32
    }

    /// The library ordinal with the dyld sign convention applied, so that
    /// special ordinals such as 0xFFFE become -2.
    pub fn library_ordinal(&self, endian: E) -> i32 {
        IMPORT64_LIB_ORDINAL.extract_signed(self.bits.get(endian)) as i32
    }

    /// Whether missing weak imports should bind to NULL.
    pub fn weak_import(&self, endian: E) -> bool {
        IMPORT64_WEAK_IMPORT.extract(self.bits.get(endian)) != 0
    }

    /// Offset of the symbol name in the chain data symbol strings.
    pub fn name_offset(&self, endian: E) -> u32 {
        IMPORT64_NAME_OFFSET.extract(self.bits.get(endian)) as u32
    }
}

unsafe impl<E: Endian> Pod for DyldChainedFixupsHeader<E> {}
unsafe impl<E: Endian> Pod for DyldChainedStartsInImage<E> {}
unsafe impl<E: Endian> Pod for DyldChainedStartsInSegment<E> {}
unsafe impl<E: Endian> Pod for DyldChainedStartsOffsets<E> {}
unsafe impl<E: Endian> Pod for DyldChainedImport<E> {}
unsafe impl<E: Endian> Pod for DyldChainedImportAddend<E> {}
unsafe impl<E: Endian> Pod for DyldChainedImportAddend64<E> {}
