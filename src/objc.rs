//! ObjC shared-cache optimization table definitions.
//!
//! These definitions are independent of read/write support.
//!
//! The legacy `objc_opt_t` family lives at the start of the shared cache's
//! ObjC optimization region and has grown by revision; versions 12, 13, 15
//! and 16 were shipped (14 never was). Offsets are signed and relative to
//! the start of the table itself; this crate never dereferences them.

use crate::endian::{Endian, I32, I64, U32, U64};
use crate::pod::Pod;

// Values for the `flags` field of version 15 and later tables.

/// Class and protocol tables include every image in the cache.
pub const OBJC_OPT_IS_PRODUCTION: u32 = 1 << 0;
/// No class has a missing weakly-linked superclass.
pub const OBJC_OPT_NO_MISSING_WEAK_SUPERCLASSES: u32 = 1 << 1;
/// The cache uses the large-shared-cache table layout.
pub const OBJC_OPT_LARGE_SHARED_CACHE: u32 = 1 << 2;

/// `objc_opt_t` version 12.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ObjcOpt12<E: Endian> {
    /// 12
    pub version: U32<E>,
    /// Offset of the selector hash table.
    pub selopt_offset: I32<E>,
    /// Offset of the header info table.
    pub headeropt_offset: I32<E>,
    /// Offset of the class hash table.
    pub clsopt_offset: I32<E>,
}

/// `objc_opt_t` version 13, which added the protocol hash table.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ObjcOpt13<E: Endian> {
    /// 13
    pub version: U32<E>,
    /// Offset of the selector hash table.
    pub selopt_offset: I32<E>,
    /// Offset of the header info table.
    pub headeropt_offset: I32<E>,
    /// Offset of the class hash table.
    pub clsopt_offset: I32<E>,
    /// Offset of the protocol hash table.
    pub protocolopt_offset: I32<E>,
}

/// `objc_opt_t` version 15, which added flags and split the header info
/// table into read-only and read-write halves.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ObjcOpt15<E: Endian> {
    /// 15
    pub version: U32<E>,
    /// `OBJC_OPT_*`
    pub flags: U32<E>,
    /// Offset of the selector hash table.
    pub selopt_offset: I32<E>,
    /// Offset of the read-only header info table.
    pub headeropt_ro_offset: I32<E>,
    /// Offset of the class hash table.
    pub clsopt_offset: I32<E>,
    /// Unused.
    pub unused_protocolopt_offset: I32<E>,
    /// Offset of the read-write header info table.
    pub headeropt_rw_offset: I32<E>,
    /// Offset of the protocol hash table.
    pub protocolopt2_offset: I32<E>,
}

/// `objc_opt_t` version 16, which moved the class and protocol tables to
/// the large-shared-caches layout and added the relative method selector
/// base.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ObjcOpt16<E: Endian> {
    /// 16
    pub version: U32<E>,
    /// `OBJC_OPT_*`
    pub flags: U32<E>,
    /// Offset of the selector hash table.
    pub selopt_offset: I32<E>,
    /// Offset of the read-only header info table.
    pub headeropt_ro_offset: I32<E>,
    /// Unused.
    pub unused_clsopt_offset: I32<E>,
    /// Unused.
    pub unused_protocolopt_offset: I32<E>,
    /// Offset of the read-write header info table.
    pub headeropt_rw_offset: I32<E>,
    /// Unused.
    pub unused_protocolopt2_offset: I32<E>,
    /// Offset of the large-shared-caches class hash table.
    pub large_shared_caches_class_offset: I32<E>,
    /// Offset of the large-shared-caches protocol hash table.
    pub large_shared_caches_protocol_offset: I32<E>,
    /// Relative method list selectors are offsets from this address.
    pub relative_method_selector_base_address_offset: I64<E>,
}

/// The only known value for `ObjcOptimization::version`.
pub const OBJC_OPTIMIZATION_VERSION: u32 = 1;

/// The modern ObjC optimization header, which replaced the `objc_opt_t`
/// family and is located through the shared cache header rather than the
/// ObjC region.
///
/// Offsets are relative to the start of the shared cache.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ObjcOptimization<E: Endian> {
    /// 1
    pub version: U32<E>,
    #[allow(missing_docs)]
    pub flags: U32<E>,
    /// Offset of the read-only header info table.
    pub header_info_ro_cache_offset: U64<E>,
    /// Offset of the read-write header info table.
    pub header_info_rw_cache_offset: U64<E>,
    /// Offset of the selector hash table.
    pub selector_hash_table_cache_offset: U64<E>,
    /// Offset of the class hash table.
    pub class_hash_table_cache_offset: U64<E>,
    /// Offset of the protocol hash table.
    pub protocol_hash_table_cache_offset: U64<E>,
    /// Relative method list selectors are offsets from this address.
    pub relative_method_selector_base_address_offset: U64<E>,
}

unsafe impl<E: Endian> Pod for ObjcOpt12<E> {}
unsafe impl<E: Endian> Pod for ObjcOpt13<E> {}
unsafe impl<E: Endian> Pod for ObjcOpt15<E> {}
unsafe impl<E: Endian> Pod for ObjcOpt16<E> {}
unsafe impl<E: Endian> Pod for ObjcOptimization<E> {}
