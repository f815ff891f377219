//! Support for reading ObjC shared-cache optimization tables.
//!
//! The version field is a little-endian u32 at offset 0 in every revision;
//! everything after it is a flat, version-specific record. All offsets are
//! returned uninterpreted, since resolving them requires the cache base
//! address, which this crate does not know.

use crate::endian::{LittleEndian, U32};
use crate::objc;
use crate::pod::Bytes;
use crate::read::{Error, ErrorKind, ReadError, Result};

/// A parsed legacy `objc_opt_t` table.
///
/// Versions 12, 13, 15 and 16 were shipped; every other version value
/// fails with `UnsupportedVersion`.
#[derive(Debug, Clone, Copy)]
pub enum ObjcOpt<'data> {
    /// Version 12.
    V12(&'data objc::ObjcOpt12<LittleEndian>),
    /// Version 13.
    V13(&'data objc::ObjcOpt13<LittleEndian>),
    /// Version 15.
    V15(&'data objc::ObjcOpt15<LittleEndian>),
    /// Version 16.
    V16(&'data objc::ObjcOpt16<LittleEndian>),
}

impl<'data> ObjcOpt<'data> {
    /// Parse an `objc_opt_t` table at the start of the given data.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let data = Bytes(data);
        let version = data
            .read_at::<U32<LittleEndian>>(0)
            .read_error("Invalid ObjC optimization version")?
            .get(LittleEndian);
        match version {
            12 => Ok(ObjcOpt::V12(
                data.read_at(0)
                    .read_error("Invalid ObjC optimization table")?,
            )),
            13 => Ok(ObjcOpt::V13(
                data.read_at(0)
                    .read_error("Invalid ObjC optimization table")?,
            )),
            15 => Ok(ObjcOpt::V15(
                data.read_at(0)
                    .read_error("Invalid ObjC optimization table")?,
            )),
            16 => Ok(ObjcOpt::V16(
                data.read_at(0)
                    .read_error("Invalid ObjC optimization table")?,
            )),
            _ => Err(Error::new(
                ErrorKind::UnsupportedVersion,
                "Unsupported ObjC optimization version",
            )),
        }
    }

    /// The table version.
    pub fn version(&self) -> u32 {
        match self {
            ObjcOpt::V12(table) => table.version.get(LittleEndian),
            ObjcOpt::V13(table) => table.version.get(LittleEndian),
            ObjcOpt::V15(table) => table.version.get(LittleEndian),
            ObjcOpt::V16(table) => table.version.get(LittleEndian),
        }
    }

    /// The table flags. Versions before 15 have none.
    pub fn flags(&self) -> Option<u32> {
        match self {
            ObjcOpt::V12(_) | ObjcOpt::V13(_) => None,
            ObjcOpt::V15(table) => Some(table.flags.get(LittleEndian)),
            ObjcOpt::V16(table) => Some(table.flags.get(LittleEndian)),
        }
    }

    /// The offset of the selector hash table.
    pub fn selopt_offset(&self) -> i32 {
        match self {
            ObjcOpt::V12(table) => table.selopt_offset.get(LittleEndian),
            ObjcOpt::V13(table) => table.selopt_offset.get(LittleEndian),
            ObjcOpt::V15(table) => table.selopt_offset.get(LittleEndian),
            ObjcOpt::V16(table) => table.selopt_offset.get(LittleEndian),
        }
    }

    /// The offset of the unsplit header info table, for versions before 15.
    pub fn headeropt_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V12(table) => Some(table.headeropt_offset.get(LittleEndian)),
            ObjcOpt::V13(table) => Some(table.headeropt_offset.get(LittleEndian)),
            ObjcOpt::V15(_) | ObjcOpt::V16(_) => None,
        }
    }

    /// The offset of the read-only header info table, for version 15 and
    /// later.
    pub fn headeropt_ro_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V12(_) | ObjcOpt::V13(_) => None,
            ObjcOpt::V15(table) => Some(table.headeropt_ro_offset.get(LittleEndian)),
            ObjcOpt::V16(table) => Some(table.headeropt_ro_offset.get(LittleEndian)),
        }
    }

    /// The offset of the read-write header info table, for version 15 and
    /// later.
    pub fn headeropt_rw_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V12(_) | ObjcOpt::V13(_) => None,
            ObjcOpt::V15(table) => Some(table.headeropt_rw_offset.get(LittleEndian)),
            ObjcOpt::V16(table) => Some(table.headeropt_rw_offset.get(LittleEndian)),
        }
    }

    /// The offset of the class hash table.
    ///
    /// Version 16 moved it to the large-shared-caches layout; see
    /// [`Self::large_shared_caches_class_offset`].
    pub fn clsopt_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V12(table) => Some(table.clsopt_offset.get(LittleEndian)),
            ObjcOpt::V13(table) => Some(table.clsopt_offset.get(LittleEndian)),
            ObjcOpt::V15(table) => Some(table.clsopt_offset.get(LittleEndian)),
            ObjcOpt::V16(_) => None,
        }
    }

    /// The offset of the protocol hash table, for version 13.
    pub fn protocolopt_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V13(table) => Some(table.protocolopt_offset.get(LittleEndian)),
            _ => None,
        }
    }

    /// The offset of the protocol hash table, for version 15.
    pub fn protocolopt2_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V15(table) => Some(table.protocolopt2_offset.get(LittleEndian)),
            _ => None,
        }
    }

    /// The offset of the large-shared-caches class hash table, for
    /// version 16.
    pub fn large_shared_caches_class_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V16(table) => Some(table.large_shared_caches_class_offset.get(LittleEndian)),
            _ => None,
        }
    }

    /// The offset of the large-shared-caches protocol hash table, for
    /// version 16.
    pub fn large_shared_caches_protocol_offset(&self) -> Option<i32> {
        match self {
            ObjcOpt::V16(table) => {
                Some(table.large_shared_caches_protocol_offset.get(LittleEndian))
            }
            _ => None,
        }
    }

    /// The offset of the relative method selector base address, for
    /// version 16.
    pub fn relative_method_selector_base_address_offset(&self) -> Option<i64> {
        match self {
            ObjcOpt::V16(table) => Some(
                table
                    .relative_method_selector_base_address_offset
                    .get(LittleEndian),
            ),
            _ => None,
        }
    }
}

/// A parsed modern ObjC optimization header.
#[derive(Debug, Clone, Copy)]
pub struct ObjcOptimization<'data> {
    table: &'data objc::ObjcOptimization<LittleEndian>,
}

impl<'data> ObjcOptimization<'data> {
    /// Parse an `objc_optimization` header at the start of the given data.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let table = Bytes(data)
            .read_at::<objc::ObjcOptimization<LittleEndian>>(0)
            .read_error("Invalid ObjC optimization header")?;
        if table.version.get(LittleEndian) != objc::OBJC_OPTIMIZATION_VERSION {
            return Err(Error::new(
                ErrorKind::UnsupportedVersion,
                "Unsupported ObjC optimization version",
            ));
        }
        Ok(ObjcOptimization { table })
    }

    /// Return the raw header.
    pub fn table(&self) -> &'data objc::ObjcOptimization<LittleEndian> {
        self.table
    }

    /// The header flags.
    pub fn flags(&self) -> u32 {
        self.table.flags.get(LittleEndian)
    }

    /// The offset of the read-only header info table.
    pub fn header_info_ro_offset(&self) -> u64 {
        self.table.header_info_ro_cache_offset.get(LittleEndian)
    }

    /// The offset of the read-write header info table.
    pub fn header_info_rw_offset(&self) -> u64 {
        self.table.header_info_rw_cache_offset.get(LittleEndian)
    }

    /// The offset of the selector hash table.
    pub fn selector_hash_table_offset(&self) -> u64 {
        self.table.selector_hash_table_cache_offset.get(LittleEndian)
    }

    /// The offset of the class hash table.
    pub fn class_hash_table_offset(&self) -> u64 {
        self.table.class_hash_table_cache_offset.get(LittleEndian)
    }

    /// The offset of the protocol hash table.
    pub fn protocol_hash_table_offset(&self) -> u64 {
        self.table.protocol_hash_table_cache_offset.get(LittleEndian)
    }

    /// The offset of the relative method selector base address.
    pub fn relative_method_selector_base_address_offset(&self) -> u64 {
        self.table
            .relative_method_selector_base_address_offset
            .get(LittleEndian)
    }
}
