//! Support for reading dyld chained fixups.
//!
//! Chained fixups encode rebase and bind relocations as linked chains of
//! slots embedded directly in an image's data pages. The
//! `LC_DYLD_CHAINED_FIXUPS` payload carries a header, a starts table
//! locating the first slot of each page's chain, an imports table, and a
//! pool of symbol strings. The slots themselves live in the image's
//! segments, so [`FixupChain`] walks caller-supplied page bytes; the page
//! extent is the hard ceiling for the traversal, which is what keeps a
//! corrupt `next` distance from sending the walker outside the page.

use core::convert::TryInto;

use crate::endian::LittleEndian;
use crate::fixups;
use crate::pod::Bytes;
use crate::read::{Error, ErrorKind, ReadError, Result};

/// A parsed `LC_DYLD_CHAINED_FIXUPS` payload.
///
/// Returned records borrow the payload bytes. Locating the payload within
/// a Mach-O file is the caller's responsibility.
#[derive(Debug, Clone, Copy)]
pub struct ChainedFixups<'data> {
    data: Bytes<'data>,
    header: &'data fixups::DyldChainedFixupsHeader<LittleEndian>,
}

impl<'data> ChainedFixups<'data> {
    /// Parse the raw payload of an `LC_DYLD_CHAINED_FIXUPS` load command.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let data = Bytes(data);
        let header = data
            .read_at::<fixups::DyldChainedFixupsHeader<LittleEndian>>(0)
            .read_error("Invalid chained fixups header size or alignment")?;
        if header.fixups_version.get(LittleEndian) != fixups::DYLD_CHAINED_FIXUPS_VERSION {
            return Err(Error::new(
                ErrorKind::UnsupportedVersion,
                "Unsupported chained fixups version",
            ));
        }
        Ok(ChainedFixups { data, header })
    }

    /// Return the raw header.
    pub fn header(&self) -> &'data fixups::DyldChainedFixupsHeader<LittleEndian> {
        self.header
    }

    /// Return the starts table embedded in the payload.
    pub fn starts_in_image(&self) -> Result<ChainedStartsInImage<'data>> {
        let offset = self.header.starts_offset.get(LittleEndian) as usize;
        let mut data = self.data;
        data.skip(offset)
            .read_error("Invalid chained fixups starts offset")?;
        ChainedStartsInImage::parse(data)
    }

    /// Return the imports table embedded in the payload.
    pub fn imports(&self) -> Result<ChainedImports<'data>> {
        let format = ImportsFormat::from_u32(self.header.imports_format.get(LittleEndian))?;
        let offset = self.header.imports_offset.get(LittleEndian) as usize;
        let count = self.header.imports_count.get(LittleEndian);
        let mut data = self.data;
        data.skip(offset)
            .read_error("Invalid chained fixups imports offset")?;
        Ok(ChainedImports {
            data,
            format,
            count,
        })
    }

    /// Return the symbol name at the given offset in the payload's symbol
    /// string pool.
    ///
    /// The offset usually comes from [`ChainedImport::name_offset`].
    /// Returns an error if the pool is zlib compressed, since this crate
    /// does not perform decompression.
    pub fn symbol_name(&self, name_offset: u32) -> Result<&'data [u8]> {
        if self.header.symbols_format.get(LittleEndian) != fixups::DYLD_CHAINED_SYMBOL_UNCOMPRESSED
        {
            return Err(Error::new(
                ErrorKind::UnsupportedVersion,
                "Unsupported chained fixups symbols format",
            ));
        }
        let offset = self.header.symbols_offset.get(LittleEndian) as usize;
        let offset = offset
            .checked_add(name_offset as usize)
            .read_error("Invalid chained fixups symbol name offset")?;
        self.data
            .read_string_at(offset)
            .read_error("Invalid chained fixups symbol name")
    }
}

/// The starts table of a chained fixups payload, locating the chain starts
/// for every segment.
#[derive(Debug, Clone, Copy)]
pub struct ChainedStartsInImage<'data> {
    data: Bytes<'data>,
    seg_info_offset: &'data [crate::endian::U32<LittleEndian>],
}

impl<'data> ChainedStartsInImage<'data> {
    /// Parse a `dyld_chained_starts_in_image` structure at the start of the
    /// given data.
    pub fn parse(data: Bytes<'data>) -> Result<Self> {
        let image = data
            .read_at::<fixups::DyldChainedStartsInImage<LittleEndian>>(0)
            .read_error("Invalid chained fixups starts in image")?;
        let seg_count = image.seg_count.get(LittleEndian) as usize;
        let seg_info_offset = data
            .read_slice_at(4, seg_count)
            .read_error("Invalid chained fixups segment count")?;
        Ok(ChainedStartsInImage {
            data,
            seg_info_offset,
        })
    }

    /// The number of segments in the image.
    pub fn segment_count(&self) -> u32 {
        self.seg_info_offset.len() as u32
    }

    /// Return the starts for the given segment index.
    ///
    /// Returns `Ok(None)` if the segment has no fixups.
    pub fn segment_starts(&self, index: u32) -> Result<Option<ChainedStartsInSegment<'data>>> {
        let offset = self
            .seg_info_offset
            .get(index as usize)
            .read_error("Chained fixups segment index out of range")?
            .get(LittleEndian) as usize;
        if offset == 0 {
            return Ok(None);
        }
        let mut data = self.data;
        data.skip(offset)
            .read_error("Invalid chained fixups segment info offset")?;
        ChainedStartsInSegment::parse(data).map(Some)
    }
}

/// The chain starts for one segment.
#[derive(Debug, Clone, Copy)]
pub struct ChainedStartsInSegment<'data> {
    info: &'data fixups::DyldChainedStartsInSegment<LittleEndian>,
    page_start: &'data [crate::endian::U16<LittleEndian>],
}

impl<'data> ChainedStartsInSegment<'data> {
    /// Parse a `dyld_chained_starts_in_segment` structure at the start of
    /// the given data.
    pub fn parse(data: Bytes<'data>) -> Result<Self> {
        let info = data
            .read_at::<fixups::DyldChainedStartsInSegment<LittleEndian>>(0)
            .read_error("Invalid chained fixups starts in segment")?;
        let page_count = info.page_count.get(LittleEndian) as usize;
        // page_start begins inside the fixed struct, at offset 22.
        let page_start = data
            .read_slice_at(22, page_count)
            .read_error("Invalid chained fixups page count")?;
        Ok(ChainedStartsInSegment { info, page_start })
    }

    /// Return the raw structure.
    pub fn info(&self) -> &'data fixups::DyldChainedStartsInSegment<LittleEndian> {
        self.info
    }

    /// The page size of the segment, typically 0x1000 or 0x4000.
    pub fn page_size(&self) -> u16 {
        self.info.page_size.get(LittleEndian)
    }

    /// The raw `DYLD_CHAINED_PTR_*` value.
    pub fn pointer_format_raw(&self) -> u16 {
        self.info.pointer_format.get(LittleEndian)
    }

    /// The pointer format shared by every chain in the segment.
    pub fn pointer_format(&self) -> Result<PointerFormat> {
        PointerFormat::from_u16(self.pointer_format_raw())
    }

    /// The offset in memory of the start of the segment.
    pub fn segment_offset(&self) -> u64 {
        self.info.segment_offset.get(LittleEndian)
    }

    /// For 32-bit formats, the value above which a chain entry is a
    /// co-opted non-pointer rather than a rebase target.
    pub fn max_valid_pointer(&self) -> u32 {
        self.info.max_valid_pointer.get(LittleEndian)
    }

    /// The number of pages in the segment.
    pub fn page_count(&self) -> u16 {
        self.page_start.len() as u16
    }

    /// Return the chain start entry for the given page index.
    pub fn page_start(&self, index: u16) -> Result<PageStart> {
        let raw = self
            .page_start
            .get(index as usize)
            .read_error("Chained fixups page index out of range")?
            .get(LittleEndian);
        Ok(PageStart::from_u16(raw))
    }
}

/// One entry of a segment's page start array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStart {
    /// The page has no fixups.
    None,
    /// Byte offset within the page of the first chain slot.
    Offset(u16),
    /// Index into the segment's trailing multi-start list.
    MultiStarts(u16),
}

impl PageStart {
    /// Decode a raw page start value.
    pub fn from_u16(raw: u16) -> Self {
        if raw == fixups::DYLD_CHAINED_PTR_START_NONE {
            PageStart::None
        } else if raw & fixups::DYLD_CHAINED_PTR_START_MULTI != 0 {
            PageStart::MultiStarts(raw & !fixups::DYLD_CHAINED_PTR_START_MULTI)
        } else {
            PageStart::Offset(raw)
        }
    }
}

/// The `__TEXT,__chain_starts` section of a firmware image.
#[derive(Debug, Clone, Copy)]
pub struct ChainedStartsOffsets<'data> {
    info: &'data fixups::DyldChainedStartsOffsets<LittleEndian>,
    chain_starts: &'data [crate::endian::U32<LittleEndian>],
}

impl<'data> ChainedStartsOffsets<'data> {
    /// Parse a `dyld_chained_starts_offsets` structure at the start of the
    /// given data.
    pub fn parse(data: Bytes<'data>) -> Result<Self> {
        let info = data
            .read_at::<fixups::DyldChainedStartsOffsets<LittleEndian>>(0)
            .read_error("Invalid chained starts offsets")?;
        let count = info.starts_count.get(LittleEndian) as usize;
        let chain_starts = data
            .read_slice_at(8, count)
            .read_error("Invalid chained starts count")?;
        Ok(ChainedStartsOffsets { info, chain_starts })
    }

    /// The pointer format shared by every chain.
    pub fn pointer_format(&self) -> Result<PointerFormat> {
        PointerFormat::from_u16(self.info.pointer_format.get(LittleEndian) as u16)
    }

    /// The chain start offsets.
    pub fn chain_starts(&self) -> impl Iterator<Item = u32> + 'data {
        self.chain_starts.iter().map(|x| x.get(LittleEndian))
    }
}

/// A `DYLD_CHAINED_PTR_*` pointer format tag.
///
/// Selects the slot encoding and stride that [`FixupChain`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum PointerFormat {
    /// `DYLD_CHAINED_PTR_ARM64E`
    Arm64e,
    /// `DYLD_CHAINED_PTR_64`
    Ptr64,
    /// `DYLD_CHAINED_PTR_32`
    Ptr32,
    /// `DYLD_CHAINED_PTR_32_CACHE`
    Ptr32Cache,
    /// `DYLD_CHAINED_PTR_32_FIRMWARE`
    Ptr32Firmware,
    /// `DYLD_CHAINED_PTR_64_OFFSET`
    Ptr64Offset,
    /// `DYLD_CHAINED_PTR_ARM64E_KERNEL`
    Arm64eKernel,
    /// `DYLD_CHAINED_PTR_64_KERNEL_CACHE`
    Ptr64KernelCache,
    /// `DYLD_CHAINED_PTR_ARM64E_USERLAND`
    Arm64eUserland,
    /// `DYLD_CHAINED_PTR_ARM64E_FIRMWARE`
    Arm64eFirmware,
    /// `DYLD_CHAINED_PTR_X86_64_KERNEL_CACHE`
    X86_64KernelCache,
    /// `DYLD_CHAINED_PTR_ARM64E_USERLAND24`
    Arm64eUserland24,
}

impl PointerFormat {
    /// Decode a raw pointer format tag.
    ///
    /// Fails with `InvalidChainFormat` for tags this crate cannot walk.
    pub fn from_u16(raw: u16) -> Result<Self> {
        Ok(match raw {
            fixups::DYLD_CHAINED_PTR_ARM64E => PointerFormat::Arm64e,
            fixups::DYLD_CHAINED_PTR_64 => PointerFormat::Ptr64,
            fixups::DYLD_CHAINED_PTR_32 => PointerFormat::Ptr32,
            fixups::DYLD_CHAINED_PTR_32_CACHE => PointerFormat::Ptr32Cache,
            fixups::DYLD_CHAINED_PTR_32_FIRMWARE => PointerFormat::Ptr32Firmware,
            fixups::DYLD_CHAINED_PTR_64_OFFSET => PointerFormat::Ptr64Offset,
            fixups::DYLD_CHAINED_PTR_ARM64E_KERNEL => PointerFormat::Arm64eKernel,
            fixups::DYLD_CHAINED_PTR_64_KERNEL_CACHE => PointerFormat::Ptr64KernelCache,
            fixups::DYLD_CHAINED_PTR_ARM64E_USERLAND => PointerFormat::Arm64eUserland,
            fixups::DYLD_CHAINED_PTR_ARM64E_FIRMWARE => PointerFormat::Arm64eFirmware,
            fixups::DYLD_CHAINED_PTR_X86_64_KERNEL_CACHE => PointerFormat::X86_64KernelCache,
            fixups::DYLD_CHAINED_PTR_ARM64E_USERLAND24 => PointerFormat::Arm64eUserland24,
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidChainFormat,
                    "Unrecognized chained fixup pointer format",
                ))
            }
        })
    }

    /// Size in bytes of one chain slot.
    pub fn slot_size(self) -> usize {
        if self.is_64bit() {
            8
        } else {
            4
        }
    }

    /// Return true if the format uses 64-bit slots.
    pub fn is_64bit(self) -> bool {
        match self {
            PointerFormat::Arm64e
            | PointerFormat::Ptr64
            | PointerFormat::Ptr64Offset
            | PointerFormat::Arm64eKernel
            | PointerFormat::Ptr64KernelCache
            | PointerFormat::Arm64eUserland
            | PointerFormat::Arm64eFirmware
            | PointerFormat::X86_64KernelCache
            | PointerFormat::Arm64eUserland24 => true,
            PointerFormat::Ptr32 | PointerFormat::Ptr32Cache | PointerFormat::Ptr32Firmware => {
                false
            }
        }
    }

    /// The distance in bytes covered by one unit of a slot's `next` field.
    ///
    /// This is a property of the page format, not of individual entries.
    pub fn stride(self) -> usize {
        match self {
            PointerFormat::Arm64e
            | PointerFormat::Arm64eUserland
            | PointerFormat::Arm64eUserland24 => 8,
            PointerFormat::Arm64eKernel
            | PointerFormat::Arm64eFirmware
            | PointerFormat::Ptr64
            | PointerFormat::Ptr64Offset
            | PointerFormat::Ptr64KernelCache
            | PointerFormat::Ptr32
            | PointerFormat::Ptr32Cache
            | PointerFormat::Ptr32Firmware => 4,
            PointerFormat::X86_64KernelCache => 1,
        }
    }
}

/// Pointer authentication key of an authenticated fixup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKey {
    /// Instruction key A.
    Ia,
    /// Instruction key B.
    Ib,
    /// Data key A.
    Da,
    /// Data key B.
    Db,
}

impl PointerKey {
    fn from_bits(bits: u64) -> Self {
        match bits & 3 {
            0 => PointerKey::Ia,
            1 => PointerKey::Ib,
            2 => PointerKey::Da,
            _ => PointerKey::Db,
        }
    }

    /// The conventional name of the key.
    pub fn name(self) -> &'static str {
        match self {
            PointerKey::Ia => "IA",
            PointerKey::Ib => "IB",
            PointerKey::Da => "DA",
            PointerKey::Db => "DB",
        }
    }
}

/// Pointer authentication data carried by an authenticated fixup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthInfo {
    /// Key diversity value.
    pub diversity: u16,
    /// Whether the address is blended into the diversity.
    pub address_diversity: bool,
    /// The signing key.
    pub key: PointerKey,
}

/// A decoded rebase slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rebase {
    /// The rebase target: a vm address or runtime offset depending on the
    /// pointer format.
    pub target: u64,
    /// Value for the top 8 bits of the rebased pointer, where the format
    /// carries one.
    pub high8: u8,
    /// Which cache the target is relative to, for kernel cache formats.
    pub cache_level: Option<u8>,
    /// Authentication data, for authenticated formats.
    pub auth: Option<AuthInfo>,
}

/// A decoded bind slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bind {
    /// Ordinal into the imports table.
    pub ordinal: u32,
    /// Signed addend to the bound symbol.
    pub addend: i64,
    /// Authentication data, for authenticated formats.
    pub auth: Option<AuthInfo>,
}

/// The decoded content of one chain slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupEntry {
    /// Adjust a pointer by the load-time slide.
    Rebase(Rebase),
    /// Resolve a pointer to an imported symbol.
    Bind(Bind),
}

/// One decoded slot of a fixup chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    /// Byte offset of the slot within the walked data.
    pub offset: usize,
    /// The raw slot value, zero extended for 32-bit formats.
    pub raw: u64,
    /// Distance to the next slot in strides. 0 means this is the last
    /// slot of the chain.
    pub next: u32,
    /// The decoded slot content.
    pub entry: FixupEntry,
}

/// A lazy walk over one fixup chain.
///
/// Driven only by the data, format and start offset it was constructed
/// from, so constructing it again restarts the same sequence. The extent
/// of `data` (normally one page, or the whole segment) is the hard ceiling
/// of the traversal: a chain whose `next` distances run past it fails with
/// `ChainOutOfRange` instead of reading further.
#[derive(Debug, Clone)]
pub struct FixupChain<'data> {
    data: Bytes<'data>,
    format: PointerFormat,
    offset: usize,
    finished: bool,
}

impl<'data> FixupChain<'data> {
    /// Construct a walk starting at `start_offset` within `data`.
    pub fn new(data: Bytes<'data>, format: PointerFormat, start_offset: usize) -> Self {
        FixupChain {
            data,
            format,
            offset: start_offset,
            finished: false,
        }
    }

    /// Return the next fixup of the chain, if any.
    pub fn next(&mut self) -> Result<Option<Fixup>> {
        if self.finished {
            return Ok(None);
        }
        let offset = self.offset;
        let raw = match self.read_slot(offset) {
            Ok(raw) => raw,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };
        let (entry, next) = decode_slot(self.format, raw);
        if next == 0 {
            self.finished = true;
        } else {
            match offset.checked_add(next as usize * self.format.stride()) {
                Some(next_offset) => self.offset = next_offset,
                None => {
                    self.finished = true;
                    return Err(Error::new(
                        ErrorKind::ChainOutOfRange,
                        "Fixup chain offset overflow",
                    ));
                }
            }
        }
        Ok(Some(Fixup {
            offset,
            raw,
            next,
            entry,
        }))
    }

    fn read_slot(&self, offset: usize) -> Result<u64> {
        let size = self.format.slot_size();
        let bytes = self.data.read_bytes_at(offset, size).map_err(|()| {
            Error::new(
                ErrorKind::ChainOutOfRange,
                "Fixup chain exceeds its page bounds",
            )
        })?;
        if size == 8 {
            // Slot offsets need not be aligned (the x86_64 kernel cache
            // format has stride 1), so go through byte arrays.
            let array: [u8; 8] = bytes.0.try_into().unwrap_or([0; 8]);
            Ok(u64::from_le_bytes(array))
        } else {
            let array: [u8; 4] = bytes.0.try_into().unwrap_or([0; 4]);
            Ok(u32::from_le_bytes(array).into())
        }
    }
}

impl<'data> Iterator for FixupChain<'data> {
    type Item = Result<Fixup>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next().transpose()
    }
}

// Decode one slot word according to the page's pointer format. The format
// determines which bit-field layout table from `crate::fixups` applies;
// the bind/auth selector bits inside the word pick the variant.
fn decode_slot(format: PointerFormat, raw: u64) -> (FixupEntry, u32) {
    use crate::fixups::*;

    match format {
        PointerFormat::Arm64e
        | PointerFormat::Arm64eKernel
        | PointerFormat::Arm64eUserland
        | PointerFormat::Arm64eFirmware
        | PointerFormat::Arm64eUserland24 => {
            let next = ARM64E_NEXT.extract(raw) as u32;
            let is_bind = ARM64E_BIND.extract(raw) != 0;
            let is_auth = ARM64E_AUTH.extract(raw) != 0;
            let userland24 = format == PointerFormat::Arm64eUserland24;
            let entry = match (is_bind, is_auth) {
                (false, false) => FixupEntry::Rebase(Rebase {
                    target: ARM64E_REBASE_TARGET.extract(raw),
                    high8: ARM64E_REBASE_HIGH8.extract(raw) as u8,
                    cache_level: None,
                    auth: None,
                }),
                (false, true) => FixupEntry::Rebase(Rebase {
                    target: ARM64E_AUTH_REBASE_TARGET.extract(raw),
                    high8: 0,
                    cache_level: None,
                    auth: Some(AuthInfo {
                        diversity: ARM64E_AUTH_REBASE_DIVERSITY.extract(raw) as u16,
                        address_diversity: ARM64E_AUTH_REBASE_ADDR_DIV.extract(raw) != 0,
                        key: PointerKey::from_bits(ARM64E_AUTH_REBASE_KEY.extract(raw)),
                    }),
                }),
                (true, false) => {
                    let ordinal = if userland24 {
                        ARM64E_BIND24_ORDINAL.extract(raw)
                    } else {
                        ARM64E_BIND_ORDINAL.extract(raw)
                    };
                    FixupEntry::Bind(Bind {
                        ordinal: ordinal as u32,
                        addend: ARM64E_BIND_ADDEND.extract_signed(raw),
                        auth: None,
                    })
                }
                (true, true) => {
                    let ordinal = if userland24 {
                        ARM64E_AUTH_BIND24_ORDINAL.extract(raw)
                    } else {
                        ARM64E_AUTH_BIND_ORDINAL.extract(raw)
                    };
                    FixupEntry::Bind(Bind {
                        ordinal: ordinal as u32,
                        addend: 0,
                        auth: Some(AuthInfo {
                            diversity: ARM64E_AUTH_BIND_DIVERSITY.extract(raw) as u16,
                            address_diversity: ARM64E_AUTH_BIND_ADDR_DIV.extract(raw) != 0,
                            key: PointerKey::from_bits(ARM64E_AUTH_BIND_KEY.extract(raw)),
                        }),
                    })
                }
            };
            (entry, next)
        }
        PointerFormat::Ptr64 | PointerFormat::Ptr64Offset => {
            let next = PTR64_NEXT.extract(raw) as u32;
            let entry = if PTR64_BIND.extract(raw) != 0 {
                FixupEntry::Bind(Bind {
                    ordinal: PTR64_BIND_ORDINAL.extract(raw) as u32,
                    addend: PTR64_BIND_ADDEND.extract(raw) as i64,
                    auth: None,
                })
            } else {
                FixupEntry::Rebase(Rebase {
                    target: PTR64_REBASE_TARGET.extract(raw),
                    high8: PTR64_REBASE_HIGH8.extract(raw) as u8,
                    cache_level: None,
                    auth: None,
                })
            };
            (entry, next)
        }
        PointerFormat::Ptr64KernelCache | PointerFormat::X86_64KernelCache => {
            let next = KERNEL_CACHE_NEXT.extract(raw) as u32;
            let auth = if KERNEL_CACHE_IS_AUTH.extract(raw) != 0 {
                Some(AuthInfo {
                    diversity: KERNEL_CACHE_REBASE_DIVERSITY.extract(raw) as u16,
                    address_diversity: KERNEL_CACHE_REBASE_ADDR_DIV.extract(raw) != 0,
                    key: PointerKey::from_bits(KERNEL_CACHE_REBASE_KEY.extract(raw)),
                })
            } else {
                None
            };
            let entry = FixupEntry::Rebase(Rebase {
                target: KERNEL_CACHE_REBASE_TARGET.extract(raw),
                high8: 0,
                cache_level: Some(KERNEL_CACHE_REBASE_CACHE_LEVEL.extract(raw) as u8),
                auth,
            });
            (entry, next)
        }
        PointerFormat::Ptr32 => {
            let next = PTR32_NEXT.extract(raw) as u32;
            let entry = if PTR32_BIND.extract(raw) != 0 {
                FixupEntry::Bind(Bind {
                    ordinal: PTR32_BIND_ORDINAL.extract(raw) as u32,
                    addend: PTR32_BIND_ADDEND.extract(raw) as i64,
                    auth: None,
                })
            } else {
                FixupEntry::Rebase(Rebase {
                    target: PTR32_REBASE_TARGET.extract(raw),
                    high8: 0,
                    cache_level: None,
                    auth: None,
                })
            };
            (entry, next)
        }
        PointerFormat::Ptr32Cache => {
            let next = PTR32_CACHE_NEXT.extract(raw) as u32;
            let entry = FixupEntry::Rebase(Rebase {
                target: PTR32_CACHE_REBASE_TARGET.extract(raw),
                high8: 0,
                cache_level: None,
                auth: None,
            });
            (entry, next)
        }
        PointerFormat::Ptr32Firmware => {
            let next = PTR32_FIRMWARE_NEXT.extract(raw) as u32;
            let entry = FixupEntry::Rebase(Rebase {
                target: PTR32_FIRMWARE_REBASE_TARGET.extract(raw),
                high8: 0,
                cache_level: None,
                auth: None,
            });
            (entry, next)
        }
    }
}

/// The format of the entries of a chained fixups imports table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportsFormat {
    /// `DYLD_CHAINED_IMPORT`
    Import,
    /// `DYLD_CHAINED_IMPORT_ADDEND`
    ImportAddend,
    /// `DYLD_CHAINED_IMPORT_ADDEND64`
    ImportAddend64,
}

impl ImportsFormat {
    /// Decode a raw imports format value.
    pub fn from_u32(raw: u32) -> Result<Self> {
        Ok(match raw {
            fixups::DYLD_CHAINED_IMPORT => ImportsFormat::Import,
            fixups::DYLD_CHAINED_IMPORT_ADDEND => ImportsFormat::ImportAddend,
            fixups::DYLD_CHAINED_IMPORT_ADDEND64 => ImportsFormat::ImportAddend64,
            _ => {
                return Err(Error::new(
                    ErrorKind::UnsupportedVersion,
                    "Unsupported chained fixups imports format",
                ))
            }
        })
    }

    /// Size in bytes of one entry.
    pub fn entry_size(self) -> usize {
        match self {
            ImportsFormat::Import => 4,
            ImportsFormat::ImportAddend => 8,
            ImportsFormat::ImportAddend64 => 16,
        }
    }
}

/// One decoded import of a chained fixups payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainedImport {
    /// The library ordinal with the dyld sign convention applied, so that
    /// special ordinals are negative.
    pub lib_ordinal: i32,
    /// Whether a missing import should bind to NULL instead of failing.
    pub weak_import: bool,
    /// Offset of the symbol name in the payload's string pool.
    pub name_offset: u32,
    /// Addend to the bound symbol. Always 0 for `ImportsFormat::Import`.
    pub addend: i64,
}

/// The imports table of a chained fixups payload.
#[derive(Debug, Clone, Copy)]
pub struct ChainedImports<'data> {
    data: Bytes<'data>,
    format: ImportsFormat,
    count: u32,
}

impl<'data> ChainedImports<'data> {
    /// The number of imports.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The format of the table's entries.
    pub fn format(&self) -> ImportsFormat {
        self.format
    }

    /// Return the import with the given ordinal.
    pub fn get(&self, index: u32) -> Result<ChainedImport> {
        if index >= self.count {
            return Err(Error::new(
                ErrorKind::OutOfRange,
                "Chained import ordinal out of range",
            ));
        }
        let offset = index as usize * self.format.entry_size();
        let endian = LittleEndian;
        match self.format {
            ImportsFormat::Import => {
                let import = self
                    .data
                    .read_at::<fixups::DyldChainedImport<LittleEndian>>(offset)
                    .read_error("Invalid chained import")?;
                Ok(ChainedImport {
                    lib_ordinal: import.library_ordinal(endian),
                    weak_import: import.weak_import(endian),
                    name_offset: import.name_offset(endian),
                    addend: 0,
                })
            }
            ImportsFormat::ImportAddend => {
                let import = self
                    .data
                    .read_at::<fixups::DyldChainedImportAddend<LittleEndian>>(offset)
                    .read_error("Invalid chained import")?;
                Ok(ChainedImport {
                    lib_ordinal: import.library_ordinal(endian),
                    weak_import: import.weak_import(endian),
                    name_offset: import.name_offset(endian),
                    addend: import.addend.get(endian) as i64,
                })
            }
            ImportsFormat::ImportAddend64 => {
                let import = self
                    .data
                    .read_at::<fixups::DyldChainedImportAddend64<LittleEndian>>(offset)
                    .read_error("Invalid chained import")?;
                Ok(ChainedImport {
                    lib_ordinal: import.library_ordinal(endian),
                    weak_import: import.weak_import(endian),
                    name_offset: import.name_offset(endian),
                    addend: import.addend.get(endian) as i64,
                })
            }
        }
    }

    /// Iterate over the imports in ordinal order.
    pub fn iter(&self) -> ChainedImportIterator<'data> {
        ChainedImportIterator {
            imports: *self,
            index: 0,
        }
    }
}

/// An iterator over the imports of a chained fixups payload.
#[derive(Debug, Clone)]
pub struct ChainedImportIterator<'data> {
    imports: ChainedImports<'data>,
    index: u32,
}

impl<'data> ChainedImportIterator<'data> {
    /// Return the next import, if any.
    pub fn next(&mut self) -> Result<Option<ChainedImport>> {
        if self.index >= self.imports.count() {
            return Ok(None);
        }
        let import = self.imports.get(self.index)?;
        self.index += 1;
        Ok(Some(import))
    }
}

impl<'data> Iterator for ChainedImportIterator<'data> {
    type Item = Result<ChainedImport>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next().transpose()
    }
}
