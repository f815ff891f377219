//! Support for reading Rosetta AOT caches.
//!
//! An AOT cache pairs x86_64 code with its arm64 translation. Three
//! historical layouts of the per-fragment metadata exist and are not
//! distinguishable from the bytes alone (the record sizes were kept
//! compatible across revisions), so every fragment-level reader takes an
//! explicit [`AotSchema`] selector chosen by the caller from OS version
//! context.

use core::convert::TryInto;

use uuid::Uuid;

use crate::aot;
use crate::endian::LittleEndian;
use crate::pod::Bytes;
use crate::read::{Error, ErrorKind, ReadError, Result};

/// The historical layout of an AOT cache's fragment metadata.
///
/// The layout cannot be inferred from the bytes, so callers must select it
/// from context (the producing OS version).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AotSchema {
    /// Bare eight-field fragment records in a flat table; sub-blob offsets
    /// are relative to the start of the linkedit segment. Branch-data
    /// headers carry a trailing 16-bit kind with kinds numbered from 0.
    V1,
    /// Bare records reached through a wrapping `aot_metadata_command`;
    /// offsets are also linkedit relative. Branch-data headers carry a
    /// leading 32-bit kind with kinds numbered from 1.
    V2,
    /// Tagged ten-field records laid out inline in the cache, each record
    /// followed by its branch-data and instruction-map blobs; offsets are
    /// relative to the start of the fragment region. Branch-data headers
    /// as in `V2`.
    V3,
}

/// A parsed AOT cache file.
#[derive(Debug, Clone, Copy)]
pub struct AotCache<'data> {
    data: Bytes<'data>,
    header: &'data aot::AotCacheHeader<LittleEndian>,
}

impl<'data> AotCache<'data> {
    /// Parse the raw AOT cache data.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let data = Bytes(data);
        let header = data
            .read_at::<aot::AotCacheHeader<LittleEndian>>(0)
            .read_error("Invalid AOT cache header size or alignment")?;
        if header.magic != aot::AOT_CACHE_MAGIC {
            return Err(Error::new(
                ErrorKind::BadMagic,
                "Unrecognized AOT cache magic",
            ));
        }
        if header.header_size.get(LittleEndian) as usize > data.len() {
            return Err(Error::new(
                ErrorKind::OutOfRange,
                "AOT cache header size exceeds buffer",
            ));
        }
        Ok(AotCache { data, header })
    }

    /// Return the raw header.
    pub fn header(&self) -> &'data aot::AotCacheHeader<LittleEndian> {
        self.header
    }

    /// The UUID of the translated (arm64) cache.
    pub fn uuid(&self) -> Uuid {
        Uuid::from_bytes(self.header.uuid)
    }

    /// The UUID of the x86_64 cache this was translated from.
    pub fn x86_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.header.x86_uuid)
    }

    /// The translator version, trimmed at the first NUL.
    pub fn version_bytes(&self) -> &'data [u8] {
        let bytes = &self.header.cambria_version[..];
        match memchr::memchr(b'\0', bytes) {
            Some(null) => &bytes[..null],
            None => bytes,
        }
    }

    /// The translator version as a string, if it is valid UTF-8.
    pub fn version(&self) -> Option<&'data str> {
        core::str::from_utf8(self.version_bytes()).ok()
    }

    /// The number of code fragments in the cache.
    pub fn fragment_count(&self) -> u32 {
        self.header.num_code_fragments.get(LittleEndian)
    }

    /// The declared header size.
    pub fn header_size(&self) -> u32 {
        self.header.header_size.get(LittleEndian)
    }

    /// Return the code signature bytes.
    pub fn code_signature(&self) -> Result<Bytes<'data>> {
        let offset: usize = self
            .header
            .code_signature_offset
            .get(LittleEndian)
            .try_into()
            .ok()
            .read_error("Invalid AOT cache code signature offset")?;
        let size: usize = self
            .header
            .code_signature_size
            .get(LittleEndian)
            .try_into()
            .ok()
            .read_error("Invalid AOT cache code signature size")?;
        self.data
            .read_bytes_at(offset, size)
            .read_error("AOT cache code signature out of range")
    }

    /// Return the fragment metadata table starting at the given file
    /// offset.
    ///
    /// Locating the fragment region is the caller's responsibility, as is
    /// choosing the schema; the fragment count comes from the header.
    pub fn fragments(&self, schema: AotSchema, region_offset: usize) -> Result<AotFragments<'data>> {
        let mut data = self.data;
        data.skip(region_offset)
            .read_error("Invalid AOT cache fragment region offset")?;
        Ok(AotFragments {
            data,
            schema,
            count: self.fragment_count(),
        })
    }
}

/// The fragment metadata table of an AOT cache.
#[derive(Debug, Clone, Copy)]
pub struct AotFragments<'data> {
    data: Bytes<'data>,
    schema: AotSchema,
    count: u32,
}

impl<'data> AotFragments<'data> {
    /// Construct a fragment table from a fragment region supplied by the
    /// caller.
    pub fn new(data: Bytes<'data>, schema: AotSchema, count: u32) -> Self {
        AotFragments {
            data,
            schema,
            count,
        }
    }

    /// The declared number of fragments.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The fragment region, which `AotSchema::V3` sub-blob offsets are
    /// relative to.
    pub fn region(&self) -> Bytes<'data> {
        self.data
    }

    /// Iterate over the fragment records.
    pub fn iter(&self) -> AotFragmentIterator<'data> {
        AotFragmentIterator {
            data: self.data,
            schema: self.schema,
            remaining: self.count,
            offset: 0,
        }
    }
}

/// An iterator over the fragment records of an AOT cache.
///
/// Yields per-record results, so one malformed fragment does not prevent
/// callers from attempting its siblings in a flat-table schema; for
/// `AotSchema::V3` the records are chained by size, so iteration stops at
/// the first error.
#[derive(Debug, Clone)]
pub struct AotFragmentIterator<'data> {
    data: Bytes<'data>,
    schema: AotSchema,
    remaining: u32,
    offset: usize,
}

impl<'data> AotFragmentIterator<'data> {
    /// Return the next fragment record, if any.
    pub fn next(&mut self) -> Result<Option<AotFragment<'data>>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        match self.schema {
            AotSchema::V1 | AotSchema::V2 => {
                let metadata = self
                    .data
                    .read_at::<aot::AotCodeFragmentMetadata<LittleEndian>>(self.offset)
                    .read_error("Invalid AOT fragment metadata")?;
                self.offset += core::mem::size_of::<aot::AotCodeFragmentMetadata<LittleEndian>>();
                Ok(Some(AotFragment::Bare(metadata)))
            }
            AotSchema::V3 => {
                let metadata = self
                    .data
                    .read_at::<aot::AotCacheCodeFragmentMetadata<LittleEndian>>(self.offset)
                    .read_error("Invalid AOT fragment metadata")?;
                // The record is followed by its branch-data and
                // instruction-map blobs.
                let mut next = self.offset
                    + core::mem::size_of::<aot::AotCacheCodeFragmentMetadata<LittleEndian>>();
                let branch_data_size: usize = metadata
                    .branch_data_size
                    .get(LittleEndian)
                    .try_into()
                    .ok()
                    .read_error("Invalid AOT fragment branch data size")?;
                let instruction_map_size: usize = metadata
                    .instruction_map_size
                    .get(LittleEndian)
                    .try_into()
                    .ok()
                    .read_error("Invalid AOT fragment instruction map size")?;
                next = next
                    .checked_add(branch_data_size)
                    .and_then(|next| next.checked_add(instruction_map_size))
                    .read_error("Invalid AOT fragment size")?;
                self.offset = next;
                Ok(Some(AotFragment::Tagged(metadata)))
            }
        }
    }
}

impl<'data> Iterator for AotFragmentIterator<'data> {
    type Item = Result<AotFragment<'data>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next().transpose()
    }
}

/// One fragment metadata record.
#[derive(Debug, Clone, Copy)]
pub enum AotFragment<'data> {
    /// A tagged record (`AotSchema::V3`).
    Tagged(&'data aot::AotCacheCodeFragmentMetadata<LittleEndian>),
    /// A bare record (`AotSchema::V1` and `AotSchema::V2`).
    Bare(&'data aot::AotCodeFragmentMetadata<LittleEndian>),
}

impl<'data> AotFragment<'data> {
    /// The fragment type tag, for schemas that carry one.
    pub fn fragment_type(&self) -> Option<u32> {
        match self {
            AotFragment::Tagged(metadata) => Some(metadata.fragment_type.get(LittleEndian)),
            AotFragment::Bare(_) => None,
        }
    }

    /// The offset of the source image path in the x86 shared cache, for
    /// schemas that carry one.
    pub fn image_path_offset(&self) -> Option<i32> {
        match self {
            AotFragment::Tagged(metadata) => Some(metadata.image_path_offset.get(LittleEndian)),
            AotFragment::Bare(_) => None,
        }
    }

    /// The offset of the x86 code this fragment was translated from.
    pub fn x86_code_offset(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.x86_code_offset.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.x86_code_offset.get(LittleEndian),
        }
    }

    /// The size of the x86 code.
    pub fn x86_code_size(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.x86_code_size.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.x86_code_size.get(LittleEndian),
        }
    }

    /// The offset of the translated arm64 code.
    pub fn arm_code_offset(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.arm_code_offset.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.arm_code_offset.get(LittleEndian),
        }
    }

    /// The size of the translated arm64 code.
    pub fn arm_code_size(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.arm_code_size.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.arm_code_size.get(LittleEndian),
        }
    }

    /// The offset of the branch-data blob, relative to the schema's base.
    pub fn branch_data_offset(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.branch_data_offset.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.branch_data_offset.get(LittleEndian),
        }
    }

    /// The size of the branch-data blob.
    pub fn branch_data_size(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.branch_data_size.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.branch_data_size.get(LittleEndian),
        }
    }

    /// The offset of the instruction-map blob, relative to the schema's
    /// base.
    pub fn instruction_map_offset(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.instruction_map_offset.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.instruction_map_offset.get(LittleEndian),
        }
    }

    /// The size of the instruction-map blob.
    pub fn instruction_map_size(&self) -> i32 {
        match self {
            AotFragment::Tagged(metadata) => metadata.instruction_map_size.get(LittleEndian),
            AotFragment::Bare(metadata) => metadata.instruction_map_size.get(LittleEndian),
        }
    }

    /// Return the fragment's branch-data blob.
    ///
    /// `base` is the region the fragment's offsets are relative to: the
    /// linkedit segment for `AotSchema::V1` and `AotSchema::V2`, the
    /// fragment region for `AotSchema::V3`. The base differs by schema and
    /// is deliberately explicit rather than remembered by the record.
    pub fn branch_data(
        &self,
        base: Bytes<'data>,
        schema: AotSchema,
    ) -> Result<AotBranchData<'data>> {
        let data = sub_blob(
            base,
            self.branch_data_offset(),
            self.branch_data_size(),
            "AOT branch data out of range",
        )?;
        AotBranchData::parse(data, schema)
    }

    /// Return the fragment's instruction-map blob.
    ///
    /// `base` is the region the fragment's offsets are relative to, as for
    /// [`Self::branch_data`].
    pub fn instruction_map(&self, base: Bytes<'data>) -> Result<AotInstructionMap<'data>> {
        let data = sub_blob(
            base,
            self.instruction_map_offset(),
            self.instruction_map_size(),
            "AOT instruction map out of range",
        )?;
        AotInstructionMap::parse(data)
    }
}

fn sub_blob<'data>(
    base: Bytes<'data>,
    offset: i32,
    size: i32,
    message: &'static str,
) -> Result<Bytes<'data>> {
    let offset: usize = offset.try_into().ok().read_error(message)?;
    let size: usize = size.try_into().ok().read_error(message)?;
    base.read_bytes_at(offset, size).read_error(message)
}

/// The index entry encoding of a branch-data blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDataKind {
    /// 5-byte entries.
    Compact,
    /// 9-byte entries.
    Standard,
    /// 10-byte entries.
    Extended,
}

impl BranchDataKind {
    /// Size in bytes of one index entry.
    pub fn entry_size(self) -> usize {
        match self {
            BranchDataKind::Compact => 5,
            BranchDataKind::Standard => 9,
            BranchDataKind::Extended => 10,
        }
    }

    // The kind numbering moved between schema revisions.
    fn from_raw(schema: AotSchema, raw: u32) -> Result<Self> {
        let kind = match schema {
            AotSchema::V1 => match raw {
                0 => BranchDataKind::Compact,
                1 => BranchDataKind::Standard,
                2 => BranchDataKind::Extended,
                _ => {
                    return Err(Error::new(
                        ErrorKind::UnsupportedVersion,
                        "Unsupported AOT branch data kind",
                    ))
                }
            },
            AotSchema::V2 | AotSchema::V3 => match raw {
                aot::AOT_BRANCH_DATA_COMPACT => BranchDataKind::Compact,
                aot::AOT_BRANCH_DATA_STANDARD => BranchDataKind::Standard,
                aot::AOT_BRANCH_DATA_EXTENDED => BranchDataKind::Extended,
                _ => {
                    return Err(Error::new(
                        ErrorKind::UnsupportedVersion,
                        "Unsupported AOT branch data kind",
                    ))
                }
            },
        };
        Ok(kind)
    }
}

/// A fragment's branch-data blob.
#[derive(Debug, Clone, Copy)]
pub struct AotBranchData<'data> {
    data: Bytes<'data>,
    schema: AotSchema,
    kind: u32,
    data_size: u32,
    entry_count: u32,
}

impl<'data> AotBranchData<'data> {
    /// Parse a branch-data blob.
    ///
    /// The header layout and the kind numbering depend on the schema.
    pub fn parse(data: Bytes<'data>, schema: AotSchema) -> Result<Self> {
        let endian = LittleEndian;
        let (kind, data_size, entry_count) = match schema {
            AotSchema::V1 => {
                let header = data
                    .read_at::<aot::AotBranchDataHeaderV1<LittleEndian>>(0)
                    .read_error("Invalid AOT branch data header")?;
                (
                    header.kind.get(endian).into(),
                    header.data_size.get(endian),
                    header.entry_count.get(endian),
                )
            }
            AotSchema::V2 | AotSchema::V3 => {
                let header = data
                    .read_at::<aot::AotBranchDataHeader<LittleEndian>>(0)
                    .read_error("Invalid AOT branch data header")?;
                (
                    header.kind.get(endian),
                    header.data_size.get(endian),
                    header.entry_count.get(endian),
                )
            }
        };
        Ok(AotBranchData {
            data,
            schema,
            kind,
            data_size,
            entry_count,
        })
    }

    /// The raw kind value.
    pub fn kind_raw(&self) -> u32 {
        self.kind
    }

    /// The index entry encoding.
    pub fn kind(&self) -> Result<BranchDataKind> {
        BranchDataKind::from_raw(self.schema, self.kind)
    }

    /// The declared size of the data following the header.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// The declared number of index entries.
    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    /// Return the index entries.
    pub fn entries(&self) -> Result<BranchDataEntries<'data>> {
        let kind = self.kind()?;
        let count = self.entry_count as usize;
        let size = count
            .checked_mul(kind.entry_size())
            .read_error("AOT branch data entry count overflow")?;
        if size > self.data_size as usize {
            return Err(Error::new(
                ErrorKind::InconsistentLayout,
                "AOT branch data entries exceed declared size",
            ));
        }
        let header_size = core::mem::size_of::<aot::AotBranchDataHeader<LittleEndian>>();
        let entries = match kind {
            BranchDataKind::Compact => BranchDataEntries::Compact(
                self.data
                    .read_slice_at(header_size, count)
                    .read_error("AOT branch data entries out of range")?,
            ),
            BranchDataKind::Standard => BranchDataEntries::Standard(
                self.data
                    .read_slice_at(header_size, count)
                    .read_error("AOT branch data entries out of range")?,
            ),
            BranchDataKind::Extended => BranchDataEntries::Extended(
                self.data
                    .read_slice_at(header_size, count)
                    .read_error("AOT branch data entries out of range")?,
            ),
        };
        Ok(entries)
    }
}

/// The index entries of a branch-data blob, in the encoding selected by
/// the blob's kind.
#[derive(Debug, Clone, Copy)]
pub enum BranchDataEntries<'data> {
    /// `BranchDataKind::Compact` entries.
    Compact(&'data [aot::AotBranchDataIndexEntryCompact<LittleEndian>]),
    /// `BranchDataKind::Standard` entries.
    Standard(&'data [aot::AotBranchDataIndexEntry<LittleEndian>]),
    /// `BranchDataKind::Extended` entries.
    Extended(&'data [aot::AotBranchDataIndexEntryExtended<LittleEndian>]),
}

impl<'data> BranchDataEntries<'data> {
    /// The number of entries.
    pub fn len(&self) -> usize {
        match self {
            BranchDataEntries::Compact(entries) => entries.len(),
            BranchDataEntries::Standard(entries) => entries.len(),
            BranchDataEntries::Extended(entries) => entries.len(),
        }
    }

    /// Return true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of one entry.
    pub fn entry_size(&self) -> usize {
        match self {
            BranchDataEntries::Compact(_) => BranchDataKind::Compact.entry_size(),
            BranchDataEntries::Standard(_) => BranchDataKind::Standard.entry_size(),
            BranchDataEntries::Extended(_) => BranchDataKind::Extended.entry_size(),
        }
    }

    /// Total size in bytes of the entries.
    pub fn total_size(&self) -> usize {
        self.len() * self.entry_size()
    }
}

/// A fragment's instruction-map blob.
#[derive(Debug, Clone, Copy)]
pub struct AotInstructionMap<'data> {
    data: Bytes<'data>,
    header: &'data aot::AotInstructionMapHeader<LittleEndian>,
    consistent: bool,
}

impl<'data> AotInstructionMap<'data> {
    /// Parse an instruction-map blob.
    pub fn parse(data: Bytes<'data>) -> Result<Self> {
        let endian = LittleEndian;
        let header = data
            .read_at::<aot::AotInstructionMapHeader<LittleEndian>>(0)
            .read_error("Invalid AOT instruction map header")?;
        // The header records where the submaps begin, which is derivable
        // from the index extent. The field is otherwise unused here, so a
        // contradiction flags the record instead of failing the decode.
        let index_end = (header.index_offset.get(endian) as u64)
            + 4 * (header.entry_count.get(endian) as u64);
        let consistent = u64::from(header.first_submap_offset.get(endian)) == index_end;
        #[cfg(feature = "logging")]
        if !consistent {
            log::warn!(
                "AOT instruction map first submap offset {:#x} does not match index end {:#x}",
                header.first_submap_offset.get(endian),
                index_end,
            );
        }
        Ok(AotInstructionMap {
            data,
            header,
            consistent,
        })
    }

    /// Return the raw header.
    pub fn header(&self) -> &'data aot::AotInstructionMapHeader<LittleEndian> {
        self.header
    }

    /// The declared size of the whole blob.
    pub fn map_size(&self) -> u32 {
        self.header.map_size.get(LittleEndian)
    }

    /// The declared number of index entries.
    pub fn entry_count(&self) -> u32 {
        self.header.entry_count.get(LittleEndian)
    }

    /// Return false if the header's submap offset contradicts its index
    /// extent. The record is still usable.
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    /// Return the index entries.
    pub fn entries(&self) -> Result<&'data [aot::AotInstructionMapIndexEntry<LittleEndian>]> {
        let endian = LittleEndian;
        let offset = self.header.index_offset.get(endian) as usize;
        let count = self.header.entry_count.get(endian) as usize;
        let size = count
            .checked_mul(core::mem::size_of::<
                aot::AotInstructionMapIndexEntry<LittleEndian>,
            >())
            .read_error("AOT instruction map entry count overflow")?;
        let end = offset
            .checked_add(size)
            .read_error("AOT instruction map entry count overflow")?;
        if end > self.map_size() as usize {
            return Err(Error::new(
                ErrorKind::InconsistentLayout,
                "AOT instruction map entries exceed declared size",
            ));
        }
        self.data
            .read_slice_at(offset, count)
            .read_error("AOT instruction map entries out of range")
    }

    /// Return the submap bytes, which this crate does not interpret.
    pub fn submaps(&self) -> Result<Bytes<'data>> {
        let offset = self.header.first_submap_offset.get(LittleEndian) as usize;
        let size = (self.map_size() as usize)
            .checked_sub(offset)
            .read_error("AOT instruction map submap offset out of range")?;
        self.data
            .read_bytes_at(offset, size)
            .read_error("AOT instruction map submaps out of range")
    }
}

/// A parsed `LC_AOT_METADATA` load command.
#[derive(Debug, Clone, Copy)]
pub struct AotMetadata<'data> {
    command: &'data aot::AotMetadataCommand<LittleEndian>,
}

impl<'data> AotMetadata<'data> {
    /// Parse an `aot_metadata_command` at the start of the given data.
    pub fn parse(data: Bytes<'data>) -> Result<Self> {
        let command = data
            .read_at::<aot::AotMetadataCommand<LittleEndian>>(0)
            .read_error("Invalid AOT metadata command")?;
        if command.cmd.get(LittleEndian) != aot::LC_AOT_METADATA {
            return Err(Error::new(
                ErrorKind::BadMagic,
                "Unrecognized AOT metadata command",
            ));
        }
        Ok(AotMetadata { command })
    }

    /// Return the raw load command.
    pub fn command(&self) -> &'data aot::AotMetadataCommand<LittleEndian> {
        self.command
    }

    /// Return the x86 image path, given the linkedit segment bytes.
    ///
    /// The path is stored NUL padded; the returned bytes are trimmed at
    /// the first NUL.
    pub fn image_path(&self, linkedit: Bytes<'data>) -> Result<&'data [u8]> {
        let endian = LittleEndian;
        let offset = self.command.x86_image_path_offset.get(endian) as usize;
        let size = self.command.x86_image_path_size.get(endian) as usize;
        let bytes = linkedit
            .read_bytes_at(offset, size)
            .read_error("AOT metadata image path out of range")?;
        Ok(match memchr::memchr(b'\0', bytes.0) {
            Some(null) => &bytes.0[..null],
            None => bytes.0,
        })
    }

    /// Return the wrapped fragment metadata record, given the linkedit
    /// segment bytes.
    pub fn fragment(
        &self,
        linkedit: Bytes<'data>,
    ) -> Result<&'data aot::AotCodeFragmentMetadata<LittleEndian>> {
        let offset = self.command.fragment_offset.get(LittleEndian) as usize;
        linkedit
            .read_at::<aot::AotCodeFragmentMetadata<LittleEndian>>(offset)
            .read_error("AOT metadata fragment out of range")
    }
}
