use dyld_meta::aot::{
    AotCacheCodeFragmentMetadata, AotCodeFragmentMetadata, AotInstructionMapIndexEntry,
    LC_AOT_METADATA,
};
use dyld_meta::read::aot::{
    AotBranchData, AotCache, AotFragment, AotFragments, AotInstructionMap, AotMetadata, AotSchema,
    BranchDataEntries, BranchDataKind,
};
use dyld_meta::read::ErrorKind;
use dyld_meta::{bytes_of, Bytes, LittleEndian, I32, U32};

fn build_header(fragment_count: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"ROSETTA\0");
    data.extend_from_slice(&[0x11; 16]); // uuid
    data.extend_from_slice(&[0x22; 16]); // x86_uuid
    let mut version = [0u8; 32];
    version[..13].copy_from_slice(b"Rosetta-318.9");
    data.extend_from_slice(&version);
    data.extend_from_slice(&0u64.to_le_bytes()); // code_signature_offset
    data.extend_from_slice(&0u64.to_le_bytes()); // code_signature_size
    data.extend_from_slice(&fragment_count.to_le_bytes());
    data.extend_from_slice(&64u32.to_le_bytes()); // header_size
    data
}

#[test]
fn parse_empty_cache() {
    let data = build_header(0);
    let cache = AotCache::parse(&data).unwrap();
    assert_eq!(cache.uuid(), uuid::Uuid::from_bytes([0x11; 16]));
    assert_eq!(cache.x86_uuid(), uuid::Uuid::from_bytes([0x22; 16]));
    assert_eq!(cache.version(), Some("Rosetta-318.9"));
    assert_eq!(cache.fragment_count(), 0);
    assert_eq!(cache.header_size(), 64);

    let fragments = cache.fragments(AotSchema::V3, data.len()).unwrap();
    assert_eq!(fragments.iter().count(), 0);
}

#[test]
fn bad_magic() {
    let mut data = build_header(0);
    data[0] = b'r';
    let err = AotCache::parse(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadMagic);
}

#[test]
fn truncated_header() {
    let data = build_header(0);
    let err = AotCache::parse(&data[..40]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn header_size_out_of_range() {
    let mut data = build_header(0);
    // header_size is the last header field.
    let len = data.len();
    data[len - 4..].copy_from_slice(&0x1000u32.to_le_bytes());
    let err = AotCache::parse(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn tagged_fragment_roundtrip() {
    let endian = LittleEndian;
    let metadata = AotCacheCodeFragmentMetadata {
        fragment_type: U32::new(endian, 0),
        image_path_offset: I32::new(endian, 0x100),
        x86_code_offset: I32::new(endian, 0x4000),
        x86_code_size: I32::new(endian, 0x30),
        arm_code_offset: I32::new(endian, 0x8000),
        arm_code_size: I32::new(endian, 0x40),
        branch_data_offset: I32::new(endian, 0),
        branch_data_size: I32::new(endian, 0),
        instruction_map_offset: I32::new(endian, 0),
        instruction_map_size: I32::new(endian, 0),
    };
    let data = bytes_of(&metadata).to_vec();

    let fragments = AotFragments::new(Bytes(&data), AotSchema::V3, 1);
    let all = fragments.iter().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(all.len(), 1);
    match all[0] {
        AotFragment::Tagged(decoded) => assert_eq!(*decoded, metadata),
        _ => panic!("expected tagged fragment"),
    }
    assert_eq!(all[0].fragment_type(), Some(0));
    assert_eq!(all[0].image_path_offset(), Some(0x100));
    assert_eq!(all[0].x86_code_offset(), 0x4000);
    assert_eq!(all[0].x86_code_size(), 0x30);
    assert_eq!(all[0].arm_code_offset(), 0x8000);
    assert_eq!(all[0].arm_code_size(), 0x40);
}

#[test]
fn bare_fragment_table() {
    let endian = LittleEndian;
    let mut data = Vec::new();
    for index in 0..2 {
        let metadata = AotCodeFragmentMetadata {
            x86_code_offset: I32::new(endian, 0x1000 * index),
            x86_code_size: I32::new(endian, 0x10),
            arm_code_offset: I32::new(endian, 0x2000 * index),
            arm_code_size: I32::new(endian, 0x20),
            branch_data_offset: I32::new(endian, 0),
            branch_data_size: I32::new(endian, 0),
            instruction_map_offset: I32::new(endian, 0),
            instruction_map_size: I32::new(endian, 0),
        };
        data.extend_from_slice(bytes_of(&metadata));
    }

    let fragments = AotFragments::new(Bytes(&data), AotSchema::V1, 2);
    let all = fragments.iter().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].fragment_type(), None);
    assert_eq!(all[0].x86_code_offset(), 0);
    assert_eq!(all[1].x86_code_offset(), 0x1000);
    assert_eq!(all[1].arm_code_offset(), 0x2000);
}

#[test]
fn truncated_fragment_table() {
    let data = [0u8; 16];
    let fragments = AotFragments::new(Bytes(&data), AotSchema::V2, 1);
    let err = fragments.iter().next().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

fn build_branch_data(kind: u32, data_size: u32, entry_count: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&kind.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&data_size.to_le_bytes());
    data.extend_from_slice(&entry_count.to_le_bytes());
    for index in 0..data_size {
        data.push(index as u8);
    }
    data
}

#[test]
fn branch_data_kind_dispatch() {
    // The same underlying bytes reinterpreted under each kind decode to
    // entry widths 5, 9 and 10.
    for (kind, expected_kind, total_size) in [
        (1, BranchDataKind::Compact, 10),
        (2, BranchDataKind::Standard, 18),
        (3, BranchDataKind::Extended, 20),
    ] {
        let data = build_branch_data(kind, 20, 2);
        let branch_data = AotBranchData::parse(Bytes(&data), AotSchema::V3).unwrap();
        assert_eq!(branch_data.kind().unwrap(), expected_kind);
        assert_eq!(branch_data.entry_count(), 2);
        let entries = branch_data.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.total_size(), total_size);
    }
}

#[test]
fn branch_data_standard_entries() {
    let data = build_branch_data(2, 18, 2);
    let branch_data = AotBranchData::parse(Bytes(&data), AotSchema::V2).unwrap();
    match branch_data.entries().unwrap() {
        BranchDataEntries::Standard(entries) => {
            assert_eq!(entries.len(), 2);
            // Entries start right after the 16 byte header.
            assert_eq!(entries[0].index.get(LittleEndian), u16::from_le_bytes([0, 1]));
            assert_eq!(entries[1].index.get(LittleEndian), u16::from_le_bytes([9, 10]));
        }
        _ => panic!("expected standard entries"),
    }
}

#[test]
fn branch_data_unknown_kind() {
    let data = build_branch_data(7, 20, 2);
    let branch_data = AotBranchData::parse(Bytes(&data), AotSchema::V3).unwrap();
    assert_eq!(branch_data.kind_raw(), 7);
    let err = branch_data.kind().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
}

#[test]
fn branch_data_entries_exceed_declared_size() {
    // 3 standard entries need 27 bytes but only 20 are declared.
    let data = build_branch_data(2, 20, 3);
    let branch_data = AotBranchData::parse(Bytes(&data), AotSchema::V3).unwrap();
    let err = branch_data.entries().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentLayout);
}

#[test]
fn branch_data_v1_header() {
    // The old header carries the kind as a trailing u16 with kinds
    // numbered from 0.
    let mut data = Vec::new();
    data.extend_from_slice(&10u32.to_le_bytes()); // data_size
    data.extend_from_slice(&2u32.to_le_bytes()); // entry_count
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes()); // kind: compact
    data.extend_from_slice(&[0; 10]);
    let branch_data = AotBranchData::parse(Bytes(&data), AotSchema::V1).unwrap();
    assert_eq!(branch_data.kind().unwrap(), BranchDataKind::Compact);
    assert_eq!(branch_data.entries().unwrap().len(), 2);

    // The same bytes under the current schema read the leading word as the
    // kind, which is not a valid current kind value.
    let branch_data = AotBranchData::parse(Bytes(&data), AotSchema::V3).unwrap();
    assert_eq!(branch_data.kind_raw(), 10);
    assert!(branch_data.kind().is_err());
}

fn build_instruction_map(first_submap_offset: u32) -> Vec<u8> {
    let endian = LittleEndian;
    let mut data = Vec::new();
    data.extend_from_slice(&66052u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&72u32.to_le_bytes()); // map_size
    data.extend_from_slice(&2u32.to_le_bytes()); // entry_count
    data.extend_from_slice(&32u32.to_le_bytes()); // index_offset
    data.extend_from_slice(&first_submap_offset.to_le_bytes());
    for index in 0..2u32 {
        let entry = AotInstructionMapIndexEntry {
            x86_code_offset: U32::new(endian, 0x10 * index),
            arm_code_offset: U32::new(endian, 0x20 * index),
            submap_offset: U32::new(endian, 4 * index),
            flags: U32::new(endian, 0xdead_0000 | index),
        };
        data.extend_from_slice(bytes_of(&entry));
    }
    data.extend_from_slice(&[0xcc; 8]);
    data
}

#[test]
fn instruction_map() {
    // first_submap_offset == index_offset + 4 * entry_count.
    let data = build_instruction_map(40);
    let map = AotInstructionMap::parse(Bytes(&data)).unwrap();
    assert!(map.is_consistent());
    assert_eq!(map.map_size(), 72);
    assert_eq!(map.entry_count(), 2);
    let entries = map.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].x86_code_offset.get(LittleEndian), 0x10);
    assert_eq!(entries[1].arm_code_offset.get(LittleEndian), 0x20);
    // Opaque flags are preserved.
    assert_eq!(entries[0].flags.get(LittleEndian), 0xdead_0000);
    assert_eq!(entries[1].flags.get(LittleEndian), 0xdead_0001);
}

#[test]
fn instruction_map_inconsistent_submap_offset() {
    // A contradictory submap offset flags the record but does not fail it.
    let data = build_instruction_map(44);
    let map = AotInstructionMap::parse(Bytes(&data)).unwrap();
    assert!(!map.is_consistent());
    assert_eq!(map.entries().unwrap().len(), 2);
}

#[test]
fn instruction_map_entries_exceed_declared_size() {
    let mut data = build_instruction_map(40);
    // Declare more entries than map_size covers.
    data[20..24].copy_from_slice(&100u32.to_le_bytes());
    let map = AotInstructionMap::parse(Bytes(&data)).unwrap();
    let err = map.entries().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentLayout);
}

#[test]
fn metadata_command() {
    let endian = LittleEndian;
    let mut command = Vec::new();
    command.extend_from_slice(&LC_AOT_METADATA.to_le_bytes());
    command.extend_from_slice(&0x20u32.to_le_bytes());
    command.extend_from_slice(&0u32.to_le_bytes()); // x86_image_path_offset
    command.extend_from_slice(&16u32.to_le_bytes()); // x86_image_path_size
    command.extend_from_slice(&16u32.to_le_bytes()); // fragment_offset
    command.extend_from_slice(&1u32.to_le_bytes()); // fragment_count
    command.extend_from_slice(&0u32.to_le_bytes());
    command.extend_from_slice(&0u32.to_le_bytes());

    let mut linkedit = Vec::new();
    linkedit.extend_from_slice(b"/usr/bin/true\0\0\0");
    let fragment = AotCodeFragmentMetadata {
        x86_code_offset: I32::new(endian, 0x100),
        x86_code_size: I32::new(endian, 0x10),
        arm_code_offset: I32::new(endian, 0x200),
        arm_code_size: I32::new(endian, 0x20),
        branch_data_offset: I32::new(endian, 0),
        branch_data_size: I32::new(endian, 0),
        instruction_map_offset: I32::new(endian, 0),
        instruction_map_size: I32::new(endian, 0),
    };
    linkedit.extend_from_slice(bytes_of(&fragment));

    let metadata = AotMetadata::parse(Bytes(&command)).unwrap();
    assert_eq!(metadata.image_path(Bytes(&linkedit)).unwrap(), b"/usr/bin/true");
    let decoded = metadata.fragment(Bytes(&linkedit)).unwrap();
    assert_eq!(*decoded, fragment);
}

#[test]
fn metadata_command_bad_tag() {
    let mut command = vec![0u8; 32];
    command[0..4].copy_from_slice(&0x19u32.to_le_bytes());
    let err = AotMetadata::parse(Bytes(&command)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadMagic);
}

#[test]
fn fragment_sub_blobs() {
    // A V3 fragment whose branch data and instruction map follow the
    // record within the fragment region.
    let endian = LittleEndian;
    let mut branch_data = build_branch_data(2, 18, 2);
    // Keep the instruction map naturally aligned within the region.
    while branch_data.len() % 4 != 0 {
        branch_data.push(0);
    }
    let instruction_map = build_instruction_map(40);
    let metadata = AotCacheCodeFragmentMetadata {
        fragment_type: U32::new(endian, 0),
        image_path_offset: I32::new(endian, 0),
        x86_code_offset: I32::new(endian, 0),
        x86_code_size: I32::new(endian, 0),
        arm_code_offset: I32::new(endian, 0),
        arm_code_size: I32::new(endian, 0),
        branch_data_offset: I32::new(endian, 40),
        branch_data_size: I32::new(endian, branch_data.len() as i32),
        instruction_map_offset: I32::new(endian, (40 + branch_data.len()) as i32),
        instruction_map_size: I32::new(endian, instruction_map.len() as i32),
    };
    let mut region = bytes_of(&metadata).to_vec();
    region.extend_from_slice(&branch_data);
    region.extend_from_slice(&instruction_map);

    let fragments = AotFragments::new(Bytes(&region), AotSchema::V3, 1);
    let fragment = fragments.iter().next().unwrap().unwrap();
    let branch = fragment
        .branch_data(fragments.region(), AotSchema::V3)
        .unwrap();
    assert_eq!(branch.kind().unwrap(), BranchDataKind::Standard);
    assert_eq!(branch.entries().unwrap().len(), 2);
    let map = fragment.instruction_map(fragments.region()).unwrap();
    assert!(map.is_consistent());
    assert_eq!(map.entries().unwrap().len(), 2);
}

#[test]
fn negative_sub_blob_offset() {
    let endian = LittleEndian;
    let metadata = AotCodeFragmentMetadata {
        x86_code_offset: I32::new(endian, 0),
        x86_code_size: I32::new(endian, 0),
        arm_code_offset: I32::new(endian, 0),
        arm_code_size: I32::new(endian, 0),
        branch_data_offset: I32::new(endian, -4),
        branch_data_size: I32::new(endian, 16),
        instruction_map_offset: I32::new(endian, 0),
        instruction_map_size: I32::new(endian, 0),
    };
    let region = bytes_of(&metadata).to_vec();
    let fragments = AotFragments::new(Bytes(&region), AotSchema::V2, 1);
    let fragment = fragments.iter().next().unwrap().unwrap();
    let err = fragment
        .branch_data(fragments.region(), AotSchema::V2)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}
