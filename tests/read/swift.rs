use dyld_meta::read::swift::SwiftOptimization;
use dyld_meta::read::ErrorKind;

fn build_table(version: u32, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    data[0..4].copy_from_slice(&version.to_le_bytes());
    let mut offset = 8;
    let mut value = 0x1000u64;
    while offset + 8 <= len {
        data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        offset += 8;
        value += 0x1000;
    }
    data
}

#[test]
fn version_dispatch_is_total() {
    for (version, len) in [(1u32, 32), (2, 40), (3, 104)] {
        let data = build_table(version, len);
        let table = SwiftOptimization::parse(&data).unwrap();
        assert_eq!(table.version(), version);
    }

    for version in [0u32, 4, 12, 0xffff_ffff] {
        let data = build_table(version, 104);
        let err = SwiftOptimization::parse(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }
}

#[test]
fn truncated_table() {
    // Version 3 needs 104 bytes.
    let data = build_table(3, 40);
    let err = SwiftOptimization::parse(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn v1_fields() {
    let data = build_table(1, 32);
    let table = SwiftOptimization::parse(&data).unwrap();
    assert_eq!(table.type_conformance_hash_table_offset(), 0x1000);
    assert_eq!(table.metadata_conformance_hash_table_offset(), 0x2000);
    assert_eq!(table.foreign_type_conformance_hash_table_offset(), 0x3000);
    assert_eq!(table.prespecialization_data_offset(), None);
    assert_eq!(table.prespecialized_metadata_hash_table_offsets(), None);
}

#[test]
fn v2_adds_prespecialization_data() {
    let data = build_table(2, 40);
    let table = SwiftOptimization::parse(&data).unwrap();
    assert_eq!(table.prespecialization_data_offset(), Some(0x4000));
    assert_eq!(table.prespecialized_metadata_hash_table_offsets(), None);
}

#[test]
fn v3_adds_metadata_tables() {
    let data = build_table(3, 104);
    let table = SwiftOptimization::parse(&data).unwrap();
    assert_eq!(table.prespecialization_data_offset(), Some(0x4000));
    let offsets = table.prespecialized_metadata_hash_table_offsets().unwrap();
    assert_eq!(offsets[0], 0x5000);
    assert_eq!(offsets[7], 0xc000);
}
