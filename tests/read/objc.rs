use dyld_meta::read::objc::{ObjcOpt, ObjcOptimization};
use dyld_meta::read::ErrorKind;

fn build_table(version: u32, len: usize) -> Vec<u8> {
    // The version is a u32 at offset 0 in every revision; fill the rest of
    // the record with a recognizable byte pattern.
    let mut data = vec![0u8; len];
    data[0..4].copy_from_slice(&version.to_le_bytes());
    for (index, byte) in data.iter_mut().enumerate().skip(4) {
        *byte = index as u8;
    }
    data
}

#[test]
fn version_dispatch_is_total() {
    for (version, len) in [(12u32, 16), (13, 20), (15, 32), (16, 48)] {
        let data = build_table(version, len);
        let table = ObjcOpt::parse(&data).unwrap();
        assert_eq!(table.version(), version);
    }

    for version in [0u32, 1, 11, 14, 17, 0xffff_ffff] {
        let data = build_table(version, 48);
        let err = ObjcOpt::parse(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }
}

#[test]
fn truncated_table() {
    // Version 16 needs 48 bytes.
    let data = build_table(16, 20);
    let err = ObjcOpt::parse(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn v12_fields() {
    let mut data = vec![0u8; 16];
    data[0..4].copy_from_slice(&12u32.to_le_bytes());
    data[4..8].copy_from_slice(&0x100i32.to_le_bytes());
    data[8..12].copy_from_slice(&(-0x200i32).to_le_bytes());
    data[12..16].copy_from_slice(&0x300i32.to_le_bytes());

    let table = ObjcOpt::parse(&data).unwrap();
    assert_eq!(table.version(), 12);
    assert_eq!(table.flags(), None);
    assert_eq!(table.selopt_offset(), 0x100);
    assert_eq!(table.headeropt_offset(), Some(-0x200));
    assert_eq!(table.clsopt_offset(), Some(0x300));
    assert_eq!(table.protocolopt_offset(), None);
    assert_eq!(table.headeropt_ro_offset(), None);
    assert_eq!(table.headeropt_rw_offset(), None);
    assert_eq!(table.large_shared_caches_class_offset(), None);
}

#[test]
fn v13_fields() {
    let mut data = vec![0u8; 20];
    data[0..4].copy_from_slice(&13u32.to_le_bytes());
    data[16..20].copy_from_slice(&0x500i32.to_le_bytes());

    let table = ObjcOpt::parse(&data).unwrap();
    assert_eq!(table.protocolopt_offset(), Some(0x500));
    assert_eq!(table.protocolopt2_offset(), None);
}

#[test]
fn v15_fields() {
    let mut data = vec![0u8; 32];
    data[0..4].copy_from_slice(&15u32.to_le_bytes());
    data[4..8].copy_from_slice(&3u32.to_le_bytes()); // flags
    data[8..12].copy_from_slice(&0x10i32.to_le_bytes()); // selopt
    data[12..16].copy_from_slice(&0x20i32.to_le_bytes()); // headeropt_ro
    data[16..20].copy_from_slice(&0x30i32.to_le_bytes()); // clsopt
    data[24..28].copy_from_slice(&0x40i32.to_le_bytes()); // headeropt_rw
    data[28..32].copy_from_slice(&0x50i32.to_le_bytes()); // protocolopt2

    let table = ObjcOpt::parse(&data).unwrap();
    assert_eq!(table.flags(), Some(3));
    assert_eq!(table.selopt_offset(), 0x10);
    assert_eq!(table.headeropt_ro_offset(), Some(0x20));
    assert_eq!(table.clsopt_offset(), Some(0x30));
    assert_eq!(table.headeropt_rw_offset(), Some(0x40));
    assert_eq!(table.protocolopt2_offset(), Some(0x50));
    assert_eq!(table.headeropt_offset(), None);
}

#[test]
fn v16_fields() {
    let mut data = vec![0u8; 48];
    data[0..4].copy_from_slice(&16u32.to_le_bytes());
    data[4..8].copy_from_slice(&7u32.to_le_bytes()); // flags
    data[8..12].copy_from_slice(&0x10i32.to_le_bytes()); // selopt
    data[12..16].copy_from_slice(&0x20i32.to_le_bytes()); // headeropt_ro
    data[24..28].copy_from_slice(&0x40i32.to_le_bytes()); // headeropt_rw
    data[32..36].copy_from_slice(&0x60i32.to_le_bytes()); // large class
    data[36..40].copy_from_slice(&0x70i32.to_le_bytes()); // large protocol
    data[40..48].copy_from_slice(&(-0x1_0000_0000i64).to_le_bytes());

    let table = ObjcOpt::parse(&data).unwrap();
    assert_eq!(table.version(), 16);
    assert_eq!(table.flags(), Some(7));
    assert_eq!(table.selopt_offset(), 0x10);
    assert_eq!(table.headeropt_ro_offset(), Some(0x20));
    assert_eq!(table.headeropt_rw_offset(), Some(0x40));
    // Version 16 replaced the class and protocol tables with the
    // large-shared-caches layout.
    assert_eq!(table.clsopt_offset(), None);
    assert_eq!(table.large_shared_caches_class_offset(), Some(0x60));
    assert_eq!(table.large_shared_caches_protocol_offset(), Some(0x70));
    assert_eq!(
        table.relative_method_selector_base_address_offset(),
        Some(-0x1_0000_0000)
    );
}

#[test]
fn modern_optimization() {
    let mut data = vec![0u8; 56];
    data[0..4].copy_from_slice(&1u32.to_le_bytes());
    data[4..8].copy_from_slice(&5u32.to_le_bytes());
    data[8..16].copy_from_slice(&0x1000u64.to_le_bytes());
    data[16..24].copy_from_slice(&0x2000u64.to_le_bytes());
    data[24..32].copy_from_slice(&0x3000u64.to_le_bytes());
    data[32..40].copy_from_slice(&0x4000u64.to_le_bytes());
    data[40..48].copy_from_slice(&0x5000u64.to_le_bytes());
    data[48..56].copy_from_slice(&0x6000u64.to_le_bytes());

    let table = ObjcOptimization::parse(&data).unwrap();
    assert_eq!(table.flags(), 5);
    assert_eq!(table.header_info_ro_offset(), 0x1000);
    assert_eq!(table.header_info_rw_offset(), 0x2000);
    assert_eq!(table.selector_hash_table_offset(), 0x3000);
    assert_eq!(table.class_hash_table_offset(), 0x4000);
    assert_eq!(table.protocol_hash_table_offset(), 0x5000);
    assert_eq!(table.relative_method_selector_base_address_offset(), 0x6000);
}

#[test]
fn modern_optimization_unsupported_version() {
    let mut data = vec![0u8; 56];
    data[0..4].copy_from_slice(&2u32.to_le_bytes());
    let err = ObjcOptimization::parse(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
}
