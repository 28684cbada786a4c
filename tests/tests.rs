use pe_rsrc::{constants::*, *};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();
fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::builder()
            .is_test(false)
            .filter_level(log::LevelFilter::Info)
            .format_timestamp(None)
            .format_module_path(false)
            .format_level(true)
            .format_target(false)
            .write_style(env_logger::WriteStyle::Auto)
            .init();
    });
}

fn u16_at(data: &[u8], offset: usize) -> u16 { u16::from_le_bytes([data[offset], data[offset + 1]]) }

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn utf16(string: &str) -> Vec<u8> { string.encode_utf16().flat_map(|c| c.to_le_bytes()).collect() }

#[test]
fn format_version_string() {
    init_logger();

    assert_eq!(pe_rsrc::format_version_string(0x0001000200030004), "1.2.3.4");
    assert_eq!(pe_rsrc::format_version_string(0), "0.0.0.0");
    assert_eq!(pe_rsrc::format_version_string(u64::MAX), "65535.65535.65535.65535");

    let mut version_info = VersionInfo::new();
    version_info.set_file_version_string("1.2.3.4").unwrap();
    assert_eq!(version_info.file_version_string(), "1.2.3.4", "file version renders as set");
    assert_eq!(version_info.file_version(), 0x0001000200030004);
}

#[test]
fn parse_version_string() {
    init_logger();

    assert_eq!(pe_rsrc::parse_version_string("1.2.3.4").unwrap(), 0x0001000200030004);
    assert_eq!(pe_rsrc::parse_version_string("7").unwrap(), 0x0007000000000000);
    assert_eq!(pe_rsrc::parse_version_string("1.2").unwrap(), 0x0001000200000000);
    assert_eq!(
        pe_rsrc::parse_version_string("65535.0.0.65535").unwrap(),
        0xffff00000000ffff
    );

    let mut version_info = VersionInfo::new();
    version_info.set_product_version_string("10.0.1").unwrap();
    assert_eq!(version_info.product_version_string(), "10.0.1.0", "missing components are zero");

    for version in [
        "1.2.3.4.5",
        "1.a.3",
        "65536",
        "",
        "1..2",
        "+1",
        "-1",
        " 1",
    ] {
        match pe_rsrc::parse_version_string(version) {
            Err(VersionInfoError::InvalidVersion(input)) => {
                assert_eq!(input, version, "error carries the input")
            }
            other => panic!("{:?} parsed as {:?}", version, other),
        }
    }

    assert!(version_info.set_file_version_string("1.2.3.4.5").is_err());
    assert_eq!(version_info.file_version(), 0, "failed parse leaves the version unchanged");
}

#[test]
fn version_string_round_trip() {
    for value in [0u64, 1, 0x0001000200030004, 0xdeadbeefcafebabe, u64::MAX] {
        let rendered = pe_rsrc::format_version_string(value);
        assert_eq!(pe_rsrc::parse_version_string(&rendered).unwrap(), value);
    }
}

#[test]
fn get_string() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_string(0x0409, 0x04b0, "foo", "bar").unwrap();
    assert_eq!(version_info.string(0x0409, 0x04b0, "foo"), Some("bar"));
    assert_eq!(version_info.string(0x1, 0x2, "foo"), None, "missing table");
    assert_eq!(version_info.string(0x0409, 0x04b0, "baz"), None, "missing key");
}

#[test]
fn update_string() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_string(0x0409, 0x04b0, "a", "1").unwrap();
    version_info.set_string(0x0409, 0x04b0, "b", "2").unwrap();
    version_info.set_string(0x0407, 0x04b0, "a", "eins").unwrap();
    version_info.set_string(0x0409, 0x04b0, "a", "3").unwrap();

    assert_eq!(version_info.string_tables().count(), 2, "one table per language and codepage");
    let table = version_info.string_table(0x0409, 0x04b0).unwrap();
    assert_eq!(table.key(), "040904b0");
    assert_eq!(
        table.strings().collect::<Vec<_>>(),
        vec![("a", "3"), ("b", "2")],
        "replaced string keeps its position"
    );
    assert_eq!(version_info.string(0x0407, 0x04b0, "a"), Some("eins"));
}

#[test]
fn freeze_empty_version_info() {
    init_logger();

    let version_info = VersionInfo::new().freeze();
    assert_eq!(version_info.length(), 88);
    assert_eq!(version_info.value_length(), 52);
    assert!(version_info.string_file_info().is_none());
    assert!(version_info.var_file_info().is_none());

    let data = version_info.build();
    assert_eq!(data.len(), 88, "built version info size equals computed size");
    assert_eq!(u16_at(&data, 0), 88);
    assert_eq!(u16_at(&data, 2), 52);
    assert_eq!(u16_at(&data, 4), VS_TYPE_BINARY);
    assert_eq!(&data[6..36], &utf16(VS_VERSION_INFO_KEY)[..]);
    assert_eq!(u32_at(&data, 36), VS_FIXEDFILEINFO_SIGNATURE);
    assert_eq!(u32_at(&data, 40), VS_FIXEDFILEINFO_VERSION);
}

#[test]
fn freeze_version_info() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_string(0x0409, 0x04b0, "foo", "bar").unwrap();
    let version_info = version_info.freeze();

    assert_eq!(version_info.length(), 166);
    let string_file_info = version_info.string_file_info().unwrap();
    assert_eq!(string_file_info.length(), 78);
    assert_eq!(string_file_info.children()[0].length(), 42);
    assert_eq!(string_file_info.children()[0].children()[0].length(), 18);
    assert_eq!(string_file_info.children()[0].children()[0].value_length(), 6);
    assert_eq!(
        version_info.string_table(0x0409, 0x04b0).unwrap(),
        &string_file_info.children()[0]
    );

    let data = version_info.build();
    assert_eq!(data.len(), 166, "built version info size equals computed size");

    // StringFileInfo
    assert_eq!(u16_at(&data, 88), 78);
    assert_eq!(u16_at(&data, 92), VS_TYPE_TEXT);
    assert_eq!(&data[94..122], &utf16(VS_STRING_FILE_INFO_KEY)[..]);
    // StringTable
    assert_eq!(u16_at(&data, 124), 42);
    assert_eq!(&data[130..146], &utf16("040904b0")[..]);
    // String
    assert_eq!(u16_at(&data, 148), 18);
    assert_eq!(u16_at(&data, 150), 6);
    assert_eq!(&data[154..160], &utf16("foo")[..]);
    assert_eq!(&data[160..166], &utf16("bar")[..]);
}

#[test]
fn freeze_aligns_children() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_string(0x0409, 0x04b0, "foo", "bar").unwrap();
    version_info.set_string(0x0409, 0x04b0, "a", "b").unwrap();
    version_info.set_string(0x0409, 0x04b0, "empty", "").unwrap();
    let version_info = version_info.freeze();

    let table = version_info.string_table(0x0409, 0x04b0).unwrap();
    let lengths = table.children().iter().map(|s| s.length()).collect::<Vec<_>>();
    assert_eq!(lengths, vec![18, 10, 16]);
    assert_eq!(table.children()[2].value_length(), 0);
    // 24 header, 18 + 2 padding, 10 + 2 padding, 16
    assert_eq!(table.length(), 72);
    assert_eq!(version_info.string_file_info().unwrap().length(), 36 + 72);
    assert_eq!(version_info.length() as usize, 88 + 36 + 72);
    assert_eq!(version_info.build().len(), version_info.length() as usize);
}

#[test]
fn freeze_translations() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.add_translation(LANGUAGE_ID_EN_US, CODE_PAGE_ID_EN_US).unwrap();
    version_info.add_translation(LANGUAGE_ID_EN_US, CODE_PAGE_ID_EN_US).unwrap();
    assert_eq!(version_info.translations(), &[(0x0409, 0x04b0)]);
    let version_info = version_info.freeze();

    let var_file_info = version_info.var_file_info().unwrap();
    assert_eq!(var_file_info.length(), 60);
    let translation = var_file_info.child(VS_TRANSLATION_KEY).unwrap();
    assert_eq!(translation.length(), 32);
    assert_eq!(translation.value_length(), 4);
    assert_eq!(translation.value_type(), VS_TYPE_BINARY);
    assert_eq!(translation.value(), &[0x09, 0x04, 0xb0, 0x04]);
    assert_eq!(version_info.length(), 148);

    let data = version_info.build();
    assert_eq!(data.len(), 148);
    assert_eq!(&data[144..148], &[0x09, 0x04, 0xb0, 0x04]);
}

#[test]
fn string_file_info_before_var_file_info() {
    let mut version_info = VersionInfo::new();
    version_info.add_translation(0x0409, 0x04b0).unwrap();
    version_info.set_string(0x0409, 0x04b0, "foo", "bar").unwrap();
    let version_info = version_info.freeze();

    let keys = version_info.root().children().iter().map(|c| c.key()).collect::<Vec<_>>();
    assert_eq!(keys, vec![VS_STRING_FILE_INFO_KEY, VS_VAR_FILE_INFO_KEY]);
    // 166 padded to 168 before VarFileInfo
    assert_eq!(version_info.length(), 168 + 60);
}

#[test]
fn fixed_file_info() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_file_version_string("1.2.3.4").unwrap();
    version_info.set_product_version_string("5.6.7.8").unwrap();
    version_info.set_file_flags_mask(VS_FFI_FILEFLAGSMASK);
    version_info.set_file_flags(VS_FF_PRERELEASE);
    version_info.set_file_os(VOS_NT_WINDOWS32);
    version_info.set_file_type(VFT_APP);
    version_info.set_file_subtype(VFT2_UNKNOWN);

    let data = version_info.freeze().build();
    let value = &data[36..88];
    assert_eq!(u32_at(value, 8), 0x00010002, "file version ms");
    assert_eq!(u32_at(value, 12), 0x00030004, "file version ls");
    assert_eq!(u32_at(value, 16), 0x00050006, "product version ms");
    assert_eq!(u32_at(value, 20), 0x00070008, "product version ls");
    assert_eq!(u32_at(value, 24), VS_FFI_FILEFLAGSMASK);
    assert_eq!(u32_at(value, 28), VS_FF_PRERELEASE);
    assert_eq!(u32_at(value, 32), VOS_NT_WINDOWS32);
    assert_eq!(u32_at(value, 36), VFT_APP);
    assert_eq!(u32_at(value, 40), VFT2_UNKNOWN);
    assert_eq!(&value[44..52], &[0; 8], "timestamp is zero");
}

#[test]
fn version_info_too_large() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_string(0x0409, 0x04b0, "foo", "bar").unwrap();
    let before = version_info.clone();

    let value = "x".repeat(40000);
    assert!(matches!(
        version_info.set_string(0x0409, 0x04b0, "large", value.as_str()),
        Err(VersionInfoError::TooLarge(_))
    ));
    assert!(matches!(
        version_info.set_string(0x0407, 0x04b0, "large", value.as_str()),
        Err(VersionInfoError::TooLarge(_))
    ));
    assert!(matches!(
        version_info.set_string(0x0409, 0x04b0, "foo", value.as_str()),
        Err(VersionInfoError::TooLarge(_))
    ));
    assert_eq!(version_info, before, "failed insertions are rolled back");
}

#[test]
fn refreeze_version_info() {
    let mut version_info = VersionInfo::new();
    version_info.set_string(0x0409, 0x04b0, "foo", "bar").unwrap();
    let frozen = version_info.freeze();
    assert_eq!(frozen.info().string(0x0409, 0x04b0, "foo"), Some("bar"));

    let mut version_info = frozen.into_inner();
    version_info.set_string(0x0409, 0x04b0, "foo", "barbaz").unwrap();
    assert_eq!(version_info.size(), 172);
    let frozen = version_info.freeze();
    assert_eq!(frozen.length(), 172);
    assert_eq!(frozen.build().len(), 172);
}

#[test]
fn sort_entries() {
    init_logger();

    let mut tree = ResourceTree::new();
    let root = tree.root();
    tree.add_data_by_id(root, 5, vec![5]).unwrap();
    tree.add_data_by_name(root, "b", vec![2]).unwrap();
    tree.add_data_by_id(root, 1, vec![1]).unwrap();
    tree.add_data_by_name(root, "a", vec![1]).unwrap();
    tree.add_data_by_name(root, "B", vec![3]).unwrap();
    tree.add_data_by_name(root, "a", vec![4]).unwrap();
    tree.add_data_by_id(root, 5, vec![6]).unwrap();

    let entries = tree
        .table(root)
        .unwrap()
        .entries()
        .map(|(name, entry)| (name.clone(), entry.as_data().unwrap().data()[0]))
        .collect::<Vec<_>>();
    assert_eq!(
        entries,
        vec![
            (ResourceEntryName::from_string("B"), 3),
            (ResourceEntryName::from_string("a"), 1),
            (ResourceEntryName::from_string("a"), 4),
            (ResourceEntryName::from_string("b"), 2),
            (ResourceEntryName::ID(1), 1),
            (ResourceEntryName::ID(5), 5),
            (ResourceEntryName::ID(5), 6),
        ],
        "names before ids, sorted, equal names in insertion order"
    );
    assert_eq!(tree.table(root).unwrap().name_entries().len(), 4);
    assert_eq!(tree.table(root).unwrap().id_entries().len(), 3);
}

#[test]
fn reject_duplicate_entries() {
    init_logger();

    let mut tree = ResourceTree::new();
    tree.set_unique_keys(true);
    let root = tree.root();
    let icons = tree.add_subdirectory_by_id(root, RT_ICON as u32, 0).unwrap();
    tree.add_data_by_name(root, "NAME", vec![1]).unwrap();

    assert!(matches!(
        tree.add_subdirectory_by_id(root, RT_ICON as u32, 0),
        Err(ResourceError::DuplicateId(3))
    ));
    assert!(matches!(
        tree.add_data_by_name(root, "NAME", vec![2]),
        Err(ResourceError::DuplicateName(name)) if name == "NAME"
    ));
    assert_eq!(tree.table(root).unwrap().len(), 2);
    assert_eq!(tree.tables_count(), 2, "rejected table is not allocated");
    assert!(tree.add_data_by_name(icons, "NAME", vec![3]).is_ok(), "names are unique per table");
}

#[test]
fn reject_invalid_entries() {
    init_logger();

    let mut tree = ResourceTree::new();
    let root = tree.root();
    assert!(matches!(
        tree.add_data_by_id(root, 0x80000000, vec![]),
        Err(ResourceError::InvalidId(0x80000000))
    ));
    assert!(matches!(
        tree.add_data_by_name(root, "x".repeat(70000), vec![]),
        Err(ResourceError::NameTooLong(70000))
    ));

    let mut other = ResourceTree::new();
    let other_root = other.root();
    let foreign = other.add_subdirectory_by_id(other_root, 1, 0).unwrap();
    assert!(matches!(
        tree.add_data_by_id(foreign, 1, vec![]),
        Err(ResourceError::InvalidDirectory(1))
    ));
    assert!(tree.table(root).unwrap().is_empty());
}

fn sample_tree() -> (ResourceTree, Vec<DirectoryId>) {
    let mut tree = ResourceTree::new();
    let root = tree.root();
    let icons = tree.add_subdirectory_by_id(root, RT_ICON as u32, 0).unwrap();
    let icon = tree.add_subdirectory_by_id(icons, 1, 0).unwrap();
    tree.add_data_by_id(icon, LANGUAGE_ID_EN_US as u32, vec![1, 2, 3]).unwrap();
    let custom = tree.add_subdirectory_by_name(root, "CUSTOM", 0).unwrap();
    let item = tree.add_subdirectory_by_name(custom, "ITEM", 0).unwrap();
    tree.add_data_by_id(item, 0, vec![4; 10]).unwrap();
    let version = tree.add_subdirectory_by_id(root, RT_VERSION as u32, 0).unwrap();
    (tree, vec![root, icons, icon, custom, item, version])
}

#[test]
fn walk_tree() {
    init_logger();

    let (tree, tables) = sample_tree();
    let [root, icons, icon, custom, item, version] = tables[..] else {
        unreachable!()
    };

    let mut visited = Vec::new();
    tree.walk::<(), _>(|directory, _| {
        visited.push(directory);
        Ok(())
    })
    .unwrap();
    assert_eq!(
        visited,
        vec![root, custom, item, icons, icon, version],
        "depth-first, named entries first"
    );

    let mut count = 0;
    let result = tree.walk(|directory, _| {
        count += 1;
        if directory == item { Err("stop") } else { Ok(()) }
    });
    assert_eq!(result, Err("stop"));
    assert_eq!(count, 3, "walk stops at the first error");
}

#[test]
fn freeze_offsets() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_string(0x0409, 0x04b0, "foo", "bar").unwrap();
    let version_info = version_info.freeze();

    let mut tree = ResourceTree::new();
    tree.set_version_info(LANGUAGE_ID_EN_US, &version_info).unwrap();
    let tree = tree.freeze();

    let regions = tree.regions();
    assert_eq!(regions.tables, 0..72);
    assert_eq!(regions.strings, 72..72);
    assert_eq!(regions.descriptions, 72..88);
    assert_eq!(regions.data, 88..254);
    assert_eq!(tree.size(), 254);

    let data = tree.build(0x3000);
    assert_eq!(data.len(), 254, "built resource size equals computed size");

    // root table: one id entry pointing to the RT_VERSION table
    assert_eq!(u16_at(&data, 12), 0);
    assert_eq!(u16_at(&data, 14), 1);
    assert_eq!(u32_at(&data, 16), RT_VERSION as u32);
    assert_eq!(u32_at(&data, 20), 24 | 0x80000000);
    // RT_VERSION table: name 1
    assert_eq!(u32_at(&data, 40), 1);
    assert_eq!(u32_at(&data, 44), 48 | 0x80000000);
    // name table: language entry pointing to the data entry
    assert_eq!(u32_at(&data, 64), 0x0409);
    assert_eq!(u32_at(&data, 68), 72);
    // data entry description
    assert_eq!(u32_at(&data, 72), 0x3000 + 88);
    assert_eq!(u32_at(&data, 76), 166);
    assert_eq!(u32_at(&data, 80), 0);
    assert_eq!(&data[88..], &version_info.build()[..]);

    let placement = tree.data_entries()[0];
    assert_eq!(placement.descriptor_offset, 72);
    assert_eq!(placement.data_offset, 88);
    assert_eq!(placement.size, 166);
    assert_eq!(placement.index, 0);
}

#[test]
fn freeze_named_entries() {
    init_logger();

    let mut tree = ResourceTree::new();
    let root = tree.root();
    let named = tree.add_subdirectory_by_name(root, "TYPE", 0x1234).unwrap();
    tree.add_data_by_name(named, "TYPE", vec![1, 2, 3]).unwrap();
    tree.add_data_by_id(root, 1, vec![4]).unwrap();
    let tree = tree.freeze();

    assert_eq!(tree.table_offset(root), Some(0));
    assert_eq!(tree.table_offset(named), Some(32));
    assert_eq!(tree.entry_offset(root, 1), Some(24));
    assert_eq!(tree.entry_offset(root, 2), None);
    assert_eq!(tree.string_offset("TYPE"), Some(56), "equal names are stored once");

    let regions = tree.regions();
    assert_eq!(regions.tables, 0..56);
    assert_eq!(regions.strings, 56..66);
    assert_eq!(regions.descriptions, 68..100);
    assert_eq!(regions.data, 100..115);

    let placements = tree.data_entries();
    assert_eq!(placements.len(), 2);
    assert_eq!((placements[0].directory, placements[0].index), (root, 1));
    assert_eq!(placements[0].data_offset, 104, "data is 8 byte aligned");
    assert_eq!((placements[1].directory, placements[1].index), (named, 0));
    assert_eq!(placements[1].data_offset, 112);

    let data = tree.build(0);
    assert_eq!(data.len(), 115);
    assert_eq!(u32_at(&data, 0), 0, "root characteristics");
    assert_eq!(u16_at(&data, 12), 1, "root name entries");
    assert_eq!(u16_at(&data, 14), 1, "root id entries");
    assert_eq!(u32_at(&data, 16), 56 | 0x80000000);
    assert_eq!(u32_at(&data, 20), 32 | 0x80000000);
    assert_eq!(u32_at(&data, 24), 1);
    assert_eq!(u32_at(&data, 28), 68);
    assert_eq!(u32_at(&data, 32), 0x1234, "table characteristics");
    assert_eq!(u32_at(&data, 48), 56 | 0x80000000);
    assert_eq!(u32_at(&data, 52), 84);
    assert_eq!(u16_at(&data, 56), 4);
    assert_eq!(&data[58..66], &utf16("TYPE")[..]);
    assert_eq!(&data[66..68], &[0, 0]);
    assert_eq!(u32_at(&data, 68), 104);
    assert_eq!(u32_at(&data, 84), 112);
    assert_eq!(u32_at(&data, 88), 3);
    assert_eq!(&data[104..105], &[4]);
    assert_eq!(&data[112..115], &[1, 2, 3]);
}

#[test]
fn freeze_regions_do_not_overlap() {
    init_logger();

    let (tree, tables) = sample_tree();
    let tree = tree.freeze();
    let regions = tree.regions().clone();

    assert!(regions.tables.end <= regions.strings.start);
    assert!(regions.strings.end <= regions.descriptions.start);
    assert!(regions.descriptions.end <= regions.data.start);
    assert_eq!(regions.data.end, tree.size());

    let mut offsets = Vec::new();
    for &table in &tables {
        let offset = tree.table_offset(table).unwrap();
        assert!(regions.tables.contains(&offset));
        offsets.push(offset);
        for index in 0..tree.tree().table(table).unwrap().len() {
            let offset = tree.entry_offset(table, index).unwrap();
            assert!(regions.tables.contains(&offset));
            offsets.push(offset);
        }
    }
    for name in ["CUSTOM", "ITEM"] {
        let offset = tree.string_offset(name).unwrap();
        assert!(regions.strings.contains(&offset));
        offsets.push(offset);
    }
    for placement in tree.data_entries() {
        assert!(regions.descriptions.contains(&placement.descriptor_offset));
        assert!(regions.data.contains(&placement.data_offset));
        offsets.push(placement.descriptor_offset);
        offsets.push(placement.data_offset);
    }
    let count = offsets.len();
    offsets.sort();
    offsets.dedup();
    assert_eq!(offsets.len(), count, "offsets are unique");
}

#[test]
fn build_empty_tree() {
    init_logger();

    let tree = ResourceTree::with_characteristics(7).freeze();
    assert_eq!(tree.size(), 16);
    let data = tree.build(0x1000);
    assert_eq!(data.len(), 16);
    assert_eq!(u32_at(&data, 0), 7);
    assert_eq!(&data[4..], &[0; 12]);
}

#[test]
fn parse_built_tree() {
    init_logger();

    let (mut tree, _) = sample_tree();
    let root = tree.root();
    let mut data = ResourceData::new(vec![9; 5]);
    data.set_codepage(1252);
    tree.insert_data(root, "NAMED", data).unwrap();

    let frozen = tree.clone().freeze();
    let built = frozen.build(0x5000);
    assert_eq!(built.len() as u32, tree.size());

    let parsed = ResourceTree::parse(&built, 0x5000).unwrap();
    assert_eq!(
        parsed.clone().freeze().build(0x5000),
        built,
        "parsed and rebuilt sections equal"
    );

    let named = parsed.table(parsed.root()).unwrap().get("NAMED").unwrap();
    assert_eq!(named.as_data().unwrap().data(), &[9; 5]);
    assert_eq!(named.as_data().unwrap().codepage(), 1252);
    let item = parsed
        .subdirectory(parsed.root(), "CUSTOM")
        .and_then(|custom| parsed.subdirectory(custom, "ITEM"))
        .unwrap();
    assert_eq!(parsed.table(item).unwrap().datas().next().unwrap().data(), &[4; 10]);
}

#[test]
fn parse_invalid_tree() {
    init_logger();

    let (tree, _) = sample_tree();
    let built = tree.freeze().build(0x5000);

    assert!(ResourceTree::parse(&built[..8], 0x5000).is_err(), "truncated header");
    assert!(ResourceTree::parse(&built[..40], 0x5000).is_err(), "truncated tables");
    assert!(
        matches!(ResourceTree::parse(&built, 0x6000), Err(ResourceError::InvalidTable(_))),
        "data outside section"
    );

    // root entry pointing back to the root table
    let mut cyclic = vec![0u8; 24];
    cyclic[14] = 1;
    cyclic[16] = 1;
    cyclic[20..24].copy_from_slice(&0x80000000u32.to_le_bytes());
    assert!(matches!(ResourceTree::parse(&cyclic, 0), Err(ResourceError::InvalidTable(_))));
}

#[test]
fn freeze_deep_tree() {
    init_logger();

    let mut tree = ResourceTree::new();
    let mut directory = tree.root();
    for _ in 0..100_000 {
        directory = tree.add_subdirectory_by_id(directory, 1, 0).unwrap();
    }
    tree.add_data_by_id(directory, 0, vec![1, 2, 3]).unwrap();
    assert_eq!(tree.tables_count(), 100_001);

    let mut visited = 0;
    let mut last = None;
    tree.walk::<(), _>(|directory, _| {
        visited += 1;
        last = Some(directory);
        Ok(())
    })
    .unwrap();
    assert_eq!(visited, 100_001);
    assert_eq!(last, Some(directory), "deepest table is visited last");

    let frozen = tree.freeze();
    assert_eq!(frozen.table_offset(directory), Some(100_000 * 24));
    let built = frozen.build(0);
    assert_eq!(built.len() as u32, frozen.size());

    let parsed = ResourceTree::parse(&built, 0).unwrap();
    assert_eq!(parsed.tables_count(), 100_001);
    assert_eq!(parsed.freeze().build(0), built, "parsed and rebuilt sections equal");
}

#[test]
fn parse_deep_chain() {
    init_logger();

    // every table holds one id entry pointing at the next table, the last one is empty
    const TABLES: u32 = 60_000;
    let mut section = Vec::new();
    for i in 0..TABLES {
        let last = i == TABLES - 1;
        section.extend_from_slice(&[0; 14]);
        section.extend_from_slice(&(if last { 0u16 } else { 1 }).to_le_bytes());
        if !last {
            section.extend_from_slice(&1u32.to_le_bytes());
            section.extend_from_slice(&(((i + 1) * 24) | 0x80000000).to_le_bytes());
        }
    }

    let parsed = ResourceTree::parse(&section, 0).unwrap();
    assert_eq!(parsed.tables_count(), TABLES as usize);
    assert_eq!(parsed.size(), section.len() as u32);
}

#[test]
fn insert_many_entries() {
    init_logger();

    let mut tree = ResourceTree::new();
    let root = tree.root();
    for id in (0..20_000u32).rev() {
        tree.add_data_by_id(root, id, vec![id as u8]).unwrap();
    }
    tree.add_data_by_id(root, 5, vec![0xff]).unwrap();

    let table = tree.table(root).unwrap();
    let ids = table.id_entries().iter().map(|(name, _)| name.id().unwrap()).collect::<Vec<_>>();
    assert!(ids.windows(2).all(|pair| pair[0] <= pair[1]), "ids are sorted");
    let fives = table
        .id_entries()
        .iter()
        .filter(|(name, _)| name.id() == Some(5))
        .map(|(_, entry)| entry.as_data().unwrap().data()[0])
        .collect::<Vec<_>>();
    assert_eq!(fives, [5, 0xff], "duplicates keep insertion order");

    // 16 table + 20001 * (8 entry + 16 description), each byte of data aligned to 8
    assert_eq!(tree.size(), 16 + 20_001 * 24 + 20_000 * 8 + 1);
}

#[test]
fn insert_resource() {
    init_logger();

    let mut tree = ResourceTree::new();
    tree.insert_resource(RT_RCDATA, "CONFIG", 0, ResourceData::new(vec![1])).unwrap();
    tree.insert_resource(RT_RCDATA, "OTHER", 0, ResourceData::new(vec![2])).unwrap();
    tree.insert_resource(RT_RCDATA, "CONFIG", 0, ResourceData::new(vec![3])).unwrap();
    tree.insert_resource(RT_RCDATA, "CONFIG", 0x0409, ResourceData::new(vec![4])).unwrap();

    assert_eq!(tree.tables_count(), 4, "type and name tables are reused");
    let rcdata = tree.subdirectory(tree.root(), RT_RCDATA).unwrap();
    let config = tree.subdirectory(rcdata, "CONFIG").unwrap();
    let datas = tree.table(config).unwrap().datas().map(|d| d.data()[0]).collect::<Vec<_>>();
    assert_eq!(datas, vec![3, 4], "existing language data is replaced");

    let root = tree.root();
    tree.add_data_by_id(root, RT_HTML as u32, vec![5]).unwrap();
    assert!(matches!(
        tree.insert_resource(RT_HTML, 1u32, 0, ResourceData::new(vec![6])),
        Err(ResourceError::InvalidTable(_))
    ));
}

#[test]
fn set_version_info_and_manifest() {
    init_logger();

    let mut version_info = VersionInfo::new();
    version_info.set_file_version_string("1.0.0.0").unwrap();
    version_info
        .set_string(LANGUAGE_ID_EN_US, CODE_PAGE_ID_EN_US, VS_FILE_DESCRIPTION, "Test")
        .unwrap();
    version_info.add_translation(LANGUAGE_ID_EN_US, CODE_PAGE_ID_EN_US).unwrap();
    let version_info = version_info.freeze();

    let manifest = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";
    let mut tree = ResourceTree::new();
    tree.set_manifest(manifest).unwrap();
    tree.set_version_info(LANGUAGE_ID_EN_US, &version_info).unwrap();
    let built = tree.freeze().build(0x2000);

    let parsed = ResourceTree::parse(&built, 0x2000).unwrap();
    let root = parsed.root();
    let ids = parsed
        .table(root)
        .unwrap()
        .entries()
        .filter_map(|(name, _)| name.id())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![RT_VERSION as u32, RT_MANIFEST as u32]);

    let version = parsed
        .subdirectory(root, RT_VERSION)
        .and_then(|table| parsed.subdirectory(table, 1u32))
        .unwrap();
    let data = parsed.table(version).unwrap().get(LANGUAGE_ID_EN_US).unwrap();
    assert_eq!(data.as_data().unwrap().data(), &version_info.build()[..]);

    let manifest_table = parsed
        .subdirectory(root, RT_MANIFEST)
        .and_then(|table| parsed.subdirectory(table, CREATEPROCESS_MANIFEST_RESOURCE_ID))
        .unwrap();
    let data = parsed.table(manifest_table).unwrap().datas().next().unwrap();
    assert_eq!(data.data(), manifest.as_bytes());
}
